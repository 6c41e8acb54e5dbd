//! Top-level driver wiring the pipeline stages, and the dry-run diagnostics.

use std::time::Instant;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    cache::IdentifierCache,
    config::PrepareSettings,
    error::{Result, VidSearchError},
    pipeline::{
        generate_prompt_content, get_collection_prompt_content, index_videos,
        load_sections_into_db, wait_for_videos_processing_and_save_insights,
    },
    progress::{PipelineEvent, ProgressReporter, Stage},
    sections::get_sections_generator,
    traits::{BlobStore, EmbeddingProvider, PromptContentStore, VideoIndexer},
    types::{VideoId, VideoRecord},
};

/// What a normal run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub videos: usize,
    pub cached: usize,
    pub existing: usize,
    pub uploaded: usize,
    pub upload_failures: Vec<String>,
    pub indexed: usize,
    pub insights_saved: usize,
    pub processing_failures: Vec<String>,
    pub prompt_content_ready: usize,
    pub prompt_content_abandoned: Vec<VideoId>,
    pub prompt_content_failed: Vec<VideoId>,
    /// Videos with no prompt content sections, left out of the database.
    pub skipped_videos: Vec<VideoId>,
    pub embeddings_size: usize,
    pub sections_added: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ok,
    Failed(String),
    Skipped(String),
}

/// Connectivity check of one collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub service: &'static str,
    pub status: ProbeStatus,
    pub details: Vec<String>,
}

impl ProbeResult {
    fn from_result(service: &'static str, result: Result<Vec<String>>) -> Self {
        match result {
            Ok(details) => {
                info!(service, "dry run: successfully connected");
                Self {
                    service,
                    status: ProbeStatus::Ok,
                    details,
                }
            }
            Err(e) => {
                error!(service, error = %e, "dry run: failed to connect");
                Self {
                    service,
                    status: ProbeStatus::Failed(e.to_string()),
                    details: Vec::new(),
                }
            }
        }
    }

    fn unavailable(service: &'static str, e: &VidSearchError) -> Self {
        error!(service, error = %e, "dry run: could not create client");
        Self {
            service,
            status: ProbeStatus::Failed(e.to_string()),
            details: Vec::new(),
        }
    }

    fn skipped(service: &'static str, reason: &str) -> Self {
        Self {
            service,
            status: ProbeStatus::Skipped(reason.to_string()),
            details: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    pub probes: Vec<ProbeResult>,
}

impl DryRunReport {
    pub fn all_ok(&self) -> bool {
        self.probes
            .iter()
            .all(|p| !matches!(p.status, ProbeStatus::Failed(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    DryRun(DryRunReport),
    Prepared(PrepareSummary),
}

pub const STORAGE_SERVICE: &str = "Blob Storage";
pub const INDEXER_SERVICE: &str = "Video Indexer";
pub const EMBEDDING_SERVICE: &str = "Embeddings";
pub const DATABASE_SERVICE: &str = "Prompt Content DB";

/// Owns the collaborators of one run.
///
/// `storage` is `None` when blob storage is disabled; the run then works from
/// the identifier cache alone.
pub struct Preparer<'a, V, B, E, D> {
    settings: &'a PrepareSettings,
    indexer: V,
    storage: Option<B>,
    embedder: E,
    db: D,
}

impl<'a, V, B, E, D> Preparer<'a, V, B, E, D>
where
    V: VideoIndexer,
    B: BlobStore,
    E: EmbeddingProvider,
    D: PromptContentStore,
{
    pub fn new(
        settings: &'a PrepareSettings,
        indexer: V,
        storage: Option<B>,
        embedder: E,
        db: D,
    ) -> Self {
        Self {
            settings,
            indexer,
            storage,
            embedder,
            db,
        }
    }

    /// Run either the dry run or the full pipeline, per `settings.dry_run`.
    pub async fn execute<R: ProgressReporter>(self, reporter: &R) -> Result<RunOutcome> {
        self.settings.validate()?;
        let span = run_span(self.settings);

        async move {
            if self.settings.dry_run {
                Ok(RunOutcome::DryRun(self.dry_run(reporter).await))
            } else {
                self.prepare_db(reporter).await.map(RunOutcome::Prepared)
            }
        }
        .instrument(span)
        .await
    }

    /// Probe every collaborator without changing any persistent state.
    pub async fn dry_run<R: ProgressReporter>(&self, reporter: &R) -> DryRunReport {
        probe_services(
            Ok(&self.indexer),
            self.storage.as_ref().map(Ok),
            Ok(&self.embedder),
            Ok(&self.db),
            reporter,
        )
        .await
    }

    /// Run every stage in order and load the sections into the database.
    pub async fn prepare_db<R: ProgressReporter>(mut self, reporter: &R) -> Result<PrepareSummary> {
        let settings = self.settings;
        let mut summary = PrepareSummary::default();

        let mut cache = IdentifierCache::load(
            &settings.videos_ids_cache_file,
            settings.use_videos_ids_cache,
        )
        .await?;

        // Stage 1: resolve identifiers
        match &self.storage {
            Some(storage) => {
                let started = Instant::now();
                reporter.report(PipelineEvent::StageStarted {
                    stage: Stage::Upload,
                });
                let blobs = storage.list_blobs().await?;
                let upload = index_videos(
                    &self.indexer,
                    storage,
                    &blobs,
                    &mut cache,
                    settings.privacy,
                    &settings.excluded_ai,
                )
                .await?;
                summary.cached = upload.cached;
                summary.existing = upload.existing;
                summary.uploaded = upload.uploaded;
                summary.upload_failures = upload.failed;
                reporter.report(PipelineEvent::StageCompleted {
                    stage: Stage::Upload,
                    elapsed: started.elapsed(),
                    detail: &format!(
                        "{} cached, {} existing, {} uploaded, {} failed",
                        summary.cached,
                        summary.existing,
                        summary.uploaded,
                        summary.upload_failures.len()
                    ),
                });
            }
            None => {
                if cache.is_empty() {
                    return Err(VidSearchError::NoVideoSource {
                        cache_file: cache.path().to_path_buf(),
                    });
                }
                summary.cached = cache.len();
                reporter.report(PipelineEvent::StageSkipped {
                    stage: Stage::Upload,
                    reason: &format!("blob storage disabled, using {} cached ids", cache.len()),
                });
            }
        }

        let videos: Vec<VideoRecord> = cache
            .iter()
            .map(|(name, id)| VideoRecord {
                name: name.to_string(),
                id: id.clone(),
            })
            .collect();
        let video_ids: Vec<VideoId> = videos.iter().map(|v| v.id.clone()).collect();
        summary.videos = videos.len();

        // Stage 2: wait for indexing
        let started = Instant::now();
        reporter.report(PipelineEvent::StageStarted {
            stage: Stage::ProcessingWait,
        });
        let processing = wait_for_videos_processing_and_save_insights(
            &self.indexer,
            &videos,
            self.storage.as_ref(),
            settings.processing_timeout,
        )
        .await;
        summary.indexed = processing.indexed;
        summary.insights_saved = processing.insights_saved;
        summary.processing_failures = processing.failed.into_iter().map(|(name, _)| name).collect();
        reporter.report(PipelineEvent::StageCompleted {
            stage: Stage::ProcessingWait,
            elapsed: started.elapsed(),
            detail: &format!(
                "{} indexed, {} insights saved, {} failed",
                summary.indexed,
                summary.insights_saved,
                summary.processing_failures.len()
            ),
        });

        // Stage 3: prompt content
        let started = Instant::now();
        reporter.report(PipelineEvent::StageStarted {
            stage: Stage::PromptContent,
        });
        let prompt_content = generate_prompt_content(
            &self.indexer,
            &video_ids,
            &settings.prompt_content_retry,
        )
        .await;
        summary.prompt_content_ready = prompt_content.ready.len();
        summary.prompt_content_abandoned = prompt_content.abandoned;
        summary.prompt_content_failed = prompt_content.failed;

        let collection = match get_collection_prompt_content(&self.indexer, &video_ids).await {
            Ok(collection) => collection,
            Err(e) => {
                error!(error = %e, "failed to get collection prompt content");
                reporter.report(PipelineEvent::StageFailed {
                    stage: Stage::PromptContent,
                    error: &e.to_string(),
                });
                return Err(e);
            }
        };

        for video_id in collection.empty_videos() {
            if summary.prompt_content_abandoned.contains(&video_id) {
                warn!(%video_id, "prompt content never completed, skipping video");
            } else {
                warn!(%video_id, "no prompt content sections, skipping video");
            }
            summary.skipped_videos.push(video_id);
        }
        reporter.report(PipelineEvent::StageCompleted {
            stage: Stage::PromptContent,
            elapsed: started.elapsed(),
            detail: &format!(
                "{} sections from {} videos, {} skipped",
                collection.section_count(),
                collection.videos.len() - summary.skipped_videos.len(),
                summary.skipped_videos.len()
            ),
        });

        // Stages 4 and 5: sections into the database
        let started = Instant::now();
        reporter.report(PipelineEvent::StageStarted {
            stage: Stage::Database,
        });
        info!("preparing language models");
        summary.embeddings_size = self.embedder.get_embeddings_size().await?;

        let account = self.indexer.get_account_details().await?;
        info!(?account, "account details");

        let embedder = &self.embedder;
        let sections = get_sections_generator(
            collection,
            account,
            move |text: String| async move { embedder.get_text_embeddings(&text).await },
            settings.embeddings_field.as_str(),
        );

        let loaded = load_sections_into_db(
            &mut self.db,
            &settings.db_name,
            summary.embeddings_size,
            sections,
            settings.upload_batch_size,
            settings.verbose,
        )
        .await;
        summary.sections_added = match loaded {
            Ok(added) => added,
            Err(e) => {
                reporter.report(PipelineEvent::StageFailed {
                    stage: Stage::Database,
                    error: &e.to_string(),
                });
                return Err(e);
            }
        };
        reporter.report(PipelineEvent::StageCompleted {
            stage: Stage::Database,
            elapsed: started.elapsed(),
            detail: &format!(
                "{} sections, {} dimensions",
                summary.sections_added, summary.embeddings_size
            ),
        });

        Ok(summary)
    }
}

fn run_span(settings: &PrepareSettings) -> tracing::Span {
    info_span!(
        "prepare_db",
        run_id = %Uuid::new_v4(),
        db = %settings.db_name,
        dry_run = settings.dry_run
    )
}

/// Dry run over collaborators that may have failed to build.
///
/// A collaborator given as `Err` is reported as a failed probe and the others
/// are still probed. `storage` is `None` when blob storage is disabled.
pub async fn dry_run_collaborators<V, B, E, D, R>(
    settings: &PrepareSettings,
    indexer: Result<V>,
    storage: Option<Result<B>>,
    embedder: Result<E>,
    db: Result<D>,
    reporter: &R,
) -> Result<DryRunReport>
where
    V: VideoIndexer,
    B: BlobStore,
    E: EmbeddingProvider,
    D: PromptContentStore,
    R: ProgressReporter,
{
    settings.validate()?;
    let report = probe_services(
        indexer.as_ref(),
        storage.as_ref().map(|s| s.as_ref()),
        embedder.as_ref(),
        db.as_ref(),
        reporter,
    )
    .instrument(run_span(settings))
    .await;
    Ok(report)
}

type Built<'c, T> = std::result::Result<&'c T, &'c VidSearchError>;

async fn probe_services<V, B, E, D, R>(
    indexer: Built<'_, V>,
    storage: Option<Built<'_, B>>,
    embedder: Built<'_, E>,
    db: Built<'_, D>,
    reporter: &R,
) -> DryRunReport
where
    V: VideoIndexer,
    B: BlobStore,
    E: EmbeddingProvider,
    D: PromptContentStore,
    R: ProgressReporter,
{
    let started = Instant::now();
    reporter.report(PipelineEvent::StageStarted {
        stage: Stage::DryRun,
    });

    let mut report = DryRunReport::default();

    report.probes.push(match storage {
        Some(Ok(storage)) => {
            ProbeResult::from_result(STORAGE_SERVICE, probe_storage(storage).await)
        }
        Some(Err(e)) => ProbeResult::unavailable(STORAGE_SERVICE, e),
        None => ProbeResult::skipped(STORAGE_SERVICE, "blob storage disabled"),
    });
    report.probes.push(match indexer {
        Ok(indexer) => ProbeResult::from_result(INDEXER_SERVICE, probe_indexer(indexer).await),
        Err(e) => ProbeResult::unavailable(INDEXER_SERVICE, e),
    });
    report.probes.push(match embedder {
        Ok(embedder) => {
            ProbeResult::from_result(EMBEDDING_SERVICE, probe_embedder(embedder).await)
        }
        Err(e) => ProbeResult::unavailable(EMBEDDING_SERVICE, e),
    });
    report.probes.push(match db {
        Ok(db) => ProbeResult::from_result(DATABASE_SERVICE, probe_db(db).await),
        Err(e) => ProbeResult::unavailable(DATABASE_SERVICE, e),
    });

    let failed = report
        .probes
        .iter()
        .filter(|p| matches!(p.status, ProbeStatus::Failed(_)))
        .count();
    reporter.report(PipelineEvent::StageCompleted {
        stage: Stage::DryRun,
        elapsed: started.elapsed(),
        detail: &format!("{} probes, {} failed", report.probes.len(), failed),
    });
    report
}

async fn probe_storage<B: BlobStore>(storage: &B) -> Result<Vec<String>> {
    let blobs = storage.list_blobs().await?;
    Ok(blobs
        .into_iter()
        .map(|b| format!("Blob: {}", b.name))
        .collect())
}

async fn probe_indexer<V: VideoIndexer>(indexer: &V) -> Result<Vec<String>> {
    let account = indexer.get_account_details().await?;
    let mut details = vec![format!(
        "Account: {} ({}) in {}",
        account.account_name, account.account_id, account.location
    )];
    details.extend(
        indexer
            .list_videos()
            .await?
            .into_iter()
            .map(|v| format!("Video ID: {}, Name: {}", v.id, v.name)),
    );
    Ok(details)
}

async fn probe_embedder<E: EmbeddingProvider>(embedder: &E) -> Result<Vec<String>> {
    let size = embedder.get_embeddings_size().await?;
    Ok(vec![format!("Embeddings size: {size}")])
}

async fn probe_db<D: PromptContentStore>(db: &D) -> Result<Vec<String>> {
    let documents = db.list_all_documents().await?;
    Ok(documents
        .into_iter()
        .map(|d| format!("Document ID: {}, Content: {}", d.id, d.content))
        .collect())
}
