use std::time::Duration;

use futures::Stream;
use tracing::{error, info, warn};

use crate::{
    cache::IdentifierCache,
    error::{Result, VidSearchError},
    retry::{PromptContentStatus, RetryOutcome, RetryPolicy, retry_bounded},
    traits::{BlobStore, PromptContentStore, UploadRequest, VideoIndexer},
    types::{BlobItem, Privacy, PromptContentCollection, Section, VideoId, VideoRecord},
};

/// Suffix of the insight documents written next to the source videos.
pub const INSIGHTS_SUFFIX: &str = "_insights.json";

/// Storage key of the insights document for `video_name`.
pub fn insights_blob_name(video_name: &str) -> String {
    format!("{video_name}{INSIGHTS_SUFFIX}")
}

/// Insight documents share the container with the videos; never upload them.
pub fn is_video_blob(name: &str) -> bool {
    !name.ends_with(INSIGHTS_SUFFIX)
}

#[derive(Debug, Default)]
pub struct UploadReport {
    /// Already present in the identifier cache, no request made.
    pub cached: usize,
    /// Found on the indexing service by name.
    pub existing: usize,
    pub uploaded: usize,
    pub failed: Vec<String>,
}

/// Resolve every video blob to an indexing-service identifier.
///
/// Names already in `cache` are skipped without any request. Others are looked
/// up by name and uploaded by URL only when absent. A failure on one video is
/// logged and the next one is processed. The cache is flushed once at the end.
pub async fn index_videos<V, B>(
    client: &V,
    storage: &B,
    blobs: &[BlobItem],
    cache: &mut IdentifierCache,
    privacy: Privacy,
    excluded_ai: &[String],
) -> Result<UploadReport>
where
    V: VideoIndexer,
    B: BlobStore,
{
    let mut report = UploadReport::default();

    for blob in blobs.iter().filter(|b| is_video_blob(&b.name)) {
        if let Some(video_id) = cache.get(&blob.name) {
            info!(video = %blob.name, %video_id, "already processed, skipping upload");
            report.cached += 1;
            continue;
        }

        match resolve_video(client, storage, &blob.name, privacy, excluded_ai).await {
            Ok(Resolved::Existing(video_id)) => {
                info!(video = %blob.name, %video_id, "video already exists, skipping upload");
                cache.record(&blob.name, video_id);
                report.existing += 1;
            }
            Ok(Resolved::Uploaded(video_id)) => {
                info!(video = %blob.name, %video_id, "uploaded video");
                cache.record(&blob.name, video_id);
                report.uploaded += 1;
            }
            Ok(Resolved::NoIdentifier) => {
                warn!(video = %blob.name, "upload returned no video id");
                report.failed.push(blob.name.clone());
            }
            Err(e) => {
                error!(video = %blob.name, error = %e, "failed to upload video");
                report.failed.push(blob.name.clone());
            }
        }
    }

    cache.flush().await?;
    info!(
        videos = cache.len(),
        path = %cache.path().display(),
        "saved videos ids"
    );
    Ok(report)
}

enum Resolved {
    Existing(VideoId),
    Uploaded(VideoId),
    NoIdentifier,
}

async fn resolve_video<V, B>(
    client: &V,
    storage: &B,
    name: &str,
    privacy: Privacy,
    excluded_ai: &[String],
) -> Result<Resolved>
where
    V: VideoIndexer,
    B: BlobStore,
{
    info!(video = %name, "checking if video exists");
    if let Some(video_id) = client.video_exists(name).await? {
        return Ok(Resolved::Existing(video_id));
    }

    let video_url = storage.blob_url(name)?;
    info!(video = %name, "uploading video");
    let request = UploadRequest {
        name,
        video_url: &video_url,
        privacy,
        excluded_ai,
    };
    Ok(match client.upload_url(&request).await? {
        Some(video_id) => Resolved::Uploaded(video_id),
        None => Resolved::NoIdentifier,
    })
}

#[derive(Debug, Default)]
pub struct ProcessingReport {
    pub indexed: usize,
    pub insights_saved: usize,
    pub failed: Vec<(String, VidSearchError)>,
}

/// Wait for each video to finish indexing and store its insights.
///
/// Each wait is bounded by `timeout` even if the service primitive never
/// returns. Without `storage` the insights are fetched but not persisted.
/// Failures are collected per video; the remaining videos still run.
pub async fn wait_for_videos_processing_and_save_insights<V, B>(
    client: &V,
    videos: &[VideoRecord],
    storage: Option<&B>,
    timeout: Duration,
) -> ProcessingReport
where
    V: VideoIndexer,
    B: BlobStore,
{
    let mut report = ProcessingReport::default();

    for video in videos {
        match process_video(client, video, storage, timeout).await {
            Ok(saved) => {
                report.indexed += 1;
                if saved {
                    report.insights_saved += 1;
                }
            }
            Err(e) => {
                error!(video = %video.name, video_id = %video.id, error = %e, "failed to process video or save insights");
                report.failed.push((video.name.clone(), e));
            }
        }
    }

    info!(
        indexed = report.indexed,
        failed = report.failed.len(),
        "videos processing and insights saving completed"
    );
    report
}

async fn process_video<V, B>(
    client: &V,
    video: &VideoRecord,
    storage: Option<&B>,
    timeout: Duration,
) -> Result<bool>
where
    V: VideoIndexer,
    B: BlobStore,
{
    info!(video_id = %video.id, "checking if video has finished indexing");
    tokio::time::timeout(timeout, client.wait_for_index(&video.id, timeout))
        .await
        .map_err(|_| VidSearchError::IndexingTimeout {
            video_id: video.id.to_string(),
            seconds: timeout.as_secs(),
        })??;

    info!(video = %video.name, video_id = %video.id, "retrieving insights");
    let insights = client.get_video(&video.id).await?;

    let Some(storage) = storage else {
        info!(video = %video.name, "no blob storage configured, insights not persisted");
        return Ok(false);
    };

    storage
        .upload_blob(
            &insights_blob_name(&video.name),
            serde_json::to_vec(&insights)?,
            true,
        )
        .await?;
    info!(video = %video.name, video_id = %video.id, "saved insights");
    Ok(true)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PromptContentReport {
    pub ready: Vec<VideoId>,
    /// Still in progress or conflicting after every attempt.
    pub abandoned: Vec<VideoId>,
    pub failed: Vec<VideoId>,
}

/// Request prompt content generation for every video.
///
/// In-progress and conflict responses are retried per `policy` after the backoff.
/// Failed requests are retried at once. Running out of attempts is logged and the
/// next video is processed.
pub async fn generate_prompt_content<V>(
    client: &V,
    video_ids: &[VideoId],
    policy: &RetryPolicy,
) -> PromptContentReport
where
    V: VideoIndexer,
{
    let mut report = PromptContentReport::default();

    for video_id in video_ids {
        let outcome = retry_bounded(policy, |attempt| async move {
            let status = client.generate_prompt_content(video_id).await?;
            match &status {
                PromptContentStatus::InProgress => {
                    info!(%video_id, attempt, "prompt content generation still in progress, retrying")
                }
                PromptContentStatus::Conflict => {
                    info!(%video_id, attempt, "prompt content generation already in progress, retrying")
                }
                _ => {}
            }
            Ok(status)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded { .. } => report.ready.push(video_id.clone()),
            RetryOutcome::Exhausted { attempts } => {
                warn!(%video_id, attempts, "gave up waiting for prompt content generation");
                report.abandoned.push(video_id.clone());
            }
            RetryOutcome::Failed { reason, .. } => {
                let e = VidSearchError::PromptContentRequest {
                    video_id: video_id.to_string(),
                    reason,
                };
                error!(error = %e, "failed to generate prompt content");
                report.failed.push(video_id.clone());
            }
        }
    }

    report
}

/// Fetch the prompt content of all videos in one call.
pub async fn get_collection_prompt_content<V>(
    client: &V,
    video_ids: &[VideoId],
) -> Result<PromptContentCollection>
where
    V: VideoIndexer,
{
    let collection = client.get_collection_prompt_content(video_ids).await?;
    info!(
        videos = collection.videos.len(),
        sections = collection.section_count(),
        "fetched collection prompt content"
    );
    Ok(collection)
}

/// Create the index and drain `sections` into it.
pub async fn load_sections_into_db<D, S>(
    db: &mut D,
    db_name: &str,
    vector_search_dimensions: usize,
    sections: S,
    upload_batch_size: usize,
    verbose: bool,
) -> Result<usize>
where
    D: PromptContentStore,
    S: Stream<Item = Result<Section>>,
{
    info!(db = %db_name, dimensions = vector_search_dimensions, "creating database");
    db.create_db(db_name, vector_search_dimensions).await?;
    let added = db
        .add_sections_to_db(sections, upload_batch_size, verbose)
        .await?;
    info!(db = %db_name, sections = added, "done adding sections to db");
    Ok(added)
}
