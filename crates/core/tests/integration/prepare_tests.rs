//! End-to-end tests of `Preparer::prepare_db` against mock collaborators.

use std::sync::Mutex;

use crate::integration::common::{MockDb, MockEmbedder, MockIndexer, MockStorage, prompt_content};
use tempfile::TempDir;
use vidsearch_core::cache::IdentifierCache;
use vidsearch_core::config::PrepareSettings;
use vidsearch_core::error::VidSearchError;
use vidsearch_core::prepare::{Preparer, RunOutcome};
use vidsearch_core::progress::{PipelineEvent, ProgressReporter, SilentReporter, Stage};
use vidsearch_core::retry::PromptContentStatus;
use vidsearch_core::types::VideoId;

fn settings(dir: &TempDir) -> PrepareSettings {
    PrepareSettings {
        videos_ids_cache_file: dir.path().join("videos_ids_cache.json"),
        upload_batch_size: 2,
        ..PrepareSettings::default()
    }
}

/// Records `(stage, kind)` for every event.
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<(Stage, &'static str)>>,
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        let entry = match event {
            PipelineEvent::StageStarted { stage } => (stage, "started"),
            PipelineEvent::StageCompleted { stage, .. } => (stage, "completed"),
            PipelineEvent::StageSkipped { stage, .. } => (stage, "skipped"),
            PipelineEvent::StageFailed { stage, .. } => (stage, "failed"),
        };
        self.events.lock().unwrap().push(entry);
    }
}

#[tokio::test]
async fn test_full_run_loads_every_section() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let a_id = MockIndexer::uploaded_id("a.mp4");
    let indexer = MockIndexer::new()
        .with_existing("b.mp4", "v2")
        .with_prompt_content(prompt_content(a_id.as_str(), "a.mp4", &["one", "two", "three"]))
        .with_prompt_content(prompt_content("v2", "b.mp4", &["four"]));
    let storage = MockStorage::with_blobs(&["a.mp4", "b.mp4"]);
    let embedder = MockEmbedder::new(4);
    let db = MockDb::default();
    let reporter = RecordingReporter::default();

    let outcome = Preparer::new(
        &settings,
        indexer.clone(),
        Some(storage.clone()),
        embedder.clone(),
        db.clone(),
    )
    .execute(&reporter)
    .await
    .unwrap();

    let RunOutcome::Prepared(summary) = outcome else {
        panic!("expected a prepared summary");
    };
    assert_eq!(summary.videos, 2);
    assert_eq!(summary.uploaded, 1);
    assert_eq!(summary.existing, 1);
    assert_eq!(summary.insights_saved, 2);
    assert_eq!(summary.prompt_content_ready, 2);
    assert_eq!(summary.embeddings_size, 4);
    assert_eq!(summary.sections_added, 4);
    assert!(summary.skipped_videos.is_empty());

    assert_eq!(
        db.lock().created,
        vec![("vi-prompt-content-example-index".to_string(), 4)]
    );
    assert_eq!(db.batch_sizes(), vec![2, 2]);
    assert_eq!(embedder.calls(), vec!["one", "two", "three", "four"]);
    assert_eq!(
        storage.uploaded_names(),
        vec!["a.mp4_insights.json", "b.mp4_insights.json"]
    );

    let cache = IdentifierCache::load(&settings.videos_ids_cache_file, true)
        .await
        .unwrap();
    assert_eq!(cache.get("a.mp4"), Some(&a_id));
    assert_eq!(cache.get("b.mp4"), Some(&VideoId::new("v2")));

    let events = reporter.events.lock().unwrap();
    assert_eq!(events.first(), Some(&(Stage::Upload, "started")));
    assert_eq!(events.last(), Some(&(Stage::Database, "completed")));
}

/// Without storage the run works from the cache file alone.
#[tokio::test]
async fn test_cache_only_run_skips_upload() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let mut cache = IdentifierCache::empty(&settings.videos_ids_cache_file);
    cache.record("a.mp4", VideoId::new("v1"));
    cache.flush().await.unwrap();

    let indexer = MockIndexer::new().with_prompt_content(prompt_content("v1", "a.mp4", &["x"]));
    let db = MockDb::default();
    let reporter = RecordingReporter::default();

    let outcome = Preparer::new(
        &settings,
        indexer.clone(),
        None::<MockStorage>,
        MockEmbedder::new(2),
        db.clone(),
    )
    .execute(&reporter)
    .await
    .unwrap();

    let RunOutcome::Prepared(summary) = outcome else {
        panic!("expected a prepared summary");
    };
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.insights_saved, 0);
    assert_eq!(summary.sections_added, 1);
    assert!(indexer.lock().exists_calls.is_empty());
    assert_eq!(
        reporter.events.lock().unwrap().first(),
        Some(&(Stage::Upload, "skipped"))
    );
}

/// With the cache disabled every name is looked up again, and the cache file
/// keeps the names recorded by earlier runs.
#[tokio::test]
async fn test_disabled_cache_keeps_existing_file_entries() {
    let dir = TempDir::new().unwrap();
    let settings = PrepareSettings {
        use_videos_ids_cache: false,
        ..settings(&dir)
    };
    std::fs::write(&settings.videos_ids_cache_file, r#"{"x.mp4": "id-x"}"#).unwrap();
    let indexer = MockIndexer::new();

    Preparer::new(
        &settings,
        indexer.clone(),
        Some(MockStorage::with_blobs(&["a.mp4"])),
        MockEmbedder::new(2),
        MockDb::default(),
    )
    .execute(&SilentReporter)
    .await
    .unwrap();

    assert_eq!(indexer.lock().exists_calls, vec!["a.mp4"]);
    assert_eq!(
        indexer.lock().collection_calls,
        vec![vec![MockIndexer::uploaded_id("a.mp4")]]
    );
    let cache = IdentifierCache::load(&settings.videos_ids_cache_file, true)
        .await
        .unwrap();
    assert_eq!(cache.get("x.mp4"), Some(&VideoId::new("id-x")));
    assert_eq!(cache.get("a.mp4"), Some(&MockIndexer::uploaded_id("a.mp4")));
}

/// A corrupt cache file is ignored; name lookups rebuild it.
#[tokio::test]
async fn test_corrupt_cache_rebuilt_from_lookups() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    std::fs::write(&settings.videos_ids_cache_file, r#"{"a.mp4": "id-a""#).unwrap();
    let indexer = MockIndexer::new().with_existing("a.mp4", "id-a");

    let outcome = Preparer::new(
        &settings,
        indexer.clone(),
        Some(MockStorage::with_blobs(&["a.mp4"])),
        MockEmbedder::new(2),
        MockDb::default(),
    )
    .execute(&SilentReporter)
    .await
    .unwrap();

    let RunOutcome::Prepared(summary) = outcome else {
        panic!("expected a prepared summary");
    };
    assert_eq!(summary.existing, 1);
    assert_eq!(indexer.lock().exists_calls, vec!["a.mp4"]);
    assert!(indexer.lock().upload_calls.is_empty());
    let cache = IdentifierCache::load(&settings.videos_ids_cache_file, true)
        .await
        .unwrap();
    assert_eq!(cache.get("a.mp4"), Some(&VideoId::new("id-a")));
}

#[tokio::test]
async fn test_no_storage_and_no_cache_fails() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);

    let result = Preparer::new(
        &settings,
        MockIndexer::new(),
        None::<MockStorage>,
        MockEmbedder::new(2),
        MockDb::default(),
    )
    .execute(&SilentReporter)
    .await;

    assert!(matches!(result, Err(VidSearchError::NoVideoSource { .. })));
}

/// A failed collection fetch aborts before the index is touched.
#[tokio::test]
async fn test_collection_failure_aborts_run() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let db = MockDb::default();
    let reporter = RecordingReporter::default();

    let result = Preparer::new(
        &settings,
        MockIndexer::new().with_failing_collection(),
        Some(MockStorage::with_blobs(&["a.mp4"])),
        MockEmbedder::new(2),
        db.clone(),
    )
    .execute(&reporter)
    .await;

    assert!(matches!(result, Err(VidSearchError::Api { status: 503, .. })));
    assert!(db.lock().created.is_empty());
    assert_eq!(
        reporter.events.lock().unwrap().last(),
        Some(&(Stage::PromptContent, "failed"))
    );
}

/// A video whose prompt content never completes is skipped, not fatal.
#[tokio::test(start_paused = true)]
async fn test_abandoned_video_is_skipped() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let mut cache = IdentifierCache::empty(&settings.videos_ids_cache_file);
    cache.record("a.mp4", VideoId::new("v1"));
    cache.record("b.mp4", VideoId::new("v2"));
    cache.flush().await.unwrap();

    let indexer = MockIndexer::new()
        .with_prompt_content(prompt_content("v1", "a.mp4", &["kept"]))
        .with_prompt_responses("v2", vec![PromptContentStatus::InProgress; 5]);
    let db = MockDb::default();

    let outcome = Preparer::new(
        &settings,
        indexer,
        None::<MockStorage>,
        MockEmbedder::new(2),
        db.clone(),
    )
    .execute(&SilentReporter)
    .await
    .unwrap();

    let RunOutcome::Prepared(summary) = outcome else {
        panic!("expected a prepared summary");
    };
    assert_eq!(summary.prompt_content_abandoned, vec![VideoId::new("v2")]);
    assert_eq!(summary.skipped_videos, vec![VideoId::new("v2")]);
    assert_eq!(summary.sections_added, 1);
    assert_eq!(db.uploaded_ids(), vec!["v1_0"]);
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_any_call() {
    let dir = TempDir::new().unwrap();
    let settings = PrepareSettings {
        upload_batch_size: 0,
        ..settings(&dir)
    };
    let storage = MockStorage::with_blobs(&["a.mp4"]);

    let result = Preparer::new(
        &settings,
        MockIndexer::new(),
        Some(storage.clone()),
        MockEmbedder::new(2),
        MockDb::default(),
    )
    .execute(&SilentReporter)
    .await;

    assert!(matches!(result, Err(VidSearchError::InvalidConfig(_))));
    assert_eq!(storage.lock().list_calls, 0);
}
