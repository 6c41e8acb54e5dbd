//! Integration tests for the processing-wait stage.

use std::time::Duration;

use crate::integration::common::{MockIndexer, MockStorage};
use vidsearch_core::error::VidSearchError;
use vidsearch_core::pipeline::wait_for_videos_processing_and_save_insights;
use vidsearch_core::types::{VideoId, VideoRecord};

fn record(name: &str, id: &str) -> VideoRecord {
    VideoRecord {
        name: name.to_string(),
        id: VideoId::new(id),
    }
}

/// Insights are stored under `<name>_insights.json` with overwrite enabled.
#[tokio::test]
async fn test_insights_saved_per_video() {
    let indexer = MockIndexer::new();
    let storage = MockStorage::default();
    let videos = vec![record("a.mp4", "v1"), record("b.mp4", "v2")];

    let report = wait_for_videos_processing_and_save_insights(
        &indexer,
        &videos,
        Some(&storage),
        Duration::from_secs(600),
    )
    .await;

    assert_eq!(report.indexed, 2);
    assert_eq!(report.insights_saved, 2);
    assert_eq!(
        storage.uploaded_names(),
        vec!["a.mp4_insights.json", "b.mp4_insights.json"]
    );
    let state = storage.lock();
    let (_, body, overwrite) = &state.uploads[0];
    assert!(*overwrite);
    let insights: serde_json::Value = serde_json::from_slice(body).unwrap();
    assert_eq!(insights["id"], "v1");
}

/// A wait that never returns is cut off by the timeout; the next video still runs.
#[tokio::test(start_paused = true)]
async fn test_stuck_video_times_out_and_batch_continues() {
    let indexer = MockIndexer::new().with_stuck_video("v1");
    let storage = MockStorage::default();
    let videos = vec![record("a.mp4", "v1"), record("b.mp4", "v2")];

    let report = wait_for_videos_processing_and_save_insights(
        &indexer,
        &videos,
        Some(&storage),
        Duration::from_secs(1),
    )
    .await;

    assert_eq!(report.indexed, 1);
    assert_eq!(report.failed.len(), 1);
    let (name, error) = &report.failed[0];
    assert_eq!(name, "a.mp4");
    assert!(matches!(
        error,
        VidSearchError::IndexingTimeout { seconds: 1, .. }
    ));
    assert_eq!(storage.uploaded_names(), vec!["b.mp4_insights.json"]);
    assert_eq!(indexer.lock().get_video_calls, vec![VideoId::new("v2")]);
}

/// Without blob storage the insights are fetched but nothing is written.
#[tokio::test]
async fn test_no_storage_skips_persisting_insights() {
    let indexer = MockIndexer::new();
    let videos = vec![record("a.mp4", "v1")];

    let report = wait_for_videos_processing_and_save_insights::<_, MockStorage>(
        &indexer,
        &videos,
        None,
        Duration::from_secs(600),
    )
    .await;

    assert_eq!(report.indexed, 1);
    assert_eq!(report.insights_saved, 0);
    assert_eq!(indexer.lock().get_video_calls.len(), 1);
}
