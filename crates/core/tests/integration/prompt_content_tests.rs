//! Integration tests for prompt content generation and retrieval.
//!
//! Retries sleep 60 seconds between attempts, so these run on a paused clock
//! and assert on virtual elapsed time.

use std::time::Duration;

use crate::integration::common::{MockIndexer, prompt_content};
use tokio::time::Instant;
use vidsearch_core::pipeline::{generate_prompt_content, get_collection_prompt_content};
use vidsearch_core::retry::{PromptContentStatus, RetryPolicy};
use vidsearch_core::types::VideoId;

use PromptContentStatus::{Conflict, InProgress, Success};

fn ids(ids: &[&str]) -> Vec<VideoId> {
    ids.iter().map(|id| VideoId::new(*id)).collect()
}

/// Two in-progress responses then success: exactly two waits before proceeding.
#[tokio::test(start_paused = true)]
async fn test_in_progress_twice_then_success_waits_twice() {
    let indexer =
        MockIndexer::new().with_prompt_responses("v1", vec![InProgress, InProgress, Success]);
    let started = Instant::now();

    let report = generate_prompt_content(&indexer, &ids(&["v1"]), &RetryPolicy::default()).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(120), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(180), "waited {elapsed:?}");
    assert_eq!(report.ready, ids(&["v1"]));
    assert_eq!(indexer.lock().prompt_calls.len(), 3);
}

/// Five in-progress responses: abandoned after exactly five attempts, no error.
#[tokio::test(start_paused = true)]
async fn test_always_in_progress_is_abandoned_after_five_attempts() {
    let indexer = MockIndexer::new().with_prompt_responses("v1", vec![InProgress; 6]);
    let started = Instant::now();

    let report = generate_prompt_content(&indexer, &ids(&["v1"]), &RetryPolicy::default()).await;

    assert_eq!(indexer.lock().prompt_calls.len(), 5);
    assert_eq!(report.abandoned, ids(&["v1"]));
    assert!(report.ready.is_empty());
    assert!(report.failed.is_empty());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(240), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(300), "waited {elapsed:?}");
}

/// A conflict is retried like an in-progress response.
#[tokio::test(start_paused = true)]
async fn test_conflict_is_retried() {
    let indexer = MockIndexer::new().with_prompt_responses("v1", vec![Conflict, Success]);

    let report = generate_prompt_content(&indexer, &ids(&["v1"]), &RetryPolicy::default()).await;

    assert_eq!(report.ready, ids(&["v1"]));
    assert_eq!(indexer.lock().prompt_calls.len(), 2);
}

/// A video that keeps failing is given up on; the next one is still requested.
#[tokio::test(start_paused = true)]
async fn test_persistent_failure_skips_to_next_video() {
    let indexer = MockIndexer::new().with_prompt_responses(
        "v1",
        vec![PromptContentStatus::Fatal("HTTP 500: boom".to_string()); 5],
    );
    let started = Instant::now();

    let report =
        generate_prompt_content(&indexer, &ids(&["v1", "v2"]), &RetryPolicy::default()).await;

    assert_eq!(report.failed, ids(&["v1"]));
    assert_eq!(report.ready, ids(&["v2"]));
    assert_eq!(indexer.lock().prompt_calls.len(), 6);
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// A transient server error is retried without the backoff wait.
#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried_at_once() {
    let indexer = MockIndexer::new().with_prompt_responses(
        "v1",
        vec![PromptContentStatus::Fatal("HTTP 503: busy".to_string()), Success],
    );
    let started = Instant::now();

    let report = generate_prompt_content(&indexer, &ids(&["v1"]), &RetryPolicy::default()).await;

    assert_eq!(report.ready, ids(&["v1"]));
    assert!(report.failed.is_empty());
    assert_eq!(indexer.lock().prompt_calls, ids(&["v1", "v1"]));
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// The collection is fetched in one call covering every identifier.
#[tokio::test]
async fn test_collection_fetched_in_one_call() {
    let indexer = MockIndexer::new()
        .with_prompt_content(prompt_content("v1", "a.mp4", &["intro", "demo"]));

    let collection = get_collection_prompt_content(&indexer, &ids(&["v1", "v2"]))
        .await
        .unwrap();

    assert_eq!(indexer.lock().collection_calls, vec![ids(&["v1", "v2"])]);
    assert_eq!(collection.section_count(), 2);
    assert_eq!(collection.empty_videos(), ids(&["v2"]));
}

#[tokio::test]
async fn test_collection_failure_is_returned() {
    let indexer = MockIndexer::new().with_failing_collection();

    let result = get_collection_prompt_content(&indexer, &ids(&["v1"])).await;

    assert!(result.is_err());
}
