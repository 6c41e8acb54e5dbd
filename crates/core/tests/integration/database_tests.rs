//! Integration tests for the database stage.

use crate::integration::common::{MockDb, section};
use futures::stream;
use vidsearch_core::error::{Result, VidSearchError};
use vidsearch_core::pipeline::load_sections_into_db;
use vidsearch_core::traits::PromptContentStore;
use vidsearch_core::types::Section;

fn sections(count: u32) -> impl futures::Stream<Item = Result<Section>> {
    stream::iter((0..count).map(|i| Ok(section(i))))
}

/// 250 sections in batches of 100 go out as 100, 100, 50.
#[tokio::test]
async fn test_batches_of_fixed_size_with_remainder() {
    let db = MockDb::default();

    let added = db.add_sections_to_db(sections(250), 100, false).await.unwrap();

    assert_eq!(added, 250);
    assert_eq!(db.batch_sizes(), vec![100, 100, 50]);
    let ids = db.uploaded_ids();
    assert_eq!(ids.first().map(String::as_str), Some("v1_0"));
    assert_eq!(ids.last().map(String::as_str), Some("v1_249"));
}

#[tokio::test]
async fn test_exact_multiple_has_no_empty_batch() {
    let db = MockDb::default();

    db.add_sections_to_db(sections(200), 100, true).await.unwrap();

    assert_eq!(db.batch_sizes(), vec![100, 100]);
}

#[tokio::test]
async fn test_empty_stream_uploads_nothing() {
    let db = MockDb::default();

    let added = db.add_sections_to_db(sections(0), 100, false).await.unwrap();

    assert_eq!(added, 0);
    assert!(db.batch_sizes().is_empty());
}

/// The index is created, sized to the embeddings, before any upload.
#[tokio::test]
async fn test_load_creates_index_then_uploads() {
    let mut db = MockDb::default();
    let probe = db.clone();

    let added = load_sections_into_db(&mut db, "vi-test-index", 1536, sections(3), 100, false)
        .await
        .unwrap();

    assert_eq!(added, 3);
    assert_eq!(probe.lock().created, vec![("vi-test-index".to_string(), 1536)]);
    assert_eq!(probe.batch_sizes(), vec![3]);
}

/// A failing section stops the drain; earlier full batches stay uploaded.
#[tokio::test]
async fn test_stream_error_stops_upload() {
    let db = MockDb::default();
    let items = stream::iter((0..150).map(|i| {
        if i == 120 {
            Err(VidSearchError::EmptyResponse("Azure OpenAI"))
        } else {
            Ok(section(i))
        }
    }));

    let result = db.add_sections_to_db(items, 100, false).await;

    assert!(matches!(result, Err(VidSearchError::EmptyResponse(_))));
    assert_eq!(db.batch_sizes(), vec![100]);
}
