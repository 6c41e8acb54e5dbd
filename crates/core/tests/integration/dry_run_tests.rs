//! Integration tests for the dry run.

use crate::integration::common::{MockDb, MockEmbedder, MockIndexer, MockStorage};
use tempfile::TempDir;
use vidsearch_core::config::PrepareSettings;
use vidsearch_core::error::VidSearchError;
use vidsearch_core::prepare::{
    DATABASE_SERVICE, EMBEDDING_SERVICE, INDEXER_SERVICE, Preparer, ProbeStatus, RunOutcome,
    STORAGE_SERVICE, dry_run_collaborators,
};
use vidsearch_core::progress::SilentReporter;
use vidsearch_core::types::StoredDocument;

fn dry_run_settings(dir: &TempDir) -> PrepareSettings {
    PrepareSettings {
        dry_run: true,
        videos_ids_cache_file: dir.path().join("videos_ids_cache.json"),
        ..PrepareSettings::default()
    }
}

/// Every collaborator is probed and nothing is uploaded, created or cached.
#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let settings = dry_run_settings(&dir);
    let indexer = MockIndexer::new().with_existing("a.mp4", "v1");
    let storage = MockStorage::with_blobs(&["a.mp4", "b.mp4"]);
    let db = MockDb::default();
    db.lock().documents.push(StoredDocument {
        id: "v1_0".to_string(),
        content: "hello".to_string(),
    });

    let outcome = Preparer::new(
        &settings,
        indexer.clone(),
        Some(storage.clone()),
        MockEmbedder::new(8),
        db.clone(),
    )
    .execute(&SilentReporter)
    .await
    .unwrap();

    let RunOutcome::DryRun(report) = outcome else {
        panic!("expected a dry run report");
    };
    assert!(report.all_ok());
    let services: Vec<&str> = report.probes.iter().map(|p| p.service).collect();
    assert_eq!(
        services,
        vec![STORAGE_SERVICE, INDEXER_SERVICE, EMBEDDING_SERVICE, DATABASE_SERVICE]
    );
    assert_eq!(report.probes[0].details, vec!["Blob: a.mp4", "Blob: b.mp4"]);
    assert!(report.probes[1].details.contains(&"Video ID: v1, Name: a.mp4".to_string()));
    assert_eq!(report.probes[2].details, vec!["Embeddings size: 8"]);
    assert_eq!(
        report.probes[3].details,
        vec!["Document ID: v1_0, Content: hello"]
    );

    assert!(storage.lock().uploads.is_empty());
    assert!(db.lock().created.is_empty());
    assert!(db.lock().batches.is_empty());
    let state = indexer.lock();
    assert!(state.upload_calls.is_empty());
    assert!(state.prompt_calls.is_empty());
    assert!(!settings.videos_ids_cache_file.exists());
}

#[tokio::test]
async fn test_dry_run_without_storage_reports_skip() {
    let dir = TempDir::new().unwrap();
    let settings = dry_run_settings(&dir);

    let outcome = Preparer::new(
        &settings,
        MockIndexer::new(),
        None::<MockStorage>,
        MockEmbedder::new(4),
        MockDb::default(),
    )
    .execute(&SilentReporter)
    .await
    .unwrap();

    let RunOutcome::DryRun(report) = outcome else {
        panic!("expected a dry run report");
    };
    assert!(matches!(report.probes[0].status, ProbeStatus::Skipped(_)));
    assert!(report.all_ok());
}

/// A failing probe is reported; the other probes still run.
#[tokio::test]
async fn test_dry_run_reports_failed_probe() {
    let dir = TempDir::new().unwrap();
    let settings = dry_run_settings(&dir);
    let db = MockDb::default();
    db.lock().fail_listing = true;

    let outcome = Preparer::new(
        &settings,
        MockIndexer::new(),
        Some(MockStorage::default()),
        MockEmbedder::new(4),
        db,
    )
    .execute(&SilentReporter)
    .await
    .unwrap();

    let RunOutcome::DryRun(report) = outcome else {
        panic!("expected a dry run report");
    };
    assert!(!report.all_ok());
    assert!(matches!(report.probes[3].status, ProbeStatus::Failed(_)));
    assert_eq!(report.probes[2].status, ProbeStatus::Ok);
}

/// A client that could not be built is one failed entry; every other service is
/// still probed.
#[tokio::test]
async fn test_dry_run_reports_client_that_failed_to_build() {
    let dir = TempDir::new().unwrap();
    let settings = dry_run_settings(&dir);
    let indexer = MockIndexer::new().with_existing("a.mp4", "v1");
    let storage = MockStorage::with_blobs(&["a.mp4"]);
    let db = MockDb::default();
    let embedder: vidsearch_core::error::Result<MockEmbedder> = Err(
        VidSearchError::InvalidConfig("Azure OpenAI API key is empty".to_string()),
    );

    let report = dry_run_collaborators(
        &settings,
        Ok(indexer.clone()),
        Some(Ok(storage.clone())),
        embedder,
        Ok(db.clone()),
        &SilentReporter,
    )
    .await
    .unwrap();

    assert!(!report.all_ok());
    assert_eq!(report.probes.len(), 4);
    assert_eq!(report.probes[0].status, ProbeStatus::Ok);
    assert_eq!(report.probes[0].details, vec!["Blob: a.mp4"]);
    assert_eq!(report.probes[1].status, ProbeStatus::Ok);
    assert_eq!(report.probes[2].service, EMBEDDING_SERVICE);
    assert!(matches!(
        &report.probes[2].status,
        ProbeStatus::Failed(reason) if reason.contains("API key is empty")
    ));
    assert_eq!(report.probes[3].status, ProbeStatus::Ok);
    assert_eq!(storage.lock().list_calls, 1);
}

#[tokio::test]
async fn test_dry_run_reports_every_unbuildable_client() {
    let dir = TempDir::new().unwrap();
    let settings = dry_run_settings(&dir);
    let failed = || VidSearchError::InvalidConfig("missing".to_string());

    let report = dry_run_collaborators::<MockIndexer, MockStorage, MockEmbedder, MockDb, _>(
        &settings,
        Err(failed()),
        Some(Err(failed())),
        Err(failed()),
        Err(failed()),
        &SilentReporter,
    )
    .await
    .unwrap();

    assert!(
        report
            .probes
            .iter()
            .all(|p| matches!(p.status, ProbeStatus::Failed(_)))
    );
}
