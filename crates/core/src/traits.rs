//! Seams to the external services the pipeline drives.
//!
//! Stages and the orchestrator are generic over these traits so they can be
//! exercised against in-memory fakes; the HTTP implementations live in
//! [`crate::clients`] and [`crate::db`].
#![allow(async_fn_in_trait)]

use std::{pin::pin, time::Duration};

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::{
    error::Result,
    retry::PromptContentStatus,
    types::{
        AccountDetails, BlobItem, Privacy, PromptContentCollection, Section, StoredDocument,
        VideoId, VideoSummary,
    },
};

/// Parameters of an upload-by-reference request.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub name: &'a str,
    pub video_url: &'a str,
    pub privacy: Privacy,
    pub excluded_ai: &'a [String],
}

/// Cloud video-indexing service.
pub trait VideoIndexer {
    /// Identifier of an already indexed video with exactly this name.
    async fn video_exists(&self, name: &str) -> Result<Option<VideoId>>;

    /// Start indexing a video fetched from `request.video_url`.
    ///
    /// `Ok(None)` means the service accepted the call but returned no identifier.
    async fn upload_url(&self, request: &UploadRequest<'_>) -> Result<Option<VideoId>>;

    /// Block until the video reaches a terminal index state or `timeout` elapses.
    async fn wait_for_index(&self, video_id: &VideoId, timeout: Duration) -> Result<()>;

    /// Full insights document of an indexed video.
    async fn get_video(&self, video_id: &VideoId) -> Result<serde_json::Value>;

    async fn generate_prompt_content(&self, video_id: &VideoId) -> Result<PromptContentStatus>;

    async fn get_collection_prompt_content(
        &self,
        video_ids: &[VideoId],
    ) -> Result<PromptContentCollection>;

    async fn get_account_details(&self) -> Result<AccountDetails>;

    async fn list_videos(&self) -> Result<Vec<VideoSummary>>;
}

/// Object storage holding source videos and insight documents.
pub trait BlobStore {
    async fn list_blobs(&self) -> Result<Vec<BlobItem>>;

    /// URL the indexing service can fetch the blob from.
    fn blob_url(&self, name: &str) -> Result<String>;

    async fn upload_blob(&self, name: &str, data: Vec<u8>, overwrite: bool) -> Result<()>;
}

/// Text embedding model.
pub trait EmbeddingProvider {
    async fn get_embeddings_size(&self) -> Result<usize>;

    async fn get_text_embeddings(&self, text: &str) -> Result<Vec<f32>>;
}

/// Vector-search database the sections are loaded into.
pub trait PromptContentStore {
    /// Create the named index sized for `vector_search_dimensions`, or reuse it.
    async fn create_db(&mut self, name: &str, vector_search_dimensions: usize) -> Result<()>;

    /// Upload one batch of sections to the current index.
    async fn upload_sections(&self, batch: &[Section]) -> Result<()>;

    async fn list_all_documents(&self) -> Result<Vec<StoredDocument>>;

    /// Drain `sections` into the index, `upload_batch_size` sections per upload.
    ///
    /// Returns the number of sections uploaded. Stops at the first error from
    /// the stream or the backend; batches already sent stay in the index.
    async fn add_sections_to_db<S>(
        &self,
        sections: S,
        upload_batch_size: usize,
        verbose: bool,
    ) -> Result<usize>
    where
        S: Stream<Item = Result<Section>>,
    {
        let batch_size = upload_batch_size.max(1);
        let mut sections = pin!(sections);
        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0;

        while let Some(section) = sections.next().await {
            batch.push(section?);
            if batch.len() == batch_size {
                self.upload_sections(&batch).await?;
                total += batch.len();
                log_batch(verbose, batch.len(), total);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.upload_sections(&batch).await?;
            total += batch.len();
            log_batch(verbose, batch.len(), total);
        }

        Ok(total)
    }
}

fn log_batch(verbose: bool, size: usize, total: usize) {
    if verbose {
        info!(batch = size, total, "uploaded sections batch");
    } else {
        debug!(batch = size, total, "uploaded sections batch");
    }
}
