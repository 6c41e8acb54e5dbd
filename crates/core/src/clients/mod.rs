//! HTTP implementations of the service traits.

pub mod blob_storage;
pub mod embeddings;
pub mod video_indexer;

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{Result, VidSearchError};

pub use blob_storage::AzureBlobContainer;
pub use embeddings::AzureOpenAiEmbeddings;
pub use video_indexer::VideoIndexerClient;

/// Per-request timeout shared by every client.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}

/// Turn a non-2xx response into [`VidSearchError::Api`] carrying the body.
pub(crate) async fn ensure_success(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(VidSearchError::api(service, status, body))
}
