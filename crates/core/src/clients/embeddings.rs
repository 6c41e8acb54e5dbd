//! Azure OpenAI text embeddings.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{HttpConfig, ensure_success};
use crate::{
    error::{Result, VidSearchError},
    traits::EmbeddingProvider,
};

const SERVICE: &str = "Azure OpenAI";

pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-01";

/// Text embedded once to learn the model dimensionality.
const DIMENSION_PROBE: &str = "dimension probe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl AzureOpenAiConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            deployment: DEFAULT_EMBEDDING_DEPLOYMENT.to_string(),
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
        }
    }

    pub fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct AzureOpenAiEmbeddings {
    client: Client,
    url: String,
    api_key: String,
    dimensions: OnceCell<usize>,
}

impl AzureOpenAiEmbeddings {
    pub fn new(config: &AzureOpenAiConfig, http: HttpConfig) -> Result<Self> {
        if config.endpoint.is_empty() || config.api_key.is_empty() {
            return Err(VidSearchError::InvalidConfig(
                "Azure OpenAI endpoint and API key are required".to_string(),
            ));
        }
        Ok(Self {
            client: http.build_client()?,
            url: config.embeddings_url(),
            api_key: config.api_key.clone(),
            dimensions: OnceCell::new(),
        })
    }
}

impl EmbeddingProvider for AzureOpenAiEmbeddings {
    async fn get_embeddings_size(&self) -> Result<usize> {
        let size = self
            .dimensions
            .get_or_try_init(|| async {
                let probe = self.get_text_embeddings(DIMENSION_PROBE).await?;
                debug!(dimensions = probe.len(), "probed embeddings size");
                Ok::<_, VidSearchError>(probe.len())
            })
            .await?;
        Ok(*size)
    }

    async fn get_text_embeddings(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: text })
            .send()
            .await?;
        let response: EmbeddingResponse = ensure_success(SERVICE, response).await?.json().await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(VidSearchError::EmptyResponse(SERVICE))
    }
}
