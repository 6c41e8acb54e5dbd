//! ChromaDB collection over its REST API.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    clients::{HttpConfig, ensure_success},
    error::{Result, VidSearchError},
    traits::PromptContentStore,
    types::{Section, StoredDocument},
};

const SERVICE: &str = "ChromaDB";

pub const DEFAULT_CHROMA_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Deserialize)]
struct Collection {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<serde_json::Value>,
}

impl<'a> AddRequest<'a> {
    fn from_sections(batch: &'a [Section]) -> Self {
        Self {
            ids: batch.iter().map(|s| s.id.as_str()).collect(),
            embeddings: batch.iter().map(|s| s.embeddings.as_slice()).collect(),
            documents: batch.iter().map(|s| s.content.as_str()).collect(),
            metadatas: batch.iter().map(Section::metadata).collect(),
        }
    }
}

#[derive(Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Vec<Option<String>>,
}

pub struct ChromaDb {
    client: Client,
    base_url: String,
    /// Collection listed when none was created in this run.
    default_name: String,
    collection: Option<Collection>,
}

impl ChromaDb {
    pub fn new(base_url: &str, default_name: &str, http: HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http.build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_name: default_name.to_string(),
            collection: None,
        })
    }

    fn collections_url(&self) -> String {
        format!("{}/api/v1/collections", self.base_url)
    }

    async fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        let response = self
            .client
            .get(format!("{}/{}", self.collections_url(), name))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(ensure_success(SERVICE, response).await?.json().await?))
    }
}

impl PromptContentStore for ChromaDb {
    async fn create_db(&mut self, name: &str, _vector_search_dimensions: usize) -> Result<()> {
        let response = self
            .client
            .post(self.collections_url())
            .json(&json!({
                "name": name,
                "metadata": { "hnsw:space": "cosine" },
                "get_or_create": true,
            }))
            .send()
            .await?;
        let collection: Collection = ensure_success(SERVICE, response).await?.json().await?;
        info!(collection = %collection.name, id = %collection.id, "using chroma collection");
        self.collection = Some(collection);
        Ok(())
    }

    async fn upload_sections(&self, batch: &[Section]) -> Result<()> {
        let collection = self.collection.as_ref().ok_or_else(|| {
            VidSearchError::InvalidConfig("chroma collection not created".to_string())
        })?;
        let response = self
            .client
            .post(format!("{}/{}/add", self.collections_url(), collection.id))
            .json(&AddRequest::from_sections(batch))
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn list_all_documents(&self) -> Result<Vec<StoredDocument>> {
        let collection = match &self.collection {
            Some(c) => c.clone(),
            None => match self.find_collection(&self.default_name).await? {
                Some(c) => c,
                None => {
                    debug!(collection = %self.default_name, "collection does not exist");
                    return Ok(Vec::new());
                }
            },
        };

        let response = self
            .client
            .post(format!("{}/{}/get", self.collections_url(), collection.id))
            .json(&json!({ "include": ["documents"] }))
            .send()
            .await?;
        let got: GetResponse = ensure_success(SERVICE, response).await?.json().await?;
        Ok(into_documents(got))
    }
}

fn into_documents(got: GetResponse) -> Vec<StoredDocument> {
    let mut documents = got.documents.into_iter();
    got.ids
        .into_iter()
        .map(|id| StoredDocument {
            id,
            content: documents.next().flatten().unwrap_or_default(),
        })
        .collect()
}
