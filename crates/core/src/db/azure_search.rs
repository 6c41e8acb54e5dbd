//! Azure AI Search index with an HNSW vector field.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
    clients::{HttpConfig, ensure_success},
    error::{Result, VidSearchError},
    traits::PromptContentStore,
    types::{Section, StoredDocument},
};

const SERVICE: &str = "Azure AI Search";

pub const SEARCH_API_VERSION: &str = "2023-11-01";

const LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSearchConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Deserialize)]
struct SearchPage {
    value: Vec<StoredDocument>,
}

pub struct AzureSearchDb {
    client: Client,
    endpoint: String,
    api_key: String,
    vector_field: String,
    index_name: String,
}

impl AzureSearchDb {
    pub fn new(
        config: &AzureSearchConfig,
        index_name: &str,
        vector_field: &str,
        http: HttpConfig,
    ) -> Result<Self> {
        if config.endpoint.trim().is_empty() || config.api_key.trim().is_empty() {
            return Err(VidSearchError::InvalidConfig(
                "Azure AI Search endpoint and key are required".to_string(),
            ));
        }
        Ok(Self {
            client: http.build_client()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            vector_field: vector_field.to_string(),
            index_name: index_name.to_string(),
        })
    }

    fn index_url(&self, suffix: &str) -> String {
        format!(
            "{}/indexes/{}{}?api-version={}",
            self.endpoint, self.index_name, suffix, SEARCH_API_VERSION
        )
    }
}

/// Index definition for sections with `dimensions`-wide vectors under `vector_field`.
fn index_schema(name: &str, vector_field: &str, dimensions: usize) -> Value {
    let text = |name: &str, searchable: bool| {
        json!({
            "name": name,
            "type": "Edm.String",
            "searchable": searchable,
            "filterable": !searchable,
            "retrievable": true,
        })
    };
    let number = |name: &str, kind: &str| {
        json!({
            "name": name,
            "type": kind,
            "filterable": true,
            "sortable": true,
            "retrievable": true,
        })
    };

    json!({
        "name": name,
        "fields": [
            {"name": "id", "type": "Edm.String", "key": true, "filterable": true},
            text("account_id", false),
            text("location", false),
            text("video_id", false),
            text("video_name", true),
            text("partition", false),
            number("section_index", "Edm.Int32"),
            text("start_time", false),
            text("end_time", false),
            number("start_seconds", "Edm.Double"),
            number("end_seconds", "Edm.Double"),
            text("content", true),
            {
                "name": vector_field,
                "type": "Collection(Edm.Single)",
                "searchable": true,
                "retrievable": false,
                "dimensions": dimensions,
                "vectorSearchProfile": "vector-profile",
            },
        ],
        "vectorSearch": {
            "algorithms": [{"name": "hnsw-config", "kind": "hnsw"}],
            "profiles": [{"name": "vector-profile", "algorithm": "hnsw-config"}],
        },
    })
}

fn upload_body(batch: &[Section]) -> Result<Value> {
    let value = batch
        .iter()
        .map(|section| -> Result<Value> {
            let mut doc = serde_json::to_value(section)?;
            if let Value::Object(map) = &mut doc {
                map.insert("@search.action".to_string(), json!("mergeOrUpload"));
            }
            Ok(doc)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "value": value }))
}

impl PromptContentStore for AzureSearchDb {
    async fn create_db(&mut self, name: &str, vector_search_dimensions: usize) -> Result<()> {
        self.index_name = name.to_string();
        let response = self
            .client
            .put(self.index_url(""))
            .header("api-key", &self.api_key)
            .json(&index_schema(name, &self.vector_field, vector_search_dimensions))
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        info!(index = %name, dimensions = vector_search_dimensions, "search index ready");
        Ok(())
    }

    async fn upload_sections(&self, batch: &[Section]) -> Result<()> {
        let response = self
            .client
            .post(self.index_url("/docs/index"))
            .header("api-key", &self.api_key)
            .json(&upload_body(batch)?)
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn list_all_documents(&self) -> Result<Vec<StoredDocument>> {
        let mut documents = Vec::new();

        loop {
            let response = self
                .client
                .post(self.index_url("/docs/search"))
                .header("api-key", &self.api_key)
                .json(&json!({
                    "search": "*",
                    "select": "id,content",
                    "top": LIST_PAGE_SIZE,
                    "skip": documents.len(),
                }))
                .send()
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                debug!(index = %self.index_name, "search index does not exist");
                break;
            }
            let page: SearchPage = ensure_success(SERVICE, response).await?.json().await?;
            let fetched = page.value.len();
            documents.extend(page.value);
            if fetched < LIST_PAGE_SIZE {
                break;
            }
        }

        Ok(documents)
    }
}
