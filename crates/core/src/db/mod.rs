//! Vector-search backends for prompt content sections.
//!
//! The backend is picked once, when the database handle is built, and every
//! call then goes to that variant.

pub mod azure_search;
pub mod chroma;

use tracing::info;

pub use azure_search::{AzureSearchConfig, AzureSearchDb};
pub use chroma::{ChromaDb, DEFAULT_CHROMA_URL};

use crate::{
    clients::HttpConfig,
    config::DbBackend,
    error::{Result, VidSearchError},
    traits::PromptContentStore,
    types::{Section, StoredDocument},
};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub db_name: String,
    pub vector_field: String,
    pub chroma_url: String,
    pub azure_search: Option<AzureSearchConfig>,
}

pub enum PromptContentDb {
    Chroma(ChromaDb),
    AzureSearch(AzureSearchDb),
}

impl PromptContentDb {
    pub fn connect(backend: DbBackend, config: &DbConfig, http: HttpConfig) -> Result<Self> {
        info!(backend = backend.name(), db = %config.db_name, "prompt content db");
        match backend {
            DbBackend::ChromaDb => Ok(PromptContentDb::Chroma(ChromaDb::new(
                &config.chroma_url,
                &config.db_name,
                http,
            )?)),
            DbBackend::AzureSearch => {
                let search = config.azure_search.as_ref().ok_or_else(|| {
                    VidSearchError::InvalidConfig(
                        "AZURE_SEARCH_SERVICE_ENDPOINT and AZURE_SEARCH_KEY are required for azure_search"
                            .to_string(),
                    )
                })?;
                Ok(PromptContentDb::AzureSearch(AzureSearchDb::new(
                    search,
                    &config.db_name,
                    &config.vector_field,
                    http,
                )?))
            }
        }
    }

    pub fn backend(&self) -> DbBackend {
        match self {
            PromptContentDb::Chroma(_) => DbBackend::ChromaDb,
            PromptContentDb::AzureSearch(_) => DbBackend::AzureSearch,
        }
    }
}

impl PromptContentStore for PromptContentDb {
    async fn create_db(&mut self, name: &str, vector_search_dimensions: usize) -> Result<()> {
        match self {
            PromptContentDb::Chroma(db) => db.create_db(name, vector_search_dimensions).await,
            PromptContentDb::AzureSearch(db) => db.create_db(name, vector_search_dimensions).await,
        }
    }

    async fn upload_sections(&self, batch: &[Section]) -> Result<()> {
        match self {
            PromptContentDb::Chroma(db) => db.upload_sections(batch).await,
            PromptContentDb::AzureSearch(db) => db.upload_sections(batch).await,
        }
    }

    async fn list_all_documents(&self) -> Result<Vec<StoredDocument>> {
        match self {
            PromptContentDb::Chroma(db) => db.list_all_documents().await,
            PromptContentDb::AzureSearch(db) => db.list_all_documents().await,
        }
    }
}
