use std::{path::PathBuf, time::Duration};

use crate::{
    cache::default_cache_file,
    error::{Result, VidSearchError},
    retry::RetryPolicy,
    types::Privacy,
};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.videoindexer.ai";
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2024-01-01";

/// UI parsing expects the `vi-<name>-index` form.
pub const DEFAULT_DB_NAME: &str = "vi-prompt-content-example-index";

/// Document field holding the section embedding.
pub const VECTOR_FIELD_NAME: &str = "content_vector";

pub const DEFAULT_PROCESSING_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_UPLOAD_BATCH_SIZE: usize = 100;

/// Indexing-service account coordinates.
///
/// Constructed through [`AccountConfig::new`], which rejects empty fields
/// before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    pub api_endpoint: String,
    pub arm_endpoint: String,
    pub api_version: String,
}

impl AccountConfig {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            account_name: account_name.into(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            arm_endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_endpoints(
        mut self,
        api_endpoint: impl Into<String>,
        arm_endpoint: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        self.api_endpoint = api_endpoint.into().trim_end_matches('/').to_string();
        self.arm_endpoint = arm_endpoint.into().trim_end_matches('/').to_string();
        self.api_version = api_version.into();
        self
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("SubscriptionId", &self.subscription_id),
            ("ResourceGroup", &self.resource_group),
            ("AccountName", &self.account_name),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(VidSearchError::MissingAccountField { field });
            }
        }
        Ok(())
    }

    /// ARM resource URL of the account.
    pub fn arm_account_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.VideoIndexer/accounts/{}",
            self.arm_endpoint, self.subscription_id, self.resource_group, self.account_name
        )
    }
}

/// Vector-search backend holding the prompt content sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DbBackend {
    ChromaDb,
    #[default]
    AzureSearch,
}

impl DbBackend {
    pub fn name(&self) -> &'static str {
        match self {
            DbBackend::ChromaDb => "ChromaDB",
            DbBackend::AzureSearch => "Azure AI Search",
        }
    }
}

impl std::str::FromStr for DbBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "chromadb" => Ok(DbBackend::ChromaDb),
            "azure_search" => Ok(DbBackend::AzureSearch),
            other => Err(format!(
                "unknown prompt content db '{other}', expected chromadb or azure_search"
            )),
        }
    }
}

/// Blob container holding the source videos and their insights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub sas_url: String,
    pub container_name: String,
}

impl StorageConfig {
    /// Blob storage is used only when enabled and both the URL and the container are set.
    pub fn resolve(
        use_blob_storage: bool,
        sas_url: Option<String>,
        container_name: Option<String>,
    ) -> Option<Self> {
        if !use_blob_storage {
            return None;
        }
        let sas_url = sas_url.filter(|s| !s.trim().is_empty())?;
        let container_name = container_name.filter(|s| !s.trim().is_empty())?;
        Some(Self {
            sas_url,
            container_name,
        })
    }
}

/// Everything the orchestrator needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PrepareSettings {
    pub db_name: String,
    pub dry_run: bool,
    pub use_videos_ids_cache: bool,
    pub videos_ids_cache_file: PathBuf,
    pub verbose: bool,
    pub privacy: Privacy,
    pub excluded_ai: Vec<String>,
    pub processing_timeout: Duration,
    pub prompt_content_retry: RetryPolicy,
    pub upload_batch_size: usize,
    pub embeddings_field: String,
}

impl Default for PrepareSettings {
    fn default() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            dry_run: false,
            use_videos_ids_cache: true,
            videos_ids_cache_file: default_cache_file(),
            verbose: false,
            privacy: Privacy::Public,
            excluded_ai: Vec::new(),
            processing_timeout: DEFAULT_PROCESSING_TIMEOUT,
            prompt_content_retry: RetryPolicy::default(),
            upload_batch_size: DEFAULT_UPLOAD_BATCH_SIZE,
            embeddings_field: VECTOR_FIELD_NAME.to_string(),
        }
    }
}

impl PrepareSettings {
    pub fn validate(&self) -> Result<()> {
        if self.db_name.trim().is_empty() {
            return Err(VidSearchError::InvalidConfig(
                "prompt content db name must not be empty".to_string(),
            ));
        }
        if self.upload_batch_size == 0 {
            return Err(VidSearchError::InvalidConfig(
                "upload batch size must be > 0".to_string(),
            ));
        }
        if self.embeddings_field.trim().is_empty() {
            return Err(VidSearchError::InvalidConfig(
                "embeddings field name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a comma separated feature list, dropping blanks.
pub fn parse_excluded_ai(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
