use std::path::PathBuf;

use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use vidsearch_core::{
    DbBackend, PrepareSettings, VECTOR_FIELD_NAME,
    config::{DEFAULT_API_ENDPOINT, DEFAULT_API_VERSION, DEFAULT_ARM_ENDPOINT, DEFAULT_DB_NAME},
    default_cache_file, parse_excluded_ai,
    types::Privacy,
};

/// CLI wrapper for DbBackend (needed for clap ValueEnum)
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CliDbBackend {
    #[value(name = "chromadb")]
    Chromadb,
    #[default]
    #[value(name = "azure_search")]
    AzureSearch,
}

impl From<CliDbBackend> for DbBackend {
    fn from(cli: CliDbBackend) -> Self {
        match cli {
            CliDbBackend::Chromadb => DbBackend::ChromaDb,
            CliDbBackend::AzureSearch => DbBackend::AzureSearch,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CliPrivacy {
    #[default]
    Public,
    Private,
}

impl From<CliPrivacy> for Privacy {
    fn from(cli: CliPrivacy) -> Self {
        match cli {
            CliPrivacy::Public => Privacy::Public,
            CliPrivacy::Private => Privacy::Private,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vidsearch")]
#[command(
    version,
    about = "Index videos with Azure Video Indexer and load their prompt content into a vector search database"
)]
#[command(after_help = "Video sources:
  USE_BLOB_STORAGE=true   upload every video in AZURE_STORAGE_CONTAINER_NAME
  USE_BLOB_STORAGE=false  reuse the ids in VIDEOS_IDS_CACHE_FILE ({\"name\": \"id\"})")]
pub struct Cli {
    /// Only check connectivity to every service, change nothing
    #[arg(long, env = "DRY_RUN", value_parser = parse_true)]
    pub dry_run: bool,

    /// Vector index name, keep the vi-<name>-index form
    #[arg(long, env = "PROMPT_CONTENT_DB_NAME", default_value = DEFAULT_DB_NAME)]
    pub db_name: String,

    /// Vector search backend
    #[arg(long, env = "PROMPT_CONTENT_DB", value_enum, default_value_t = CliDbBackend::AzureSearch)]
    pub db: CliDbBackend,

    /// List and upload videos from the blob container
    #[arg(long, env = "USE_BLOB_STORAGE", value_parser = parse_true)]
    pub use_blob_storage: bool,

    #[arg(long, env = "AZURE_STORAGE_SAS_URL", hide_env_values = true)]
    pub storage_sas_url: Option<String>,

    #[arg(long, env = "AZURE_STORAGE_CONTAINER_NAME")]
    pub storage_container: Option<String>,

    #[arg(long, env = "SubscriptionId", default_value = "")]
    pub subscription_id: String,

    #[arg(long, env = "ResourceGroup", default_value = "")]
    pub resource_group: String,

    #[arg(long, env = "AccountName", default_value = "")]
    pub account_name: String,

    /// Azure Resource Manager bearer token
    #[arg(long, env = "AZURE_ARM_TOKEN", hide_env_values = true, default_value = "")]
    pub arm_token: String,

    #[arg(long, env = "VI_API_ENDPOINT", default_value = DEFAULT_API_ENDPOINT)]
    pub vi_api_endpoint: String,

    #[arg(long, env = "VI_ARM_ENDPOINT", default_value = DEFAULT_ARM_ENDPOINT)]
    pub vi_arm_endpoint: String,

    #[arg(long, env = "VI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub vi_api_version: String,

    #[arg(long, env = "AZURE_OPENAI_ENDPOINT", default_value = "")]
    pub openai_endpoint: String,

    #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub openai_api_key: String,

    #[arg(
        long,
        env = "AZURE_OPENAI_TEXT_EMBEDDING_DEPLOYMENT_NAME",
        default_value = vidsearch_core::clients::embeddings::DEFAULT_EMBEDDING_DEPLOYMENT
    )]
    pub embedding_deployment: String,

    #[arg(
        long,
        env = "AZURE_OPENAI_API_VERSION",
        default_value = vidsearch_core::clients::embeddings::DEFAULT_OPENAI_API_VERSION
    )]
    pub openai_api_version: String,

    #[arg(long, env = "AZURE_SEARCH_SERVICE_ENDPOINT")]
    pub search_endpoint: Option<String>,

    #[arg(long, env = "AZURE_SEARCH_KEY", hide_env_values = true)]
    pub search_key: Option<String>,

    #[arg(long, env = "CHROMA_URL", default_value = vidsearch_core::db::DEFAULT_CHROMA_URL)]
    pub chroma_url: String,

    /// Video name to id cache, defaults to the user cache directory
    #[arg(long, env = "VIDEOS_IDS_CACHE_FILE")]
    pub videos_ids_cache_file: Option<PathBuf>,

    /// Read the id cache at start
    #[arg(
        long,
        env = "USE_VIDEOS_IDS_CACHE",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub use_videos_ids_cache: bool,

    #[arg(long, env = "VIDEO_PRIVACY", value_enum, default_value_t = CliPrivacy::Public)]
    pub privacy: CliPrivacy,

    /// Comma separated AI features the indexer should skip
    #[arg(long, env = "EXCLUDED_AI", default_value = "")]
    pub excluded_ai: String,

    /// Log every uploaded batch
    #[arg(short, long)]
    pub verbose: bool,
}

/// Mode switches turn on only for `true`, in any case.
fn parse_true(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

impl Cli {
    pub fn settings(&self) -> PrepareSettings {
        PrepareSettings {
            db_name: self.db_name.clone(),
            dry_run: self.dry_run,
            use_videos_ids_cache: self.use_videos_ids_cache,
            videos_ids_cache_file: self
                .videos_ids_cache_file
                .clone()
                .unwrap_or_else(default_cache_file),
            verbose: self.verbose,
            privacy: self.privacy.into(),
            excluded_ai: parse_excluded_ai(&self.excluded_ai),
            embeddings_field: VECTOR_FIELD_NAME.to_string(),
            ..PrepareSettings::default()
        }
    }
}
