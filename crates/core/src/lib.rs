pub mod cache;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod prepare;
pub mod progress;
pub mod retry;
pub mod sections;
pub mod traits;
pub mod types;

pub use cache::{IdentifierCache, default_cache_file, get_root_cache_dir};
pub use clients::{AzureBlobContainer, AzureOpenAiEmbeddings, HttpConfig, VideoIndexerClient};
pub use config::{
    AccountConfig, DbBackend, PrepareSettings, StorageConfig, VECTOR_FIELD_NAME,
    parse_excluded_ai,
};
pub use db::{DbConfig, PromptContentDb};
pub use error::{Result, VidSearchError};
pub use format::{format_dry_run_readable, format_duration, format_summary_readable};
pub use prepare::{DryRunReport, PrepareSummary, Preparer, RunOutcome, dry_run_collaborators};
pub use progress::{PipelineEvent, ProgressReporter, SilentReporter, Stage, TracingReporter};
pub use retry::{PromptContentStatus, RetryPolicy};
pub use sections::get_sections_generator;
pub use types::{Privacy, Section, VideoId};
