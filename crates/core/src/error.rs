use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidSearchError {
    #[error("Missing account configuration: {field} must not be empty")]
    MissingAccountField { field: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No video source: enable blob storage or provide an identifier cache at {cache_file}")]
    NoVideoSource { cache_file: PathBuf },

    #[error("{service} request failed with HTTP {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Timed out after {seconds} seconds waiting for video {video_id} to be indexed")]
    IndexingTimeout { video_id: String, seconds: u64 },

    #[error("Indexing of video {video_id} ended in state {state}")]
    IndexingFailed { video_id: String, state: String },

    #[error("Prompt content request failed for video {video_id}: {reason}")]
    PromptContentRequest { video_id: String, reason: String },

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::DeError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl VidSearchError {
    pub fn api(service: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        VidSearchError::Api {
            service,
            status: status.as_u16(),
            body,
        }
    }
}

pub type Result<T> = std::result::Result<T, VidSearchError>;
