use std::fmt;

use serde::{Deserialize, Serialize, ser::SerializeMap};

use crate::format::parse_timestamp;

/// Opaque handle assigned to a video by the indexing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VideoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A source video resolved to its indexing-service identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub name: String,
    pub id: VideoId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    /// Value expected by the indexing service upload endpoint.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Privacy::Public => "Public",
            Privacy::Private => "Private",
        }
    }
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Privacy::Public),
            "private" => Ok(Privacy::Private),
            other => Err(format!("unknown privacy level '{other}', expected public or private")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
}

/// Entry of the indexing service video listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoSummary {
    pub id: VideoId,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// Lifecycle state reported by the video index endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    Uploaded,
    Processing,
    Processed,
    Failed,
    Quarantined,
    Other(String),
}

impl IndexState {
    pub fn parse(state: &str) -> Self {
        match state {
            "Uploaded" => IndexState::Uploaded,
            "Processing" => IndexState::Processing,
            "Processed" => IndexState::Processed,
            "Failed" => IndexState::Failed,
            "Quarantined" => IndexState::Quarantined,
            other => IndexState::Other(other.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, IndexState::Failed | IndexState::Quarantined)
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Uploaded => f.write_str("Uploaded"),
            IndexState::Processing => f.write_str("Processing"),
            IndexState::Processed => f.write_str("Processed"),
            IndexState::Failed => f.write_str("Failed"),
            IndexState::Quarantined => f.write_str("Quarantined"),
            IndexState::Other(s) => f.write_str(s),
        }
    }
}

/// Indexing-service account metadata, fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDetails {
    pub account_id: String,
    pub account_name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptContentSection {
    pub id: u32,
    pub start: String,
    pub end: String,
    pub content: String,
}

/// Embedding-ready content the indexing service derives for one video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoPromptContent {
    #[serde(default = "unknown_video_id")]
    pub video_id: VideoId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default)]
    pub sections: Vec<PromptContentSection>,
}

fn unknown_video_id() -> VideoId {
    VideoId::new("")
}

impl VideoPromptContent {
    /// Placeholder for a video whose prompt content does not exist yet.
    pub fn missing(video_id: VideoId) -> Self {
        Self {
            video_id,
            name: String::new(),
            partition: None,
            sections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContentCollection {
    pub videos: Vec<VideoPromptContent>,
}

impl PromptContentCollection {
    pub fn new(videos: Vec<VideoPromptContent>) -> Self {
        Self { videos }
    }

    pub fn section_count(&self) -> usize {
        self.videos.iter().map(|v| v.sections.len()).sum()
    }

    /// Identifiers of videos that came back without any sections.
    pub fn empty_videos(&self) -> Vec<VideoId> {
        self.videos
            .iter()
            .filter(|v| v.is_empty())
            .map(|v| v.video_id.clone())
            .collect()
    }
}

/// A chunk of prompt content with its embedding, the unit stored in the vector database.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub account_id: String,
    pub location: String,
    pub video_id: VideoId,
    pub video_name: String,
    pub partition: Option<String>,
    pub section_index: u32,
    pub start_time: String,
    pub end_time: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub content: String,
    /// Document field the embedding is stored under.
    pub embeddings_field: String,
    pub embeddings: Vec<f32>,
}

impl Section {
    /// Section text plus metadata, before its embedding is computed.
    pub fn draft(
        account: &AccountDetails,
        video: &VideoPromptContent,
        section: PromptContentSection,
    ) -> Self {
        Self {
            id: format!("{}_{}", video.video_id, section.id),
            account_id: account.account_id.clone(),
            location: account.location.clone(),
            video_id: video.video_id.clone(),
            video_name: video.name.clone(),
            partition: video.partition.clone(),
            section_index: section.id,
            start_seconds: parse_timestamp(&section.start).unwrap_or(0.0),
            end_seconds: parse_timestamp(&section.end).unwrap_or(0.0),
            start_time: section.start,
            end_time: section.end,
            content: section.content,
            embeddings_field: String::new(),
            embeddings: Vec::new(),
        }
    }

    pub fn with_embeddings(mut self, field: &str, embeddings: Vec<f32>) -> Self {
        self.embeddings_field = field.to_string();
        self.embeddings = embeddings;
        self
    }

    /// Metadata without the content and embedding, as stored beside vectors.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "account_id": self.account_id,
            "location": self.location,
            "video_id": self.video_id,
            "video_name": self.video_name,
            "partition": self.partition.clone().unwrap_or_default(),
            "section_index": self.section_index,
            "start_time": self.start_time,
            "end_time": self.end_time,
            "start_seconds": self.start_seconds,
            "end_seconds": self.end_seconds,
        })
    }
}

impl Serialize for Section {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(13))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("account_id", &self.account_id)?;
        map.serialize_entry("location", &self.location)?;
        map.serialize_entry("video_id", &self.video_id)?;
        map.serialize_entry("video_name", &self.video_name)?;
        map.serialize_entry("partition", &self.partition)?;
        map.serialize_entry("section_index", &self.section_index)?;
        map.serialize_entry("start_time", &self.start_time)?;
        map.serialize_entry("end_time", &self.end_time)?;
        map.serialize_entry("start_seconds", &self.start_seconds)?;
        map.serialize_entry("end_seconds", &self.end_seconds)?;
        map.serialize_entry("content", &self.content)?;
        map.serialize_entry(self.embeddings_field.as_str(), &self.embeddings)?;
        map.end()
    }
}

/// Document listed back from the vector database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    #[serde(default)]
    pub content: String,
}
