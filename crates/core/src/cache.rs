use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::{error::Result, types::VideoId};

pub const DEFAULT_CACHE_FILE_NAME: &str = "videos_ids_cache.json";

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vidsearch")
}

/// Default location of the video name to identifier cache.
pub fn default_cache_file() -> PathBuf {
    get_root_cache_dir().join(DEFAULT_CACHE_FILE_NAME)
}

/// Video name to indexing-service identifier map persisted between runs.
///
/// Serialized as a flat JSON object `{"<video name>": "<id>"}`. Additions live
/// in memory until [`IdentifierCache::flush`].
#[derive(Debug, Clone)]
pub struct IdentifierCache {
    path: PathBuf,
    entries: BTreeMap<String, VideoId>,
}

impl IdentifierCache {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache file.
    ///
    /// Returns an empty cache when disabled, absent or unreadable as JSON. The
    /// existence checks of the upload stage rebuild the lost entries.
    pub async fn load(path: impl Into<PathBuf>, enabled: bool) -> Result<Self> {
        let path = path.into();
        if !enabled {
            debug!(path = %path.display(), "identifier cache disabled, starting empty");
            return Ok(Self::empty(path));
        }
        let entries = read_entries(&path).await?.unwrap_or_default();
        if !entries.is_empty() {
            info!(path = %path.display(), videos = entries.len(), "loaded identifier cache");
        }
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&VideoId> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace the identifier recorded for `name`.
    pub fn record(&mut self, name: impl Into<String>, id: VideoId) {
        self.entries.insert(name.into(), id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VideoId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), id))
    }

    pub fn ids(&self) -> Vec<VideoId> {
        self.entries.values().cloned().collect()
    }

    /// Write the mapping to the cache file.
    ///
    /// Entries already on disk for other names are kept, so a run that started
    /// from an empty cache never drops earlier runs' identifiers. Written to a
    /// sibling temp file first and renamed into place.
    pub async fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut merged = read_entries(&self.path).await?.unwrap_or_default();
        merged.extend(self.entries.clone());

        let pretty_json = serde_json::to_string_pretty(&merged)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &pretty_json).await?;
        fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), videos = merged.len(), "flushed identifier cache");
        Ok(())
    }
}

/// Entries of the cache file, `None` when it is absent or corrupt.
async fn read_entries(path: &Path) -> Result<Option<BTreeMap<String, VideoId>>> {
    if !fs::try_exists(path).await? {
        debug!(path = %path.display(), "no identifier cache file yet");
        return Ok(None);
    }
    let json_content = fs::read_to_string(path).await?;
    match serde_json::from_str(&json_content) {
        Ok(entries) => Ok(Some(entries)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "identifier cache is corrupt, ignoring it");
            Ok(None)
        }
    }
}
