//! Azure Blob Storage container addressed through a SAS URL.

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::{HttpConfig, ensure_success};
use crate::{
    config::StorageConfig,
    error::{Result, VidSearchError},
    traits::BlobStore,
    types::BlobItem,
};

const SERVICE: &str = "Blob Storage";

#[derive(Debug, Default, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: BlobList,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
struct BlobEntry {
    #[serde(rename = "Name")]
    name: String,
}

/// One listing page plus the continuation marker, if any.
fn parse_listing(xml: &str) -> Result<(Vec<BlobItem>, Option<String>)> {
    let results: EnumerationResults = quick_xml::de::from_str(xml)?;
    let blobs = results
        .blobs
        .blob
        .into_iter()
        .map(|b| BlobItem { name: b.name })
        .collect();
    let marker = results.next_marker.filter(|m| !m.trim().is_empty());
    Ok((blobs, marker))
}

pub struct AzureBlobContainer {
    client: Client,
    /// Account endpoint carrying the SAS query string.
    account_url: Url,
    container_name: String,
}

impl AzureBlobContainer {
    pub fn new(config: &StorageConfig, http: HttpConfig) -> Result<Self> {
        let account_url = Url::parse(&config.sas_url)
            .map_err(|e| VidSearchError::InvalidUrl(format!("storage SAS URL: {e}")))?;
        if account_url.cannot_be_a_base() {
            return Err(VidSearchError::InvalidUrl(
                "storage SAS URL must be an http(s) URL".to_string(),
            ));
        }
        Ok(Self {
            client: http.build_client()?,
            account_url,
            container_name: config.container_name.clone(),
        })
    }

    /// `{account}/{container}/{path...}` keeping the SAS query.
    fn url_for(&self, path: &[&str]) -> Result<Url> {
        let mut url = self.account_url.clone();
        url.path_segments_mut()
            .map_err(|_| VidSearchError::InvalidUrl(self.account_url.to_string()))?
            .clear()
            .push(&self.container_name)
            .extend(path);
        Ok(url)
    }
}

impl BlobStore for AzureBlobContainer {
    async fn list_blobs(&self) -> Result<Vec<BlobItem>> {
        let mut blobs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = self.url_for(&[])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("restype", "container").append_pair("comp", "list");
                if let Some(marker) = &marker {
                    query.append_pair("marker", marker);
                }
            }

            let response = self.client.get(url).send().await?;
            let body = ensure_success(SERVICE, response).await?.text().await?;
            let (page, next) = parse_listing(&body)?;
            blobs.extend(page);

            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        debug!(container = %self.container_name, blobs = blobs.len(), "listed blobs");
        Ok(blobs)
    }

    fn blob_url(&self, name: &str) -> Result<String> {
        let segments: Vec<&str> = name.split('/').collect();
        Ok(self.url_for(&segments)?.to_string())
    }

    async fn upload_blob(&self, name: &str, data: Vec<u8>, overwrite: bool) -> Result<()> {
        let url = self.blob_url(name)?;
        let mut request = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(data);
        if !overwrite {
            request = request.header("If-None-Match", "*");
        }
        ensure_success(SERVICE, request.send().await?).await?;
        debug!(container = %self.container_name, blob = %name, "uploaded blob");
        Ok(())
    }
}
