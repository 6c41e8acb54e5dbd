//! Azure Video Indexer REST client.
//!
//! Authentication goes through Azure Resource Manager: the account resource
//! yields the account id and location, and `generateAccessToken` yields the
//! account access token used on every data-plane call. Both are fetched once
//! per client and reused.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{HttpConfig, ensure_success};
use crate::{
    config::AccountConfig,
    error::{Result, VidSearchError},
    retry::PromptContentStatus,
    traits::{UploadRequest, VideoIndexer},
    types::{
        AccountDetails, IndexState, PromptContentCollection, VideoId, VideoPromptContent,
        VideoSummary,
    },
};

const SERVICE: &str = "Video Indexer";
const ARM_SERVICE: &str = "Azure Resource Manager";

/// Delay between two index state checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
struct Session {
    details: AccountDetails,
    access_token: String,
}

#[derive(Deserialize)]
struct ArmAccount {
    location: String,
    properties: ArmAccountProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmAccountProperties {
    account_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoPage {
    #[serde(default)]
    results: Vec<VideoSummary>,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Deserialize)]
struct NextPage {
    #[serde(default = "page_done")]
    done: bool,
}

fn page_done() -> bool {
    true
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct IndexStatus {
    state: String,
}

pub struct VideoIndexerClient {
    client: Client,
    account: AccountConfig,
    arm_token: String,
    poll_interval: Duration,
    session: OnceCell<Session>,
}

impl VideoIndexerClient {
    /// `arm_token` is a bearer token for Azure Resource Manager.
    pub fn new(account: AccountConfig, arm_token: impl Into<String>, http: HttpConfig) -> Result<Self> {
        let arm_token = arm_token.into();
        if arm_token.trim().is_empty() {
            return Err(VidSearchError::InvalidConfig(
                "Azure Resource Manager token must not be empty".to_string(),
            ));
        }
        Ok(Self {
            client: http.build_client()?,
            account,
            arm_token,
            poll_interval: DEFAULT_POLL_INTERVAL,
            session: OnceCell::new(),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn session(&self) -> Result<&Session> {
        self.session.get_or_try_init(|| self.open_session()).await
    }

    async fn open_session(&self) -> Result<Session> {
        let account_url = self.account.arm_account_url();
        debug!(account = %self.account.account_name, "fetching account details");

        let response = self
            .client
            .get(&account_url)
            .query(&[("api-version", self.account.api_version.as_str())])
            .bearer_auth(&self.arm_token)
            .send()
            .await?;
        let account: ArmAccount = ensure_success(ARM_SERVICE, response).await?.json().await?;

        let response = self
            .client
            .post(format!("{account_url}/generateAccessToken"))
            .query(&[("api-version", self.account.api_version.as_str())])
            .bearer_auth(&self.arm_token)
            .json(&json!({ "permissionType": "Contributor", "scope": "Account" }))
            .send()
            .await?;
        let token: AccessTokenResponse = ensure_success(ARM_SERVICE, response).await?.json().await?;

        info!(
            account = %self.account.account_name,
            location = %account.location,
            "acquired account access token"
        );
        Ok(Session {
            details: AccountDetails {
                account_id: account.properties.account_id,
                account_name: self.account.account_name.clone(),
                location: account.location,
            },
            access_token: token.access_token,
        })
    }

    fn account_url(&self, session: &Session) -> String {
        account_base_url(&self.account.api_endpoint, &session.details)
    }

    async fn index_state(&self, video_id: &VideoId) -> Result<IndexState> {
        let session = self.session().await?;
        let response = self
            .client
            .get(format!("{}/Videos/{}/Index", self.account_url(session), video_id))
            .query(&[("accessToken", session.access_token.as_str())])
            .send()
            .await?;
        let status: IndexStatus = ensure_success(SERVICE, response).await?.json().await?;
        Ok(IndexState::parse(&status.state))
    }

    async fn get_prompt_content(&self, video_id: &VideoId) -> Result<VideoPromptContent> {
        let session = self.session().await?;
        let response = self
            .client
            .get(format!(
                "{}/Videos/{}/PromptContent",
                self.account_url(session),
                video_id
            ))
            .query(&[("accessToken", session.access_token.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%video_id, "no prompt content yet");
            return Ok(VideoPromptContent::missing(video_id.clone()));
        }
        let body = ensure_success(SERVICE, response).await?.text().await?;
        parse_prompt_content(video_id, &body)
    }
}

/// Data-plane URL of the account, `{endpoint}/{location}/Accounts/{id}`.
fn account_base_url(api_endpoint: &str, details: &AccountDetails) -> String {
    format!(
        "{}/{}/Accounts/{}",
        api_endpoint, details.location, details.account_id
    )
}

/// The payload does not repeat the video id, so it is filled in here.
fn parse_prompt_content(video_id: &VideoId, body: &str) -> Result<VideoPromptContent> {
    let mut content: VideoPromptContent = serde_json::from_str(body)?;
    content.video_id = video_id.clone();
    Ok(content)
}

impl VideoIndexer for VideoIndexerClient {
    async fn video_exists(&self, name: &str) -> Result<Option<VideoId>> {
        Ok(self
            .list_videos()
            .await?
            .into_iter()
            .find(|v| v.name == name)
            .map(|v| v.id))
    }

    async fn upload_url(&self, request: &UploadRequest<'_>) -> Result<Option<VideoId>> {
        let session = self.session().await?;
        let mut query = vec![
            ("name", request.name.to_string()),
            ("privacy", request.privacy.as_wire().to_string()),
            ("videoUrl", request.video_url.to_string()),
            ("accessToken", session.access_token.clone()),
        ];
        if !request.excluded_ai.is_empty() {
            query.push(("excludedAI", request.excluded_ai.join(",")));
        }

        let response = self
            .client
            .post(format!("{}/Videos", self.account_url(session)))
            .query(&query)
            .send()
            .await?;
        let uploaded: UploadResponse = ensure_success(SERVICE, response).await?.json().await?;
        Ok(uploaded.id.filter(|id| !id.is_empty()).map(VideoId::from))
    }

    async fn wait_for_index(&self, video_id: &VideoId, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self.index_state(video_id).await?;
            match state {
                IndexState::Processed => {
                    info!(%video_id, "video finished indexing");
                    return Ok(());
                }
                s if s.is_failure() => {
                    return Err(VidSearchError::IndexingFailed {
                        video_id: video_id.to_string(),
                        state: s.to_string(),
                    });
                }
                s => debug!(%video_id, state = %s, "video still indexing"),
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(VidSearchError::IndexingTimeout {
                    video_id: video_id.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_video(&self, video_id: &VideoId) -> Result<serde_json::Value> {
        let session = self.session().await?;
        let response = self
            .client
            .get(format!("{}/Videos/{}/Index", self.account_url(session), video_id))
            .query(&[("accessToken", session.access_token.as_str())])
            .send()
            .await?;
        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn generate_prompt_content(&self, video_id: &VideoId) -> Result<PromptContentStatus> {
        let session = self.session().await?;
        let response = self
            .client
            .post(format!(
                "{}/Videos/{}/PromptContent",
                self.account_url(session),
                video_id
            ))
            .query(&[("accessToken", session.access_token.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(PromptContentStatus::from_response(status, &body))
    }

    async fn get_collection_prompt_content(
        &self,
        video_ids: &[VideoId],
    ) -> Result<PromptContentCollection> {
        let mut videos = Vec::with_capacity(video_ids.len());
        for video_id in video_ids {
            videos.push(self.get_prompt_content(video_id).await?);
        }
        Ok(PromptContentCollection::new(videos))
    }

    async fn get_account_details(&self) -> Result<AccountDetails> {
        Ok(self.session().await?.details.clone())
    }

    async fn list_videos(&self) -> Result<Vec<VideoSummary>> {
        let session = self.session().await?;
        let url = format!("{}/Videos", self.account_url(session));
        let mut videos = Vec::new();
        let mut skip = 0u32;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("accessToken", session.access_token.clone()),
                    ("pageSize", LIST_PAGE_SIZE.to_string()),
                    ("skip", skip.to_string()),
                ])
                .send()
                .await?;
            let page: VideoPage = ensure_success(SERVICE, response).await?.json().await?;
            let fetched = page.results.len() as u32;
            videos.extend(page.results);

            let done = page.next_page.is_none_or(|p| p.done);
            if done || fetched == 0 {
                break;
            }
            skip += fetched;
        }

        debug!(videos = videos.len(), "listed videos");
        Ok(videos)
    }
}
