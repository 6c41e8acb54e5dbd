use std::{future::Future, time::Duration};

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::Result;

/// Outcome of one prompt-content generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptContentStatus {
    Success,
    /// Generation is still running (HTTP 202).
    InProgress,
    /// Another generation job is already in flight (HTTP 409).
    Conflict,
    Fatal(String),
}

impl PromptContentStatus {
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::ACCEPTED => PromptContentStatus::InProgress,
            StatusCode::CONFLICT => PromptContentStatus::Conflict,
            s if s.is_success() => PromptContentStatus::Success,
            s => PromptContentStatus::Fatal(format!("HTTP {}: {}", s.as_u16(), body.trim())),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PromptContentStatus::InProgress | PromptContentStatus::Conflict
        )
    }
}

/// Fixed-backoff bound on attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { attempts: u32 },
    /// The last attempt came back retryable.
    Exhausted { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts }
            | RetryOutcome::Exhausted { attempts }
            | RetryOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Run `attempt` until it reports success or the policy runs out.
///
/// Waits `policy.backoff` after each retryable status, except after the last attempt.
/// A fatal status or request error uses up an attempt and is retried at once.
/// `attempt` receives the 1-based attempt number.
pub async fn retry_bounded<F, Fut>(policy: &RetryPolicy, mut attempt: F) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PromptContentStatus>>,
{
    let mut attempts = 0;
    let mut last_failure = None;
    while attempts < policy.attempts {
        attempts += 1;
        match attempt(attempts).await {
            Ok(PromptContentStatus::Success) => return RetryOutcome::Succeeded { attempts },
            Ok(PromptContentStatus::Fatal(reason)) => {
                warn!(attempt = attempts, %reason, "prompt content request failed");
                last_failure = Some(reason);
            }
            Err(e) => {
                warn!(attempt = attempts, error = %e, "prompt content request failed");
                last_failure = Some(e.to_string());
            }
            Ok(status) => {
                debug!(?status, attempt = attempts, "retryable status");
                last_failure = None;
                if attempts < policy.attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }
    match last_failure {
        Some(reason) => RetryOutcome::Failed { attempts, reason },
        None => RetryOutcome::Exhausted { attempts },
    }
}
