//! Outbound chat notifications for reviewable pull requests.
//!
//! One message per pull request, delivered to a fixed Slack channel via
//! `chat.postMessage`. Delivery is best-effort: at-most-once semantics are
//! enforced by the persisted `notified` flag, not by this module.

mod error;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::github::models::ObservedPullRequest;

pub use error::NotifyError;

/// Default Slack API base URL.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com";

/// Message body accompanying every pull request notification.
const NOTIFICATION_TEXT: &str = "A pull request is ready to be reviewed.";

/// Sink that delivers a one-way message about a single pull request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a notification for the pull request.
    async fn send(&self, pull_request: &ObservedPullRequest) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N> Notifier for std::sync::Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn send(&self, pull_request: &ObservedPullRequest) -> Result<(), NotifyError> {
        (**self).send(pull_request).await
    }
}

/// Slack `chat.postMessage` response envelope.
#[derive(Debug, Clone, Deserialize)]
struct ApiPostMessageResponse {
    ok: bool,
    error: Option<String>,
}

/// Slack-backed notifier posting to a fixed channel.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http: reqwest::Client,
    api_base: Url,
    token: String,
    channel: String,
}

impl SlackNotifier {
    /// Creates a notifier for the given bot token and channel.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingToken`] or [`NotifyError::MissingChannel`]
    /// when either value is blank, and [`NotifyError::InvalidApiBase`] when
    /// `api_base` cannot be parsed.
    pub fn new(
        token: impl AsRef<str>,
        channel: impl AsRef<str>,
        api_base: &str,
    ) -> Result<Self, NotifyError> {
        let token_trimmed = token.as_ref().trim();
        if token_trimmed.is_empty() {
            return Err(NotifyError::MissingToken);
        }

        let channel_trimmed = channel.as_ref().trim();
        if channel_trimmed.is_empty() {
            return Err(NotifyError::MissingChannel);
        }

        let parsed_base =
            Url::parse(api_base).map_err(|error| NotifyError::InvalidApiBase(error.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_base: parsed_base,
            token: token_trimmed.to_owned(),
            channel: channel_trimmed.to_owned(),
        })
    }

    fn post_message_url(&self) -> Result<Url, NotifyError> {
        self.api_base
            .join("api/chat.postMessage")
            .map_err(|error| NotifyError::InvalidApiBase(error.to_string()))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, pull_request: &ObservedPullRequest) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "channel": self.channel,
            "text": NOTIFICATION_TEXT,
            "attachments": [{
                "title": pull_request.title,
                "title_link": pull_request.url,
                "author_name": pull_request.creator,
            }],
        });

        let response = self
            .http
            .post(self.post_message_url()?)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|error| NotifyError::Network {
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiPostMessageResponse =
            response
                .json()
                .await
                .map_err(|error| NotifyError::MalformedResponse {
                    message: error.to_string(),
                })?;

        if !body.ok {
            return Err(NotifyError::Rejected {
                reason: body.error.unwrap_or_else(|| "unknown error".to_owned()),
            });
        }

        Ok(())
    }
}
