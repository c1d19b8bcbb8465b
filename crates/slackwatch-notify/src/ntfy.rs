//! ntfy transport.
//!
//! One alert is one `POST {server}/{topic}` with the text as a plain body.
//! The relay renders the `Title` header as the notification heading.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use slackwatch_core::{NotifyError, Notifier};

/// Public ntfy instance.
pub const DEFAULT_NTFY_SERVER: &str = "https://ntfy.sh";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how alerts are published.
#[derive(Clone, Debug)]
pub struct NtfyConfig {
    /// Relay root, e.g. `https://ntfy.sh`.
    pub server: String,
    /// Topic name. Anyone who knows it can subscribe.
    pub topic: String,
    /// `Title` header.
    pub title: String,
    /// `Priority` header (`min`, `low`, `default`, `high`, `urgent`).
    pub priority: String,
}

impl NtfyConfig {
    /// Config for `topic` on the public server with default headers.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            server: DEFAULT_NTFY_SERVER.to_string(),
            topic: topic.into(),
            title: "Slack Monitor".to_string(),
            priority: "default".to_string(),
        }
    }
}

/// Publishes alerts to an ntfy topic.
pub struct NtfyNotifier {
    url: String,
    config: NtfyConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for NtfyNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtfyNotifier")
            .field("server", &self.config.server)
            .finish_non_exhaustive()
    }
}

impl NtfyNotifier {
    /// Validate the target and build the HTTP client.
    pub fn new(config: NtfyConfig) -> Result<Self, NotifyError> {
        let topic = config.topic.trim();
        if topic.is_empty() || topic.contains('/') {
            return Err(NotifyError::InvalidTarget(format!(
                "topic must be a single non-empty path segment, got {topic:?}"
            )));
        }
        let server = config.server.trim().trim_end_matches('/');
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(NotifyError::InvalidTarget(format!(
                "server must be an http(s) URL, got {server:?}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Network(format!("failed to build HTTP client: {e}")))?;

        info!(server, "ntfy notifier initialized");
        Ok(Self {
            url: format!("{server}/{topic}"),
            config,
            http,
        })
    }

    /// Full publish URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .header("Title", &self.config.title)
            .header("Priority", &self.config.priority)
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "ntfy publish failed");
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(chars = text.chars().count(), "notification sent");
        Ok(())
    }
}
