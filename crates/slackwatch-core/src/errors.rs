//! Typed errors for each external capability.
//!
//! The cycle engine classifies failures by where they come from rather than
//! by what went wrong: an authentication failure at startup ends the process,
//! everything else is absorbed and retried on the next sweep.

/// Errors from the chat source.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ChatError {
    /// Credentials rejected (HTTP 401/403 or `invalid_auth`-style API error).
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Request could not be sent or the connection dropped.
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The API answered `ok: false`.
    #[error("Slack API error in {method}: {error}")]
    Api {
        /// Web API method, e.g. `conversations.history`.
        method: String,
        /// Error code from the response.
        error: String,
    },
    /// Response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ChatError {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            _ => Self::Status { status, body },
        }
    }

    /// Classify an `ok: false` API response.
    pub fn from_api(method: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        match error.as_str() {
            "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked"
            | "token_expired" => Self::Auth(error),
            _ => Self::Api {
                method: method.to_string(),
                error,
            },
        }
    }

    /// Whether the caller's credentials were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Api { .. } => "api",
            Self::Decode(_) => "decode",
        }
    }
}

/// Errors from the notification relay.
#[derive(Clone, Debug, thiserror::Error)]
pub enum NotifyError {
    /// Request could not be sent.
    #[error("failed to send notification: {0}")]
    Network(String),
    /// Relay answered with a non-success status.
    #[error("relay returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Topic or server URL is unusable.
    #[error("invalid notification target: {0}")]
    InvalidTarget(String),
}

/// Errors from watermark persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(String),
    /// State could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
