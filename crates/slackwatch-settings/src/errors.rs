//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The config file does not exist.
    #[error(
        "config file not found at {}; create it with your Slack tokens and ntfy topic",
        .path.display()
    )]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Failed to read the config file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the config file.
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A required field is missing or empty.
    #[error("{0} is required in config")]
    MissingField(&'static str),
    /// A settings value was invalid.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
