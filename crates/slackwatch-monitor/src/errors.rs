//! Fatal startup errors.

use slackwatch_core::{ChatError, StoreError};

/// Failures that prevent monitoring from starting at all.
///
/// Everything that goes wrong once sweeps are running is logged and absorbed
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Credentials were rejected or could not be checked.
    #[error("authentication failed: {0}")]
    Auth(#[source] ChatError),
    /// Existing watermark state could not be read.
    #[error("failed to load state: {0}")]
    Store(#[source] StoreError),
}
