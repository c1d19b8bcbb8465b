//! Minimum-interval rate limiting for any [`Notifier`].

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::info;

use slackwatch_core::{NotifyError, Notifier};

/// Default gap between delivered alerts.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Drops alerts that arrive within `min_interval` of the last successful one.
///
/// Dropped calls are not queued or retried; they log a line and report
/// success. A failed delivery does not start a new interval, so the next
/// alert is attempted immediately.
pub struct Throttled<N: Notifier> {
    inner: N,
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl<N: Notifier> Throttled<N> {
    /// Wrap `inner` with the given minimum interval.
    pub fn new(inner: N, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_sent: Mutex::new(None),
        }
    }

    /// Wrap `inner` with [`DEFAULT_MIN_INTERVAL`].
    pub fn with_defaults(inner: N) -> Self {
        Self::new(inner, DEFAULT_MIN_INTERVAL)
    }

    /// The wrapped notifier.
    pub fn inner(&self) -> &N {
        &self.inner
    }

    fn too_soon(&self, now: Instant) -> bool {
        self.last_sent
            .lock()
            .is_some_and(|last| now.duration_since(last) < self.min_interval)
    }
}

#[async_trait]
impl<N: Notifier> Notifier for Throttled<N> {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        if self.too_soon(Instant::now()) {
            info!(
                min_interval_ms = u64::try_from(self.min_interval.as_millis()).unwrap_or(u64::MAX),
                "rate limiting: skipping notification"
            );
            return Ok(());
        }

        self.inner.notify(text).await?;
        *self.last_sent.lock() = Some(Instant::now());
        Ok(())
    }
}
