//! Settings types.
//!
//! Keys are `snake_case` to match the existing `~/.slack-monitor/config.json`
//! files. Every section carries `#[serde(default)]` so a partial file merges
//! cleanly over compiled defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default poll interval between the end of one sweep and the start of the next.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Smallest poll interval accepted; lower values are raised to this.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
/// Default minimum gap between two delivered notifications.
pub const DEFAULT_NOTIFY_INTERVAL_SECS: u64 = 2;
/// Default maximum message preview length.
pub const DEFAULT_PREVIEW_LENGTH: usize = 500;
/// Shortest preview that still leaves room for the ellipsis.
pub const MIN_PREVIEW_LENGTH: usize = 4;

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat service credentials and polling.
    pub slack: SlackSettings,
    /// Notification relay.
    pub notifications: NotificationSettings,
    /// Monitoring scope and state location.
    pub monitor: MonitorSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Slack credentials and polling cadence.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    /// Browser session token (`xoxc-...`), sent as the `token` parameter.
    pub xoxc_token: String,
    /// Session cookie value (`xoxd-...`), sent as the `d` cookie.
    pub xoxd_token: String,
    /// Informational workspace id.
    pub workspace_id: String,
    /// Seconds to wait after a sweep finishes before starting the next.
    pub poll_interval_seconds: u64,
    /// Web API base URL.
    pub api_base_url: String,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            xoxc_token: String::new(),
            xoxd_token: String::new(),
            workspace_id: String::new(),
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
            api_base_url: "https://slack.com/api".to_string(),
        }
    }
}

impl fmt::Debug for SlackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackSettings")
            .field("xoxc_token", &redacted(&self.xoxc_token))
            .field("xoxd_token", &redacted(&self.xoxd_token))
            .field("workspace_id", &self.workspace_id)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "[REDACTED]" }
}

/// ntfy relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Topic name on the relay.
    pub ntfy_topic: String,
    /// Relay base URL.
    pub ntfy_server: String,
    /// `Title` header on every notification.
    pub title: String,
    /// `Priority` header on every notification.
    pub priority: String,
    /// Minimum seconds between delivered notifications.
    pub min_interval_seconds: u64,
    /// Maximum characters of message body in a notification.
    pub preview_length: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            ntfy_topic: String::new(),
            ntfy_server: "https://ntfy.sh".to_string(),
            title: "Slack Monitor".to_string(),
            priority: "default".to_string(),
            min_interval_seconds: DEFAULT_NOTIFY_INTERVAL_SECS,
            preview_length: DEFAULT_PREVIEW_LENGTH,
        }
    }
}

/// What to monitor and where to keep state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Direct messages only. The only supported scope.
    pub dms_only: bool,
    /// Watermark file; `~/.slack-monitor/state.json` when unset.
    pub state_path: Option<PathBuf>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            dms_only: true,
            state_path: None,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Log level and format.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// A value the loader changed or ignored while building [`Settings`].
///
/// Loading runs before logging is configured, so these are handed back to
/// the caller to report once a subscriber is installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsNotice {
    /// `poll_interval_seconds` was below the floor.
    PollIntervalRaised {
        /// Value from the file or environment.
        configured: u64,
        /// Value used instead.
        minimum: u64,
    },
    /// `dms_only = false` is not supported.
    DmsOnlyForced,
    /// `preview_length` was too short for the ellipsis.
    PreviewLengthRaised {
        /// Value from the file.
        configured: usize,
        /// Value used instead.
        minimum: usize,
    },
    /// An environment override could not be parsed and was skipped.
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}

impl fmt::Display for SettingsNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PollIntervalRaised {
                configured,
                minimum,
            } => write!(
                f,
                "poll interval {configured}s below minimum, raising to {minimum}s"
            ),
            Self::DmsOnlyForced => write!(
                f,
                "only direct-message monitoring is supported, forcing dms_only = true"
            ),
            Self::PreviewLengthRaised {
                configured,
                minimum,
            } => write!(
                f,
                "preview length {configured} too short, raising to {minimum}"
            ),
            Self::InvalidEnv { key, value } => {
                write!(f, "invalid value '{value}' for {key}, ignoring")
            }
        }
    }
}

impl Settings {
    /// Check required fields and normalise out-of-range values.
    ///
    /// Missing credentials or notification topic are fatal. Everything else
    /// falls back to a usable value and is reported in the returned notices.
    pub fn validate(&mut self) -> Result<Vec<SettingsNotice>> {
        if self.slack.xoxc_token.trim().is_empty() {
            return Err(SettingsError::MissingField("slack.xoxc_token"));
        }
        if self.slack.xoxd_token.trim().is_empty() {
            return Err(SettingsError::MissingField("slack.xoxd_token"));
        }
        if self.notifications.ntfy_topic.trim().is_empty() {
            return Err(SettingsError::MissingField("notifications.ntfy_topic"));
        }

        let mut notices = Vec::new();

        if self.slack.poll_interval_seconds == 0 {
            self.slack.poll_interval_seconds = DEFAULT_POLL_INTERVAL_SECS;
        } else if self.slack.poll_interval_seconds < MIN_POLL_INTERVAL_SECS {
            notices.push(SettingsNotice::PollIntervalRaised {
                configured: self.slack.poll_interval_seconds,
                minimum: MIN_POLL_INTERVAL_SECS,
            });
            self.slack.poll_interval_seconds = MIN_POLL_INTERVAL_SECS;
        }

        if !self.monitor.dms_only {
            notices.push(SettingsNotice::DmsOnlyForced);
            self.monitor.dms_only = true;
        }

        if self.notifications.preview_length < MIN_PREVIEW_LENGTH {
            notices.push(SettingsNotice::PreviewLengthRaised {
                configured: self.notifications.preview_length,
                minimum: MIN_PREVIEW_LENGTH,
            });
            self.notifications.preview_length = MIN_PREVIEW_LENGTH;
        }

        Ok(notices)
    }

    /// Wait between sweeps.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.slack.poll_interval_seconds)
    }

    /// Minimum gap between delivered notifications.
    pub fn notify_interval(&self) -> Duration {
        Duration::from_secs(self.notifications.min_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Settings {
        let mut s = Settings::default();
        s.slack.xoxc_token = "xoxc-1".into();
        s.slack.xoxd_token = "xoxd-1".into();
        s.notifications.ntfy_topic = "my-topic".into();
        s
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.slack.poll_interval_seconds, 60);
        assert_eq!(s.notifications.ntfy_server, "https://ntfy.sh");
        assert_eq!(s.notifications.preview_length, 500);
        assert_eq!(s.notifications.min_interval_seconds, 2);
        assert!(s.monitor.dms_only);
        assert_eq!(s.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn validate_accepts_complete_settings() {
        let mut s = valid();
        assert!(s.validate().unwrap().is_empty());
        assert_eq!(s.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn validate_reports_each_missing_field() {
        let mut s = valid();
        s.slack.xoxc_token.clear();
        assert!(matches!(
            s.validate(),
            Err(SettingsError::MissingField("slack.xoxc_token"))
        ));

        let mut s = valid();
        s.slack.xoxd_token = "   ".into();
        assert!(matches!(
            s.validate(),
            Err(SettingsError::MissingField("slack.xoxd_token"))
        ));

        let mut s = valid();
        s.notifications.ntfy_topic.clear();
        assert!(matches!(
            s.validate(),
            Err(SettingsError::MissingField("notifications.ntfy_topic"))
        ));
    }

    #[test]
    fn zero_interval_uses_default() {
        let mut s = valid();
        s.slack.poll_interval_seconds = 0;
        assert!(s.validate().unwrap().is_empty());
        assert_eq!(s.slack.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn short_interval_raised_to_minimum() {
        let mut s = valid();
        s.slack.poll_interval_seconds = 3;
        let notices = s.validate().unwrap();
        assert_eq!(s.slack.poll_interval_seconds, MIN_POLL_INTERVAL_SECS);
        assert_eq!(
            notices,
            [SettingsNotice::PollIntervalRaised {
                configured: 3,
                minimum: MIN_POLL_INTERVAL_SECS
            }]
        );
    }

    #[test]
    fn dms_only_forced_on() {
        let mut s = valid();
        s.monitor.dms_only = false;
        let notices = s.validate().unwrap();
        assert!(s.monitor.dms_only);
        assert_eq!(notices, [SettingsNotice::DmsOnlyForced]);
    }

    #[test]
    fn tiny_preview_raised() {
        let mut s = valid();
        s.notifications.preview_length = 1;
        let notices = s.validate().unwrap();
        assert_eq!(s.notifications.preview_length, MIN_PREVIEW_LENGTH);
        assert_eq!(
            notices,
            [SettingsNotice::PreviewLengthRaised {
                configured: 1,
                minimum: MIN_PREVIEW_LENGTH
            }]
        );
    }

    #[test]
    fn every_adjustment_is_reported() {
        let mut s = valid();
        s.slack.poll_interval_seconds = 5;
        s.monitor.dms_only = false;
        s.notifications.preview_length = 0;
        let notices = s.validate().unwrap();
        assert_eq!(notices.len(), 3);
        assert!(notices[0].to_string().contains("raising to 10s"));
    }

    #[test]
    fn debug_redacts_tokens() {
        let s = valid();
        let dbg = format!("{:?}", s.slack);
        assert!(!dbg.contains("xoxc-1"));
        assert!(!dbg.contains("xoxd-1"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
