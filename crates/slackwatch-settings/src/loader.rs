//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. Deep-merge `~/.slack-monitor/config.json` (or an explicit path) over defaults
//! 3. Apply `SLACKWATCH_*` environment variable overrides (highest priority)
//! 4. [`Settings::validate`]
//!
//! Unlike most settings files the config file is mandatory: it carries the
//! credentials, which have no usable default.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{LogFormat, Settings, SettingsNotice};

/// `~/.slack-monitor`, the home of config and state.
pub fn monitor_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".slack-monitor")
}

/// Default config file path.
pub fn config_path() -> PathBuf {
    monitor_dir().join("config.json")
}

/// Default watermark state path.
pub fn default_state_path() -> PathBuf {
    monitor_dir().join("state.json")
}

/// Validated settings plus everything the loader adjusted on the way.
#[derive(Clone, Debug)]
pub struct LoadedSettings {
    /// Final settings.
    pub settings: Settings,
    /// Values that were normalised or ignored, in the order they were found.
    pub notices: Vec<SettingsNotice>,
}

/// Load, merge, override and validate settings from `path`.
pub fn load_settings_from_path(path: &Path) -> Result<LoadedSettings> {
    load_with_overrides(path, |key| std::env::var(key).ok())
}

/// Same as [`load_settings_from_path`] with an injectable env lookup.
pub fn load_with_overrides(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<LoadedSettings> {
    if !path.exists() {
        return Err(SettingsError::NotFound {
            path: path.to_path_buf(),
        });
    }

    debug!(?path, "loading settings from file");
    let defaults = serde_json::to_value(Settings::default())?;
    let content = std::fs::read_to_string(path)?;
    let user: Value = serde_json::from_str(&content)?;
    let merged = deep_merge(defaults, user);

    let mut settings: Settings = serde_json::from_value(merged)?;
    let mut notices = apply_overrides(&mut settings, lookup);
    notices.extend(settings.validate()?);
    Ok(LoadedSettings { settings, notices })
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SLACKWATCH_*` overrides. Invalid values are skipped (file/default
/// wins) and returned as notices.
fn apply_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<SettingsNotice> {
    let string = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let mut notices = Vec::new();

    if let Some(v) = string("SLACKWATCH_XOXC_TOKEN") {
        settings.slack.xoxc_token = v;
    }
    if let Some(v) = string("SLACKWATCH_XOXD_TOKEN") {
        settings.slack.xoxd_token = v;
    }
    if let Some(v) = string("SLACKWATCH_NTFY_TOPIC") {
        settings.notifications.ntfy_topic = v;
    }
    if let Some(v) = string("SLACKWATCH_NTFY_SERVER") {
        settings.notifications.ntfy_server = v;
    }
    if let Some(v) = string("SLACKWATCH_POLL_INTERVAL_SECS") {
        match parse_u64_range(&v, 1, 86_400) {
            Some(n) => settings.slack.poll_interval_seconds = n,
            None => notices.push(SettingsNotice::InvalidEnv {
                key: "SLACKWATCH_POLL_INTERVAL_SECS",
                value: v,
            }),
        }
    }
    if let Some(v) = string("SLACKWATCH_LOG_FORMAT") {
        match v.parse::<LogFormat>() {
            Ok(format) => settings.logging.format = format,
            Err(_) => notices.push(SettingsNotice::InvalidEnv {
                key: "SLACKWATCH_LOG_FORMAT",
                value: v,
            }),
        }
    }
    notices
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
