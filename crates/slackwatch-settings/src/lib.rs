//! # slackwatch-settings
//!
//! Configuration for the direct-message monitor.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`Settings::default()`]
//! 2. **Config file**: `~/.slack-monitor/config.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SLACKWATCH_*` overrides (highest priority)
//!
//! The result is validated once: missing credentials or notification topic
//! are fatal, other out-of-range values are normalised.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    LoadedSettings, config_path, deep_merge, default_state_path, load_settings_from_path,
    load_with_overrides, monitor_dir,
};
pub use types::*;
