//! # slackwatch-telemetry
//!
//! Installs the global `tracing` subscriber: an [`EnvFilter`] built from the
//! configured level and per-module overrides (replaced wholesale by
//! `RUST_LOG` when set), writing either human-readable or JSON lines to
//! stderr.

#![deny(unsafe_code)]

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by `RUST_LOG`.
    pub log_level: Level,
    /// Per-module level overrides (e.g. `"slackwatch_slack"` => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON objects instead of pretty lines.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: vec![
                // reqwest/hyper connection chatter is never useful at info.
                ("hyper".to_string(), Level::WARN),
                ("reqwest".to_string(), Level::WARN),
            ],
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Build from a level name; unknown names fall back to `info`.
    pub fn new(level: &str, json: bool) -> Self {
        Self {
            log_level: Level::from_str(level).unwrap_or(Level::INFO),
            json,
            ..Self::default()
        }
    }

    /// The filter directive string used when `RUST_LOG` is unset.
    pub fn filter_directive(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter
    }
}

/// Initialize the global subscriber. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
}
