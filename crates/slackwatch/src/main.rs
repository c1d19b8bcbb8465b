//! # slackwatch
//!
//! Binary: loads settings, wires the Slack source, ntfy relay and state file
//! into the cycle engine, and polls until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use slackwatch_core::{ChatSource, Notifier, WatermarkStore};
use slackwatch_monitor::{CycleEngine, Scheduler};
use slackwatch_notify::{NtfyConfig, NtfyNotifier, Throttled};
use slackwatch_settings::{LoadedSettings, LogFormat, Settings};
use slackwatch_slack::SlackClient;
use slackwatch_store::FileStore;
use slackwatch_telemetry::{TelemetryConfig, init_telemetry};

/// Relay new Slack direct messages to an ntfy topic.
#[derive(Parser, Debug)]
#[command(name = "slackwatch", version, about)]
struct Cli {
    /// Config file (default `~/.slack-monitor/config.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Watermark state file (default `~/.slack-monitor/state.json`).
    #[arg(long)]
    state: Option<PathBuf>,

    /// Run a single check and exit.
    #[arg(long)]
    once: bool,

    /// Log output format: `pretty` or `json`.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(slackwatch_settings::config_path)
    }

    /// `--state`, then the config file, then the default location.
    fn state_path(&self, settings: &Settings) -> PathBuf {
        self.state
            .clone()
            .or_else(|| settings.monitor.state_path.clone())
            .unwrap_or_else(slackwatch_settings::default_state_path)
    }
}

fn build_source(settings: &Settings) -> Result<SlackClient> {
    SlackClient::with_base_url(
        SecretString::from(settings.slack.xoxc_token.clone()),
        SecretString::from(settings.slack.xoxd_token.clone()),
        settings.slack.api_base_url.clone(),
    )
    .context("failed to create Slack client")
}

fn build_notifier(settings: &Settings) -> Result<Throttled<NtfyNotifier>> {
    let n = &settings.notifications;
    let ntfy = NtfyNotifier::new(NtfyConfig {
        server: n.ntfy_server.clone(),
        topic: n.ntfy_topic.clone(),
        title: n.title.clone(),
        priority: n.priority.clone(),
    })
    .context("invalid notification target")?;
    Ok(Throttled::new(ntfy, settings.notify_interval()))
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    info!("shutdown signal received");
    token.cancel();
}

fn load_settings(path: &Path, cli: &Cli) -> Result<LoadedSettings> {
    let mut loaded = slackwatch_settings::load_settings_from_path(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    if let Some(format) = cli.log_format {
        loaded.settings.logging.format = format;
    }
    Ok(loaded)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();
    let LoadedSettings { settings, notices } = load_settings(&config_path, &cli)?;

    init_telemetry(&TelemetryConfig::new(
        &settings.logging.level,
        settings.logging.format == LogFormat::Json,
    ))
    .context("failed to initialise logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "slackwatch starting");
    for notice in &notices {
        warn!(%notice, "config adjusted");
    }
    info!(
        config = %config_path.display(),
        poll_interval_secs = settings.poll_interval().as_secs(),
        dms_only = settings.monitor.dms_only,
        "config loaded"
    );

    let state_path = cli.state_path(&settings);
    let source: Arc<dyn ChatSource> = Arc::new(build_source(&settings)?);
    let notifier: Arc<dyn Notifier> = Arc::new(build_notifier(&settings)?);
    let store: Arc<dyn WatermarkStore> = Arc::new(FileStore::new(&state_path));
    info!(path = %state_path.display(), "using state file");

    let engine = match CycleEngine::bootstrap(source, notifier, store).await {
        Ok(engine) => engine.with_preview_limit(settings.notifications.preview_length),
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e).context("cannot start monitoring");
        }
    };

    let cancel = CancellationToken::new();
    let _ = tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut scheduler = Scheduler::new(engine, settings.poll_interval());
    if cli.once {
        let _ = scheduler.run_once(&cancel).await;
    } else {
        info!("starting monitoring");
        let cycles = scheduler.run(&cancel).await;
        info!(cycles, "monitoring loop ended");
    }

    let engine = scheduler.into_sweeper();
    if let Err(e) = engine.flush() {
        warn!(error = %e, "final state save failed");
    }

    info!("stopped");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use slackwatch_settings::SettingsNotice;

    use super::*;

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "slackwatch",
            "--config",
            "/etc/slackwatch.json",
            "--state",
            "/var/lib/slackwatch/state.json",
            "--once",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config_path(), PathBuf::from("/etc/slackwatch.json"));
        assert!(cli.once);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["slackwatch", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn state_path_precedence() {
        let mut settings = Settings::default();
        settings.monitor.state_path = Some(PathBuf::from("/from/config.json"));

        let flag = Cli::try_parse_from(["slackwatch", "--state", "/from/flag.json"]).unwrap();
        assert_eq!(flag.state_path(&settings), PathBuf::from("/from/flag.json"));

        let bare = Cli::try_parse_from(["slackwatch"]).unwrap();
        assert_eq!(bare.state_path(&settings), PathBuf::from("/from/config.json"));

        settings.monitor.state_path = None;
        assert_eq!(
            bare.state_path(&settings),
            slackwatch_settings::default_state_path()
        );
    }

    #[test]
    fn notifier_uses_configured_target() {
        let mut settings = Settings::default();
        settings.notifications.ntfy_topic = "my-alerts".into();
        settings.notifications.ntfy_server = "https://push.example.com".into();

        let notifier = build_notifier(&settings).unwrap();
        assert_eq!(notifier.inner().url(), "https://push.example.com/my-alerts");
    }

    #[test]
    fn load_keeps_notices_and_applies_log_format_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"slack": {"xoxc_token": "a", "xoxd_token": "b", "poll_interval_seconds": 3},
                "notifications": {"ntfy_topic": "t"}}"#,
        )
        .unwrap();
        let cli = Cli::try_parse_from(["slackwatch", "--log-format", "json"]).unwrap();

        let loaded = load_settings(&path, &cli).unwrap();

        assert_eq!(loaded.settings.logging.format, LogFormat::Json);
        assert_eq!(loaded.settings.slack.poll_interval_seconds, 10);
        assert!(
            loaded
                .notices
                .iter()
                .any(|n| matches!(n, SettingsNotice::PollIntervalRaised { configured: 3, .. }))
        );
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let cli = Cli::try_parse_from(["slackwatch"]).unwrap();
        let err = load_settings(Path::new("/nonexistent/slackwatch/config.json"), &cli).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/slackwatch/config.json"));
    }
}
