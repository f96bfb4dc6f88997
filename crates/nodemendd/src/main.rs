//! nodemendd — restart ineligible fleet nodes, at most once per fault window.
//!
//! Runs a single reconciliation cycle and exits; schedule it with cron or
//! a systemd timer. Only one invocation may run at a time per working
//! directory.
//!
//! # Usage
//!
//! ```text
//! nodemendd 203.0.113.7 /srv/fleet
//! nodemendd 203.0.113.7 /srv/fleet --config /etc/nodemend.toml
//! ```
//!
//! The working directory holds the compose descriptors, the node ledger
//! and `nodemend.log`. A `nodemend.toml` found there is used when
//! `--config` is not given.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use nodemend_client::{HttpNodeSource, LogNotifier, Notifier, TelegramNotifier};
use nodemend_core::NodemendConfig;
use nodemend_reconcile::Reconciler;
use nodemend_remediate::TokioProcessRunner;

const LOG_FILE: &str = "nodemend.log";
const CONFIG_FILE: &str = "nodemend.toml";

#[derive(Debug, Parser)]
#[command(
    name = "nodemendd",
    about = "Restart ineligible fleet nodes, once per fault window",
    version
)]
struct Cli {
    /// Search key for the node listing (typically the host IP).
    filter_key: String,

    /// Directory holding compose descriptors, the ledger and the log file.
    working_dir: PathBuf,

    /// Path to nodemend.toml (default: <WORKING_DIR>/nodemend.toml if present).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.working_dir.is_dir() {
        bail!("working directory {} does not exist", cli.working_dir.display());
    }
    init_tracing(&cli.working_dir)?;

    let config = load_config(cli.config.as_deref(), &cli.working_dir)?.with_env_overrides();
    let request_timeout = config.request_timeout()?;
    let phase_timeout = config.phase_timeout()?;

    let source = HttpNodeSource::new(&config.api, request_timeout, config.remediation_table())?;
    let runner = TokioProcessRunner::new(phase_timeout);
    let notifier = build_notifier(&config, request_timeout)?;

    let reconciler = Reconciler::new(
        &config,
        &cli.working_dir,
        Arc::new(source),
        Arc::new(runner),
        notifier,
    );

    info!("=== nodemend run started ===");
    let report = reconciler.run_cycle(&cli.filter_key).await;
    info!(
        fetched = report.fetched,
        candidates = report.candidates.len(),
        remediated = report.remediated_ports().len(),
        notified = report.notified,
        "=== nodemend run finished ==="
    );
    Ok(())
}

/// Log to stdout and append to `<working_dir>/nodemend.log`.
fn init_tracing(working_dir: &Path) -> anyhow::Result<()> {
    let log_path = working_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Explicit path, else `nodemend.toml` in the working dir, else defaults.
fn load_config(explicit: Option<&Path>, working_dir: &Path) -> anyhow::Result<NodemendConfig> {
    if let Some(path) = explicit {
        return NodemendConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    let local = working_dir.join(CONFIG_FILE);
    if local.is_file() {
        return NodemendConfig::from_file(&local)
            .with_context(|| format!("loading config {}", local.display()));
    }
    Ok(NodemendConfig::default())
}

fn build_notifier(
    config: &NodemendConfig,
    timeout: std::time::Duration,
) -> anyhow::Result<Arc<dyn Notifier>> {
    match (&config.notify.telegram_token, &config.notify.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Ok(Arc::new(TelegramNotifier::new(token, chat_id, timeout)?)),
        (None, None) => Ok(Arc::new(LogNotifier)),
        _ => {
            warn!("telegram token and chat id must both be set, alerts will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_takes_two_positionals() {
        let cli = Cli::try_parse_from(["nodemendd", "10.0.0.1", "/srv/fleet"]).unwrap();
        assert_eq!(cli.filter_key, "10.0.0.1");
        assert_eq!(cli.working_dir, PathBuf::from("/srv/fleet"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_rejects_wrong_arity() {
        assert!(Cli::try_parse_from(["nodemendd", "10.0.0.1"]).is_err());
        assert!(Cli::try_parse_from(["nodemendd", "a", "b", "c"]).is_err());
    }

    #[test]
    fn cli_accepts_config_flag() {
        let cli =
            Cli::try_parse_from(["nodemendd", "k", "/w", "--config", "/etc/nodemend.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/nodemend.toml")));
    }

    #[test]
    fn config_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config, NodemendConfig::default());
    }

    #[test]
    fn config_found_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[notify]\ntitle = \"EDGE\"\n").unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config.notify.title, "EDGE");
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(missing.as_path()), dir.path()).is_err());
    }

    #[test]
    fn half_configured_telegram_falls_back_to_log() {
        let mut config = NodemendConfig::default();
        config.notify.telegram_token = Some("t".to_string());
        assert!(build_notifier(&config, std::time::Duration::from_secs(1)).is_ok());
    }
}
