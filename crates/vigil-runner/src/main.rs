//! # vigil-runner
//!
//! Main entry point for the volume-surge alert system.
//!
//! Loads an optional JSON configuration file and Telegram credentials from the
//! environment, then streams every configured Binance segment until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! vigil-runner --config config.json --log-level info
//! vigil-runner test-notify "hello from vigil"
//! ```

mod heartbeat;
mod supervisor;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use vigil_core::config::{AppConfig, Secrets, load_config};
use vigil_core::rate_limit::RateLimiter;
use vigil_core::ws::WsConnector;
use vigil_rest::binance::BinanceReferenceClient;
use vigil_rest::telegram::TelegramNotifier;

use crate::supervisor::Supervisor;

/// Binance volume-surge alerts to Telegram.
#[derive(Parser)]
#[command(name = "vigil-runner", about = "Binance volume-surge alerts to Telegram")]
struct Cli {
    /// Configuration file path (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message to the configured chat and exit.
    TestNotify {
        /// Message text (Telegram HTML).
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    let _log_guard = vigil_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "vigil-runner");

    // 2. Load configuration and secrets
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let secrets = Secrets::from_env().context("telegram credentials")?;
    info!(
        "vigil-runner starting — segments={:?}, quote={}, large_trades={}",
        config.segments,
        config.quote_suffix,
        config.large_trade.is_some()
    );

    let notifier = TelegramNotifier::new(&config.endpoints.telegram_api, &secrets)?;

    if let Some(Command::TestNotify { text }) = cli.command {
        notifier.try_send(&text).await.context("test notification")?;
        info!("test notification delivered");
        return Ok(());
    }

    // 3. Collaborators
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let reference = BinanceReferenceClient::new(&config.endpoints, limiter)?;

    // 4. Run until Ctrl+C
    let summary = Supervisor::new(config, WsConnector::default(), Arc::new(notifier))
        .with_reference(Arc::new(reference))
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl+C: {e}");
            }
        })
        .await;

    for (segment, exit) in &summary.feeds {
        info!("[{segment}] exit: {exit:?}");
    }
    info!(
        "all feeds stopped — alerts delivered={} failed={} skipped={}, heartbeats={} — goodbye",
        summary.dispatch.delivered, summary.dispatch.failed, summary.dispatch.skipped, summary.heartbeats
    );
    Ok(())
}
