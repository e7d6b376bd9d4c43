//! Shopfront CLI - command-line client for the Shopfront store API

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::{Commands, Context};
use shopfront_core::{FileStorage, SessionStore};
use shopfront_http::{SessionEvent, ShopClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Level, error, info, warn};

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(about = "Command-line client for the Shopfront store API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the session, config file and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data-dir>/shopfront.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the API, overriding the configuration
    #[arg(long, global = true, env = "SHOPFRONT_API_URL")]
    api_url: Option<String>,

    /// Request timeout in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = config::resolve_data_dir(cli.data_dir);
    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;

    let config_path = cli
        .config
        .unwrap_or_else(|| data_dir.join(config::CONFIG_FILE_NAME));
    let mut cli_config = config::CliConfig::load(Some(&config_path))?;
    if let Some(url) = cli.api_url {
        cli_config.api.base_url = url;
    }
    if let Some(timeout) = cli.timeout {
        cli_config.api.timeout_secs = timeout;
    }
    info!(base_url = %cli_config.api.base_url, "Starting Shopfront CLI");

    let storage = FileStorage::new(data_dir.join(config::SESSION_FILE_NAME));
    let session = SessionStore::load(Arc::new(storage));

    let mut builder = ShopClient::builder()
        .base_url(cli_config.api.base_url.as_str())
        .session(session);
    builder = match cli_config.api.timeout() {
        Some(timeout) => builder.timeout(timeout),
        None => builder.no_timeout(),
    };
    if let Some(agent) = &cli_config.api.user_agent {
        builder = builder.user_agent(agent.as_str());
    }
    let client = builder.build()?;
    let mut events = client.subscribe();

    let ctx = Context {
        client,
        config: cli_config,
        data_dir,
        config_path,
    };

    let result = cli.command.execute(&ctx).await;
    report_expiry(&mut events);

    match result {
        Ok(()) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Tell the user to sign in again if the session expired during the command
fn report_expiry(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Expired { reason }) => {
                warn!(%reason, "Session expired");
                eprintln!("Session expired, please log in again");
            }
            Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
