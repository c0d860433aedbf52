//! gdlo-ob - Level Observer
//!
//! Polls the game server for newly awarded levels, re-scans known levels in
//! windows, and reports rating, coin, ownership, name and song changes.

use anyhow::{Context, Result};
use clap::Parser;
use gdlo_common::config::{prepare_root_folder, resolve_config_path, LoggingConfig, TomlConfig};
use gdlo_common::db;
use gdlo_ob::notify::{Notifier, WebhookSink};
use gdlo_ob::{HttpLevelSource, Observer, ObserverService, ObserverSettings};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for gdlo-ob
#[derive(Parser, Debug)]
#[command(name = "gdlo-ob")]
#[command(about = "Level observer for GDLO")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "GDLO_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "GDLO_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Delete all levels, creators and songs before starting
    #[arg(long)]
    reset: bool,

    /// Run setup, one discovery pass and one update tick, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    init_tracing(&config.logging)?;

    info!("Starting gdlo-ob (Level Observer)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    let root_folder = config.resolve_root_folder(args.root_folder.as_deref());
    let db_path = prepare_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", db_path.display());
    let pool = db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let source = HttpLevelSource::new(config.server.clone())
        .context("Failed to build HTTP client")?;
    info!("Game server: {}", config.server.url);

    let notifier = match &config.notify.webhook_url {
        Some(url) => {
            info!("Digests are also sent to a webhook");
            let sink = WebhookSink::new(url.clone()).context("Failed to build webhook client")?;
            Notifier::with_webhook(sink)
        }
        None => Notifier::log_only(),
    };

    let mut observer = Observer::new(
        Arc::new(source),
        pool,
        ObserverSettings::from_config(&config),
    );

    if args.reset {
        observer.reset().await.context("Reset failed")?;
        info!("Deleted all levels, creators and songs");
    }

    let report = observer.setup().await;
    notifier.publish(&report).await;

    let max_pages = config.discovery.max_pages;
    let report = observer.discover(max_pages).await;
    notifier.publish(&report).await;
    observer.find_start().await;

    if args.once {
        let report = observer.update_tick().await;
        notifier.publish(&report).await;
        info!("Single pass complete");
        return Ok(());
    }

    let handle = ObserverService::new(observer, notifier).start();
    shutdown_signal().await;
    handle.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", logging.level)));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
