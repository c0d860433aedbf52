//! gdlo-qs (Query Server) - read-only HTTP API over the level database
//!
//! Serves level searches and player/song lookups from the database that
//! gdlo-ob maintains. Never writes.

use anyhow::{Context, Result};
use clap::Parser;
use gdlo_common::config::{resolve_config_path, TomlConfig, DATABASE_FILE};
use gdlo_common::db;
use gdlo_qs::{build_router, AppState};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gdlo-qs")]
#[command(about = "Query server for GDLO")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "GDLO_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "GDLO_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Listen port (overrides `[api] port`)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", config.logging.level))),
        )
        .init();

    info!(
        "Starting gdlo-qs (Query Server) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_path = config
        .resolve_root_folder(args.root_folder.as_deref())
        .join(DATABASE_FILE);
    info!("Database path: {}", db_path.display());

    let pool = match db::connect_readonly(&db_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    let app = build_router(AppState::new(pool));

    let addr = format!("{}:{}", config.api.host, args.port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("gdlo-qs listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down");
        })
        .await?;

    Ok(())
}
