//! Stridelog API Server
//!
//! Run with: cargo run --bin stridelog-api [-- --config path/to/config.toml]
//!
//! # Configuration
//!
//! Read from `--config`, or the default locations, then overridden by
//! environment variables:
//! - `STRIDELOG_HOST` / `STRIDELOG_PORT`: Bind address (default: 0.0.0.0:8000)
//! - `STRIDELOG_DATABASE`: SQLite file
//! - `STRIDELOG_UPLOADS_DIR`: Uploaded activity files
//! - `STRIDELOG_TIMEZONE`: `local`, `UTC` or an offset like `-05:00`
//! - `STRIDELOG_STRAVA_CLIENT_ID` / `STRIDELOG_STRAVA_CLIENT_SECRET` /
//!   `STRIDELOG_STRAVA_REDIRECT_URI`: Strava OAuth app
//! - `RUST_LOG`: Log filter (overrides `[logging] level`)

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stridelog::api::{serve, AppState};
use stridelog::config::Config;
use stridelog::storage::Store;

#[derive(Parser)]
#[command(name = "stridelog-api")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stridelog REST backend")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    config.logging.init();

    tracing::info!("Starting Stridelog API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {:?}", config.storage.database);
    tracing::info!("Uploads: {:?}", config.storage.uploads_dir);

    std::fs::create_dir_all(&config.storage.uploads_dir)
        .with_context(|| format!("Cannot create uploads dir {:?}", config.storage.uploads_dir))?;

    let store = Arc::new(Store::open(&config.storage.database).context("Failed to open run store")?);
    tracing::info!("Store ready: {}", store.stats()?);

    if config.strava.is_configured() {
        tracing::info!("Strava integration configured");
    } else {
        tracing::info!("Strava integration disabled (set STRIDELOG_STRAVA_CLIENT_ID to enable)");
    }

    let server = config.server.clone();
    serve(AppState::new(store, config), &server).await?;

    tracing::info!("Stridelog API server stopped");
    Ok(())
}
