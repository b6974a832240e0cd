//! vantage-api - Street-scene aesthetics heatmap service
//!
//! Accepts address submissions, geocodes them, fetches a street-level
//! image, rates it with a vision model, and serves the results as points
//! or zoom-aggregated hexagonal heatmap cells.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vantage_api::services::aesthetics::GeminiRater;
use vantage_api::services::geocoding::GoogleGeocoder;
use vantage_api::services::pipeline::IngestPipeline;
use vantage_api::services::streetview::StreetViewClient;
use vantage_api::{build_router, AppState};
use vantage_common::config;

/// Default HTTP port for vantage-api
const DEFAULT_PORT: u16 = 5860;

/// Command-line arguments for vantage-api
#[derive(Parser, Debug)]
#[command(name = "vantage-api")]
#[command(about = "Street-scene aesthetics heatmap service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "VANTAGE_API_PORT")]
    port: Option<u16>,

    /// Data directory (database + stored images)
    #[arg(short, long, env = "VANTAGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting vantage-api v{}", env!("CARGO_PKG_VERSION"));

    // Bootstrap configuration: TOML + CLI/env overrides
    let toml_config = config::load_toml_config(args.config.as_deref())?;
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

    let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), &toml_config);
    config::ensure_data_dir(&data_dir)?;
    info!("Data directory: {}", data_dir.display());

    let db_path = config::database_path(&data_dir);
    info!("Database: {}", db_path.display());

    let db_pool = vantage_api::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Provider API keys (database -> env -> TOML)
    let maps_key = vantage_api::config::resolve_google_maps_api_key(&db_pool, &toml_config).await?;
    let gemini_key = vantage_api::config::resolve_gemini_api_key(&db_pool, &toml_config).await?;

    // Provider clients and ingestion pipeline
    let geocoder = Arc::new(
        GoogleGeocoder::new(maps_key.clone()).context("Failed to create geocoding client")?,
    );
    let streetview = Arc::new(
        StreetViewClient::new(maps_key).context("Failed to create street imagery client")?,
    );
    let rater = Arc::new(GeminiRater::new(gemini_key).context("Failed to create rating client")?);

    let pipeline = Arc::new(IngestPipeline::new(
        db_pool.clone(),
        geocoder,
        streetview,
        rater,
        data_dir.clone(),
    ));

    let state = AppState::new(db_pool, pipeline, config::images_dir(&data_dir));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
