//! vantage-api - Street-scene aesthetics heatmap service
//!
//! Accepts address submissions, geocodes them, fetches street-level
//! imagery, rates the scene with a vision model, and serves the results as
//! individual points or zoom-aggregated hexagonal heatmap cells.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use services::pipeline::IngestPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Ingestion pipeline (geocode, imagery, rating, persistence)
    pub pipeline: Arc<IngestPipeline>,
    /// Directory holding stored street images, served under /images
    pub images_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Arc<IngestPipeline>, images_dir: PathBuf) -> Self {
        Self {
            db,
            pipeline,
            images_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let images = ServeDir::new(&state.images_dir);

    Router::new()
        .merge(api::point_routes())
        .merge(api::cell_routes())
        .merge(api::stats_routes())
        .merge(api::health_routes())
        .nest_service("/images", images)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
