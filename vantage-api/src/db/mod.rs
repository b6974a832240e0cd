//! Database access for vantage-api
//!
//! One SQLite database holds the rated points, the per-cell running
//! aggregates, and the settings table.

pub mod cells;
pub mod points;
pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS points (
            guid TEXT PRIMARY KEY,
            place_id TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            beauty REAL NOT NULL,
            review TEXT,
            image_path TEXT,
            h3_r7 TEXT NOT NULL,
            h3_r9 TEXT NOT NULL,
            h3_r13 TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_points_lat_lng ON points (lat, lng)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_points_h3_r9 ON points (h3_r9)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cells (
            cell TEXT PRIMARY KEY,
            resolution INTEGER NOT NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            score_sum REAL NOT NULL,
            point_count INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cells_resolution_lat_lng ON cells (resolution, lat, lng)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, points, cells)");

    Ok(())
}
