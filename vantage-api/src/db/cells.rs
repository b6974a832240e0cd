//! Heatmap cell aggregates
//!
//! Each row keeps a running sum/count of beauty scores for one H3 cell.
//! Rows exist at the two aggregate resolutions (7 and 9); both are
//! incremented whenever a point is inserted, inside the same transaction
//! as the point itself, so sum(point_count) per resolution always equals
//! the points row count.

use anyhow::Result;
use h3o::{CellIndex, Resolution};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use vantage_common::hex;
use vantage_common::types::{BoundingBox, CellAggregate};

/// Fold one beauty score into a cell's running aggregate.
///
/// Inserts the row on first sight of the cell, otherwise increments
/// sum and count in place.
pub async fn increment_cell<'e>(
    executor: impl sqlx::SqliteExecutor<'e>,
    cell: CellIndex,
    beauty: f64,
) -> Result<()> {
    let (lat, lng) = hex::cell_center(cell);
    let resolution = u8::from(cell.resolution());

    sqlx::query(
        r#"
        INSERT INTO cells (cell, resolution, lat, lng, score_sum, point_count)
        VALUES (?, ?, ?, ?, ?, 1)
        ON CONFLICT(cell) DO UPDATE SET
            score_sum = score_sum + excluded.score_sum,
            point_count = point_count + 1
        "#,
    )
    .bind(cell.to_string())
    .bind(resolution as i64)
    .bind(lat)
    .bind(lng)
    .bind(beauty)
    .execute(executor)
    .await?;

    Ok(())
}

/// Load aggregate cells at one resolution whose center falls inside the
/// viewport.
///
/// The box is widened by roughly one hex diameter so cells straddling the
/// viewport edge still render.
pub async fn cells_in_bbox(
    pool: &SqlitePool,
    resolution: Resolution,
    bbox: &BoundingBox,
) -> Result<Vec<CellAggregate>> {
    let search = bbox.with_margin(hex::bbox_margin_deg(resolution));

    let rows = sqlx::query(
        r#"
        SELECT cell, resolution, lat, lng, score_sum, point_count
        FROM cells
        WHERE resolution = ? AND lat BETWEEN ? AND ? AND lng BETWEEN ? AND ?
        "#,
    )
    .bind(u8::from(resolution) as i64)
    .bind(search.south)
    .bind(search.north)
    .bind(search.west)
    .bind(search.east)
    .fetch_all(pool)
    .await?;

    let cells = rows
        .iter()
        .map(|row| {
            let count: i64 = row.get("point_count");
            let sum: f64 = row.get("score_sum");
            CellAggregate {
                cell: row.get("cell"),
                resolution: row.get::<i64, _>("resolution") as u8,
                lat: row.get("lat"),
                lng: row.get("lng"),
                count,
                sum,
                avg: sum / count as f64,
            }
        })
        .collect();

    Ok(cells)
}

/// Cell ID to point count at one resolution, for coverage-aware samplers
pub async fn coverage(pool: &SqlitePool, resolution: Resolution) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query("SELECT cell, point_count FROM cells WHERE resolution = ?")
        .bind(u8::from(resolution) as i64)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>("cell"), row.get::<i64, _>("point_count")))
        .collect())
}
