//! Aggregate heatmap cell queries

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use h3o::Resolution;
use serde::Deserialize;
use vantage_common::hex;
use vantage_common::types::{BoundingBox, CellsResponse, CoverageResponse};

use crate::db::cells;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for GET /cells
#[derive(Debug, Deserialize)]
pub struct CellsQuery {
    /// Map zoom level the viewport is rendered at
    pub zoom: u8,
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// GET /cells?zoom=..&south=..&west=..&north=..&east=..
///
/// Aggregate heatmap cells for the viewport at the resolution matching
/// the zoom level. High zoom levels are served by /points instead.
pub async fn get_cells(
    State(state): State<AppState>,
    Query(query): Query<CellsQuery>,
) -> ApiResult<Json<CellsResponse>> {
    let bbox = BoundingBox::new(query.south, query.west, query.north, query.east)?;

    let resolution = hex::resolution_for_zoom(query.zoom).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Zoom {} is served as individual points; use /points",
            query.zoom
        ))
    })?;

    let cells = cells::cells_in_bbox(&state.db, resolution, &bbox).await?;

    Ok(Json(CellsResponse {
        resolution: u8::from(resolution),
        cells,
    }))
}

/// Query parameters for GET /coverage
#[derive(Debug, Deserialize)]
pub struct CoverageQuery {
    /// Aggregate resolution (7 or 9)
    pub resolution: u8,
}

/// GET /coverage?resolution=9
///
/// Point counts per cell at one aggregate resolution. Samplers use this
/// to find under-covered cells without database access.
pub async fn get_coverage(
    State(state): State<AppState>,
    Query(query): Query<CoverageQuery>,
) -> ApiResult<Json<CoverageResponse>> {
    let resolution = match query.resolution {
        7 => Resolution::Seven,
        9 => Resolution::Nine,
        other => {
            return Err(ApiError::BadRequest(format!(
                "Coverage is tracked at resolutions 7 and 9, got {}",
                other
            )))
        }
    };

    let cells = cells::coverage(&state.db, resolution).await?;

    Ok(Json(CoverageResponse {
        resolution: query.resolution,
        cells,
    }))
}

/// Build cell routes
pub fn cell_routes() -> Router<AppState> {
    Router::new()
        .route("/cells", get(get_cells))
        .route("/coverage", get(get_coverage))
}
