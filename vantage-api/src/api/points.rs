//! Point submission and viewport point queries

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vantage_common::types::{
    BoundingBox, PointsResponse, SubmitPointRequest, SubmitPointResponse,
};

use crate::db::points;
use crate::error::ApiResult;
use crate::services::pipeline::Submission;
use crate::AppState;

/// Default and maximum number of points returned per viewport query
pub const MAX_POINTS: i64 = 2000;

/// POST /point
///
/// Rate and store one street address. Returns 201 with the new point, or
/// 200 with `message: "Point already exists"` and the existing point when
/// the address resolves to an already-rated place.
pub async fn submit_point(
    State(state): State<AppState>,
    Json(request): Json<SubmitPointRequest>,
) -> ApiResult<(StatusCode, Json<SubmitPointResponse>)> {
    match state.pipeline.submit(request).await? {
        Submission::Created(point) => Ok((
            StatusCode::CREATED,
            Json(SubmitPointResponse {
                message: None,
                point,
            }),
        )),
        Submission::Duplicate(point) => Ok((
            StatusCode::OK,
            Json(SubmitPointResponse {
                message: Some("Point already exists".to_string()),
                point,
            }),
        )),
    }
}

/// Query parameters for GET /points
#[derive(Debug, Deserialize)]
pub struct PointsQuery {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,

    /// Maximum number of points to return (capped at 2000)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    MAX_POINTS
}

/// GET /points?south=..&west=..&north=..&east=..
///
/// Individual rated points inside the viewport, newest first. Served at
/// high zoom where aggregate cells would be coarser than the points
/// themselves.
pub async fn get_points(
    State(state): State<AppState>,
    Query(query): Query<PointsQuery>,
) -> ApiResult<Json<PointsResponse>> {
    let bbox = BoundingBox::new(query.south, query.west, query.north, query.east)?;
    let limit = query.limit.clamp(1, MAX_POINTS);

    let points = points::points_in_bbox(&state.db, &bbox, limit).await?;
    let records: Vec<_> = points.iter().map(|p| p.to_record()).collect();

    Ok(Json(PointsResponse {
        total: records.len() as i64,
        points: records,
    }))
}

/// Build point routes
pub fn point_routes() -> Router<AppState> {
    Router::new()
        .route("/point", post(submit_point))
        .route("/points", get(get_points))
}
