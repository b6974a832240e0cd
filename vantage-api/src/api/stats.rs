//! Dataset statistics endpoint

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use vantage_common::types::StatsResponse;

use crate::db::points;
use crate::error::ApiResult;
use crate::AppState;

/// GET /stats
///
/// Total point count and mean beauty score across the whole dataset.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let (total_points, avg_beauty) = points::stats(&state.db).await?;

    Ok(Json(StatsResponse {
        total_points,
        avg_beauty,
    }))
}

/// Build stats routes
pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}
