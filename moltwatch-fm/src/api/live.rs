//! Live snapshot read endpoints

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{extract::State, Json};
use moltwatch_common::events::LiveSnapshot;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub snapshots: Vec<LiveSnapshot>,
    pub count: usize,
}

/// GET /api/v1/live/latest - current snapshot, 404 until the first publish
pub async fn latest_snapshot(State(state): State<AppState>) -> ApiResult<Json<LiveSnapshot>> {
    state
        .bus
        .latest()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no live data yet".into()))
}

/// GET /api/v1/live/history - up to the last 20 snapshots, oldest to newest
pub async fn snapshot_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let snapshots = state.bus.history();
    let count = snapshots.len();
    Json(HistoryResponse { snapshots, count })
}
