//! Environment readings endpoint

use crate::error::ApiResult;
use crate::{db, AppState};
use axum::extract::{Query, State};
use axum::Json;
use moltwatch_common::db::models::EnvironmentSample;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EnvironmentQuery {
    limit: Option<i64>,
}

/// GET /api/v1/environment - recent ambient readings, newest first
pub async fn recent_readings(
    State(state): State<AppState>,
    Query(query): Query<EnvironmentQuery>,
) -> ApiResult<Json<Vec<EnvironmentSample>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let rows = db::environment::recent_environment(&state.db, limit).await?;
    Ok(Json(rows))
}
