//! Dashboard statistics endpoint

use crate::error::ApiResult;
use crate::{db, AppState};
use axum::extract::State;
use axum::Json;
use moltwatch_common::db::models::{DetectionRecord, EnvironmentSample};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_individuals: i64,
    pub healthy_today: i64,
    pub molting: i64,
    pub needs_attention: i64,
    pub danger: i64,
    pub recent_detections: Vec<DetectionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_environment: Option<EnvironmentSample>,
}

/// GET /api/v1/stats - roster counters for the dashboard
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let total_individuals: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM individuals")
        .fetch_one(&state.db)
        .await?;

    let healthy_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM individuals \
         WHERE health = 'Healthy' AND date(last_detection_time) = date('now')",
    )
    .fetch_one(&state.db)
    .await?;

    let molting: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM individuals WHERE health = 'Molting'")
            .fetch_one(&state.db)
            .await?;

    let needs_attention: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM individuals WHERE health IN ('Underweight', 'Rapid Weight Loss')",
    )
    .fetch_one(&state.db)
    .await?;

    let danger: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM individuals WHERE health = 'Danger'")
        .fetch_one(&state.db)
        .await?;

    let recent_detections = db::detections::recent_detections(&state.db, 5).await?;
    let latest_environment = db::environment::latest_environment(&state.db).await?;

    Ok(Json(StatsResponse {
        total_individuals,
        healthy_today,
        molting,
        needs_attention,
        danger,
        recent_detections,
        latest_environment,
    }))
}
