//! Individual roster endpoints

use crate::db::individuals::IndividualSummary;
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};
use axum::extract::{Path, State};
use axum::Json;
use moltwatch_common::db::models::{DetectionRecord, Individual, Sex};
use serde::{Deserialize, Serialize};
use tracing::info;

/// GET /api/v1/individuals - roster, most recently seen first
pub async fn list_individuals(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<IndividualSummary>>> {
    let rows = db::individuals::list_individuals(&state.db).await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct IndividualDetailResponse {
    pub individual: Individual,
    pub detections: Vec<DetectionRecord>,
}

/// GET /api/v1/individuals/:rfid - profile plus detection history
pub async fn individual_detail(
    State(state): State<AppState>,
    Path(rfid): Path<String>,
) -> ApiResult<Json<IndividualDetailResponse>> {
    let individual = db::individuals::get_individual(&state.db, &rfid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("individual '{rfid}' not found")))?;
    let detections = db::detections::detections_for_rfid(&state.db, &rfid).await?;

    Ok(Json(IndividualDetailResponse {
        individual,
        detections,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    rfid: String,
    weight: Option<f64>,
    sex: Option<Sex>,
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub rfid: String,
}

/// POST /api/v1/individuals - manual profile update/registration
pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    if req.rfid.trim().is_empty() {
        return Err(ApiError::BadRequest("rfid is required".into()));
    }

    db::individuals::update_profile(
        &state.db,
        req.rfid.trim(),
        req.weight.unwrap_or(0.0),
        req.sex,
        req.notes.as_deref().unwrap_or(""),
    )
    .await?;

    info!(rfid = %req.rfid, "individual profile updated");
    Ok(Json(UpdateProfileResponse {
        success: true,
        rfid: req.rfid.trim().to_string(),
    }))
}
