//! Sample ingest endpoint
//!
//! Accepts either a structured JSON payload (inline base64 image, as field
//! devices upload) or a multipart form (binary image part, as manual uploads
//! arrive), normalizes both into one sample, runs the classification
//! pipeline, persists the outcome, and publishes the merged snapshot to the
//! live bus. Validation failures return 400 before any state mutation.

use crate::classify::Sample;
use crate::error::{ApiError, ApiResult};
use crate::{db, images, AppState};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::Json;
use chrono::{DateTime, Utc};
use moltwatch_common::db::models::{HealthStatus, NewDetection, Sex, SourceKind, StatusColor};
use moltwatch_common::events::LiveSnapshot;
use moltwatch_common::time;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Structured ingest payload (field device upload)
#[derive(Debug, Deserialize)]
pub struct DetectionRequest {
    rfid: String,
    weight: f64,
    /// Inline image, base64 or data-URI
    #[serde(alias = "image")]
    image_base64: String,
    sex: Option<Sex>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    #[serde(alias = "light")]
    light_level: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub success: bool,
    pub rfid: String,
    pub detection_time: DateTime<Utc>,
    pub image_ref: String,
    pub species_flag: bool,
    pub molting: bool,
    pub confidence: f64,
    pub stage_name: String,
    pub daily_change: f64,
    pub health: HealthStatus,
    pub status_color: StatusColor,
    pub notes: String,
}

/// Fields common to both wire encodings, before validation
struct RawSample {
    rfid: String,
    weight_kg: f64,
    sex: Option<Sex>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    light_level: Option<f64>,
    pressure: Option<f64>,
    image: Vec<u8>,
    source_kind: SourceKind,
}

/// POST /api/v1/detections
pub async fn submit_detection(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<DetectionResponse>> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let raw = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid multipart payload: {e}")))?;
        parse_multipart(multipart).await?
    } else {
        let Json(body) = Json::<DetectionRequest>::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON payload: {e}")))?;
        parse_json(body)?
    };

    // Validation gate: no state is mutated past this point unless the
    // sample is fully acceptable
    if raw.rfid.trim().is_empty() {
        return Err(ApiError::BadRequest("rfid is required".into()));
    }
    if !raw.weight_kg.is_finite() || raw.weight_kg <= 0.0 {
        return Err(ApiError::BadRequest("weight must be a positive number".into()));
    }
    if raw.image.is_empty() {
        return Err(ApiError::BadRequest("image is required".into()));
    }
    images::validate_image(&raw.image)?;

    let captured_at = time::now();
    let sample = Sample {
        rfid: raw.rfid.trim().to_string(),
        weight_kg: raw.weight_kg,
        sex: raw.sex,
        temperature: raw.temperature,
        humidity: raw.humidity,
        light_level: raw.light_level,
        pressure: raw.pressure,
        image: raw.image,
        source_kind: raw.source_kind,
        captured_at,
    };

    // Classify synchronously; the pipeline degrades rather than fails
    let previous_weight = db::individuals::get_previous_weight(&state.db, &sample.rfid).await?;
    let verdict = state.pipeline.classify(&sample, previous_weight).await;

    let image_ref =
        images::store_image(&state.uploads_dir, &sample.rfid, captured_at, &sample.image).await?;

    // Persist before publishing: live viewers only ever observe durably
    // stored verdicts. A storage failure here returns 500 and leaves the
    // live bus untouched.
    let daily_change = verdict.daily_change.unwrap_or(0.0);
    let detection = NewDetection {
        rfid: sample.rfid.clone(),
        detection_time: captured_at,
        species_flag: verdict.species_flag,
        molt_probability: verdict.molt_probability,
        confidence: verdict.confidence,
        weight_kg: sample.weight_kg,
        stage_name: verdict.stage_name.clone(),
        daily_change,
        health: verdict.health,
        source_kind: sample.source_kind,
        image_ref: Some(image_ref.clone()),
        notes: verdict.notes.clone(),
    };
    db::detections::append_detection(&state.db, &detection)
        .await
        .map_err(|e| {
            error!(rfid = %sample.rfid, "failed to append detection: {}", e);
            e
        })?;

    db::individuals::upsert_individual(
        &state.db,
        &db::individuals::IndividualUpdate {
            rfid: sample.rfid.clone(),
            weight_kg: sample.weight_kg,
            detection_time: captured_at,
            stage_name: verdict.stage_name.clone(),
            daily_change,
            health: verdict.health,
            sex: sample.sex,
            notes: verdict.notes.clone(),
        },
    )
    .await
    .map_err(|e| {
        error!(rfid = %sample.rfid, "failed to upsert individual: {}", e);
        e
    })?;

    // Environment reading is an independent append; its failure must not
    // undo an already persisted detection
    if sample.temperature.is_some()
        || sample.humidity.is_some()
        || sample.light_level.is_some()
        || sample.pressure.is_some()
    {
        if let Err(e) = db::environment::append_environment(
            &state.db,
            captured_at,
            sample.temperature,
            sample.humidity,
            sample.light_level,
            sample.pressure,
        )
        .await
        {
            warn!(rfid = %sample.rfid, "failed to append environment reading: {}", e);
        }
    }

    state.bus.publish(LiveSnapshot {
        rfid: sample.rfid.clone(),
        weight_kg: sample.weight_kg,
        sex: sample.sex,
        temperature: sample.temperature,
        humidity: sample.humidity,
        light_level: sample.light_level,
        pressure: sample.pressure,
        image_ref: Some(image_ref.clone()),
        detection_time: captured_at,
        species_flag: verdict.species_flag,
        molting: verdict.molting,
        confidence: verdict.confidence,
        stage_name: verdict.stage_name.clone(),
        daily_change,
        health: verdict.health,
        status_color: verdict.status_color,
        source_kind: sample.source_kind,
        notes: verdict.notes.clone(),
    });

    info!(
        rfid = %sample.rfid,
        health = %verdict.health,
        stage = %verdict.stage_name,
        "detection processed"
    );

    Ok(Json(DetectionResponse {
        success: true,
        rfid: sample.rfid,
        detection_time: captured_at,
        image_ref,
        species_flag: verdict.species_flag,
        molting: verdict.molting,
        confidence: verdict.confidence,
        stage_name: verdict.stage_name,
        daily_change,
        health: verdict.health,
        status_color: verdict.status_color,
        notes: verdict.notes,
    }))
}

fn parse_json(body: DetectionRequest) -> ApiResult<RawSample> {
    let image = images::decode_inline_image(&body.image_base64)?;
    Ok(RawSample {
        rfid: body.rfid,
        weight_kg: body.weight,
        sex: body.sex,
        temperature: body.temperature,
        humidity: body.humidity,
        light_level: body.light_level,
        pressure: body.pressure,
        image,
        source_kind: SourceKind::FieldDevice,
    })
}

async fn parse_multipart(mut multipart: Multipart) -> ApiResult<RawSample> {
    let mut rfid = String::new();
    let mut weight_kg = f64::NAN;
    let mut sex = None;
    let mut temperature = None;
    let mut humidity = None;
    let mut light_level = None;
    let mut pressure = None;
    let mut image = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                image = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable image part: {e}")))?
                    .to_vec();
            }
            "rfid" => rfid = read_text(field).await?,
            "weight" => {
                weight_kg = read_text(field)
                    .await?
                    .parse()
                    .map_err(|_| ApiError::BadRequest("weight must be a number".into()))?;
            }
            "sex" => {
                let value = read_text(field).await?;
                sex = match value.to_lowercase().as_str() {
                    "male" => Some(Sex::Male),
                    "female" => Some(Sex::Female),
                    _ => None,
                };
            }
            "temperature" => temperature = parse_optional_number(field).await?,
            "humidity" => humidity = parse_optional_number(field).await?,
            "light" | "light_level" => light_level = parse_optional_number(field).await?,
            "pressure" => pressure = parse_optional_number(field).await?,
            _ => {}
        }
    }

    Ok(RawSample {
        rfid,
        weight_kg,
        sex,
        temperature,
        humidity,
        light_level,
        pressure,
        image,
        source_kind: SourceKind::Manual,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable form field: {e}")))
}

async fn parse_optional_number(
    field: axum::extract::multipart::Field<'_>,
) -> ApiResult<Option<f64>> {
    let text = read_text(field).await?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    text.trim()
        .parse()
        .map(Some)
        .map_err(|_| ApiError::BadRequest("numeric form field is not a number".into()))
}
