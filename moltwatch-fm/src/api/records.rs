//! Detection record read endpoints: recent listing and tabular export

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use moltwatch_common::db::models::DetectionRecord;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    limit: Option<i64>,
}

/// GET /api/v1/detections/recent - latest detections, newest first
pub async fn recent_detections(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<DetectionRecord>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 500);
    let rows = db::detections::recent_detections(&state.db, limit).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    rfid: Option<String>,
    format: Option<String>,
}

/// GET /api/v1/detections/export - all records as CSV or TSV, newest first
pub async fn export_detections(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let (delimiter, content_type, extension) = match query.format.as_deref() {
        None | Some("csv") => (b',', "text/csv", "csv"),
        Some("txt") => (b'\t', "text/plain", "txt"),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "unsupported export format '{other}'"
            )))
        }
    };

    let rows = db::detections::export_rows(&state.db, query.rfid.as_deref()).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound("no detections found".into()));
    }

    let body = render_table(&rows, delimiter)
        .map_err(|e| ApiError::Internal(format!("export failed: {e}")))?;

    let filename = format!(
        "detections_{}.{extension}",
        query.rfid.as_deref().unwrap_or("all")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        body,
    )
        .into_response())
}

fn render_table(rows: &[DetectionRecord], delimiter: u8) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record([
        "id",
        "rfid",
        "detection_time",
        "species",
        "molt_probability",
        "confidence",
        "weight_kg",
        "stage_name",
        "daily_change",
        "health",
        "source_kind",
        "image_ref",
        "notes",
    ])?;

    for row in rows {
        writer.write_record([
            row.id.to_string(),
            row.rfid.clone(),
            row.detection_time.to_rfc3339(),
            if row.species_flag { "Yes" } else { "No" }.to_string(),
            format!("{:.4}", row.molt_probability),
            format!("{:.4}", row.confidence),
            format!("{:.2}", row.weight_kg),
            row.stage_name.clone(),
            format!("{:.2}", row.daily_change),
            row.health.to_string(),
            row.source_kind.as_str().to_string(),
            row.image_ref.clone().unwrap_or_default(),
            row.notes.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
