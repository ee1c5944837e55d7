//! Detections table access
//!
//! Append-only: rows are inserted once and never mutated.

use moltwatch_common::db::models::{DetectionRecord, NewDetection};
use moltwatch_common::Result;
use sqlx::SqlitePool;

/// Append one detection record; returns the assigned row id
pub async fn append_detection(pool: &SqlitePool, detection: &NewDetection) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO detections (
            rfid, detection_time, species_flag, molt_probability, confidence,
            weight_kg, stage_name, daily_change, health, source_kind, image_ref, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&detection.rfid)
    .bind(detection.detection_time)
    .bind(detection.species_flag)
    .bind(detection.molt_probability)
    .bind(detection.confidence)
    .bind(detection.weight_kg)
    .bind(&detection.stage_name)
    .bind(detection.daily_change)
    .bind(detection.health)
    .bind(detection.source_kind)
    .bind(&detection.image_ref)
    .bind(&detection.notes)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

const SELECT_COLUMNS: &str = "id, rfid, detection_time, species_flag, molt_probability, \
     confidence, weight_kg, stage_name, daily_change, health, source_kind, image_ref, notes";

/// Most recent detections across all individuals, newest first
pub async fn recent_detections(pool: &SqlitePool, limit: i64) -> Result<Vec<DetectionRecord>> {
    let rows = sqlx::query_as::<_, DetectionRecord>(&format!(
        "SELECT {SELECT_COLUMNS} FROM detections ORDER BY detection_time DESC, id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All detections for one individual, newest first
pub async fn detections_for_rfid(pool: &SqlitePool, rfid: &str) -> Result<Vec<DetectionRecord>> {
    let rows = sqlx::query_as::<_, DetectionRecord>(&format!(
        "SELECT {SELECT_COLUMNS} FROM detections WHERE rfid = ? ORDER BY detection_time DESC, id DESC"
    ))
    .bind(rfid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All detections for export, optionally filtered by rfid, newest first
pub async fn export_rows(pool: &SqlitePool, rfid: Option<&str>) -> Result<Vec<DetectionRecord>> {
    let rows = match rfid {
        Some(rfid) => detections_for_rfid(pool, rfid).await?,
        None => {
            sqlx::query_as::<_, DetectionRecord>(&format!(
                "SELECT {SELECT_COLUMNS} FROM detections ORDER BY detection_time DESC, id DESC"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}
