//! Individuals table access
//!
//! One row per tracked individual, keyed by RFID. The upsert replaces all
//! tracked fields in a single statement, so concurrent samples for the same
//! rfid retain row-level atomicity.

use chrono::{DateTime, Utc};
use moltwatch_common::db::models::{HealthStatus, Individual, Sex};
use moltwatch_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// Fields written on every accepted sample
#[derive(Debug, Clone)]
pub struct IndividualUpdate {
    pub rfid: String,
    pub weight_kg: f64,
    pub detection_time: DateTime<Utc>,
    pub stage_name: String,
    pub daily_change: f64,
    pub health: HealthStatus,
    pub sex: Option<Sex>,
    pub notes: String,
}

/// Roster entry with its detection count
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IndividualSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub individual: Individual,
    pub detection_count: i64,
}

/// Insert or fully replace the tracked fields of an individual.
///
/// `first_seen` is set on insert and preserved on update; a NULL incoming
/// sex never clears a previously recorded one.
pub async fn upsert_individual(pool: &SqlitePool, update: &IndividualUpdate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO individuals (
            rfid, last_weight, last_detection_time, stage_name, daily_change,
            health, sex, notes, first_seen)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(rfid) DO UPDATE SET
            last_weight = excluded.last_weight,
            last_detection_time = excluded.last_detection_time,
            stage_name = excluded.stage_name,
            daily_change = excluded.daily_change,
            health = excluded.health,
            sex = COALESCE(excluded.sex, individuals.sex),
            notes = excluded.notes
        "#,
    )
    .bind(&update.rfid)
    .bind(update.weight_kg)
    .bind(update.detection_time)
    .bind(&update.stage_name)
    .bind(update.daily_change)
    .bind(update.health)
    .bind(update.sex)
    .bind(&update.notes)
    .bind(update.detection_time)
    .execute(pool)
    .await?;

    Ok(())
}

/// Manual profile edit: updates weight/sex/notes only, registering the
/// individual with neutral classification fields if it does not exist yet.
pub async fn update_profile(
    pool: &SqlitePool,
    rfid: &str,
    weight_kg: f64,
    sex: Option<Sex>,
    notes: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO individuals (
            rfid, last_weight, last_detection_time, stage_name, daily_change,
            health, sex, notes, first_seen)
        VALUES (?, ?, ?, 'Non-molting', 0.0, 'Healthy', ?, ?, ?)
        ON CONFLICT(rfid) DO UPDATE SET
            last_weight = excluded.last_weight,
            sex = COALESCE(excluded.sex, individuals.sex),
            notes = excluded.notes
        "#,
    )
    .bind(rfid)
    .bind(weight_kg)
    .bind(Utc::now())
    .bind(sex)
    .bind(notes)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Last recorded weight for an rfid, if the individual is known
pub async fn get_previous_weight(pool: &SqlitePool, rfid: &str) -> Result<Option<f64>> {
    let weight: Option<f64> =
        sqlx::query_scalar("SELECT last_weight FROM individuals WHERE rfid = ?")
            .bind(rfid)
            .fetch_optional(pool)
            .await?;
    Ok(weight)
}

pub async fn get_individual(pool: &SqlitePool, rfid: &str) -> Result<Option<Individual>> {
    let individual = sqlx::query_as::<_, Individual>(
        "SELECT rfid, last_weight, last_detection_time, stage_name, daily_change, \
         health, sex, notes, first_seen FROM individuals WHERE rfid = ?",
    )
    .bind(rfid)
    .fetch_optional(pool)
    .await?;
    Ok(individual)
}

/// Full roster, most recently seen first, with per-individual detection counts
pub async fn list_individuals(pool: &SqlitePool) -> Result<Vec<IndividualSummary>> {
    let rows = sqlx::query_as::<_, IndividualSummary>(
        r#"
        SELECT i.*,
               (SELECT COUNT(*) FROM detections d WHERE d.rfid = i.rfid) AS detection_count
        FROM individuals i
        ORDER BY i.last_detection_time DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
