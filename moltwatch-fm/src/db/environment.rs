//! Environment readings table access
//!
//! Ambient sensor log, appended independently of individuals.

use chrono::{DateTime, Utc};
use moltwatch_common::db::models::EnvironmentSample;
use moltwatch_common::Result;
use sqlx::SqlitePool;

/// Append one ambient reading
pub async fn append_environment(
    pool: &SqlitePool,
    recorded_at: DateTime<Utc>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    light_level: Option<f64>,
    pressure: Option<f64>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO environment_readings (recorded_at, temperature, humidity, light_level, pressure)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(recorded_at)
    .bind(temperature)
    .bind(humidity)
    .bind(light_level)
    .bind(pressure)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent readings, newest first
pub async fn recent_environment(pool: &SqlitePool, limit: i64) -> Result<Vec<EnvironmentSample>> {
    let rows = sqlx::query_as::<_, EnvironmentSample>(
        "SELECT id, recorded_at, temperature, humidity, light_level, pressure \
         FROM environment_readings ORDER BY recorded_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Latest single reading, if any
pub async fn latest_environment(pool: &SqlitePool) -> Result<Option<EnvironmentSample>> {
    let row = recent_environment(pool, 1).await?.into_iter().next();
    Ok(row)
}
