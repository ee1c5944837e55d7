//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; ingest and the read
    // endpoints hit the same file from many tasks
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Migrations (idempotent - safe to call multiple times)
    create_individuals_table(&pool).await?;
    create_detections_table(&pool).await?;
    create_environment_table(&pool).await?;

    Ok(pool)
}

/// Create the individuals table
///
/// One row per tracked individual, keyed by RFID tag. Upserted on every
/// accepted sample; `first_seen` is preserved across upserts.
async fn create_individuals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS individuals (
            rfid TEXT PRIMARY KEY,
            last_weight REAL NOT NULL,
            last_detection_time TIMESTAMP NOT NULL,
            stage_name TEXT NOT NULL DEFAULT 'Unknown',
            daily_change REAL NOT NULL DEFAULT 0.0,
            health TEXT NOT NULL DEFAULT 'Unknown',
            sex TEXT CHECK (sex IS NULL OR sex IN ('male', 'female')),
            notes TEXT NOT NULL DEFAULT '',
            first_seen TIMESTAMP NOT NULL,
            CHECK (last_weight >= 0.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_individuals_last_seen ON individuals(last_detection_time)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the detections table
///
/// Append-only log of classified samples. Rows are never mutated.
async fn create_detections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS detections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rfid TEXT NOT NULL,
            detection_time TIMESTAMP NOT NULL,
            species_flag INTEGER NOT NULL,
            molt_probability REAL NOT NULL,
            confidence REAL NOT NULL,
            weight_kg REAL NOT NULL,
            stage_name TEXT NOT NULL,
            daily_change REAL NOT NULL,
            health TEXT NOT NULL,
            source_kind TEXT NOT NULL CHECK (source_kind IN ('field_device', 'manual')),
            image_ref TEXT,
            notes TEXT NOT NULL DEFAULT '',
            CHECK (molt_probability >= 0.0 AND molt_probability <= 1.0),
            CHECK (confidence >= 0.0 AND confidence <= 1.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_detections_rfid ON detections(rfid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_detections_time ON detections(detection_time)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the environment_readings table
///
/// Append-only ambient sensor log, independent of individuals.
async fn create_environment_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS environment_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at TIMESTAMP NOT NULL,
            temperature REAL,
            humidity REAL,
            light_level REAL,
            pressure REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_environment_recorded_at ON environment_readings(recorded_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
