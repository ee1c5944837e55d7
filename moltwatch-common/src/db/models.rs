//! Database models and domain value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health verdict for an individual, derived once per sample.
///
/// `Unknown` is the degraded default used when a classifier failure prevents
/// a full verdict; the sample is still persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum HealthStatus {
    Underweight,
    #[serde(rename = "Rapid Weight Loss")]
    #[sqlx(rename = "Rapid Weight Loss")]
    RapidWeightLoss,
    Molting,
    Healthy,
    Danger,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Underweight => "Underweight",
            HealthStatus::RapidWeightLoss => "Rapid Weight Loss",
            HealthStatus::Molting => "Molting",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Danger => "Danger",
            HealthStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI status color derived from the health verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Orange,
    Red,
    /// Degraded/unknown verdicts
    Black,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Green => "green",
            StatusColor::Orange => "orange",
            StatusColor::Red => "red",
            StatusColor::Black => "black",
        }
    }
}

impl std::fmt::Display for StatusColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded sex of an individual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// How a sample reached the ingest endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SourceKind {
    /// Structured payload with an inline base64 image (field device upload)
    FieldDevice,
    /// Multipart form with a binary image part (manual upload)
    Manual,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::FieldDevice => "field_device",
            SourceKind::Manual => "manual",
        }
    }
}

/// One tracked individual, keyed by its RFID tag.
///
/// Created on the first sample for an rfid and upserted on every subsequent
/// one; never deleted by the service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Individual {
    pub rfid: String,
    pub last_weight: f64,
    pub last_detection_time: DateTime<Utc>,
    pub stage_name: String,
    pub daily_change: f64,
    pub health: HealthStatus,
    pub sex: Option<Sex>,
    pub notes: String,
    pub first_seen: DateTime<Utc>,
}

/// One classified sample, append-only
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DetectionRecord {
    pub id: i64,
    pub rfid: String,
    pub detection_time: DateTime<Utc>,
    pub species_flag: bool,
    pub molt_probability: f64,
    pub confidence: f64,
    pub weight_kg: f64,
    pub stage_name: String,
    pub daily_change: f64,
    pub health: HealthStatus,
    pub source_kind: SourceKind,
    pub image_ref: Option<String>,
    pub notes: String,
}

/// Detection fields before insertion (id is assigned by the database)
#[derive(Debug, Clone)]
pub struct NewDetection {
    pub rfid: String,
    pub detection_time: DateTime<Utc>,
    pub species_flag: bool,
    pub molt_probability: f64,
    pub confidence: f64,
    pub weight_kg: f64,
    pub stage_name: String,
    pub daily_change: f64,
    pub health: HealthStatus,
    pub source_kind: SourceKind,
    pub image_ref: Option<String>,
    pub notes: String,
}

/// One ambient sensor reading, append-only and independent of individuals
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnvironmentSample {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light_level: Option<f64>,
    pub pressure: Option<f64>,
}
