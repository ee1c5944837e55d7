//! Live feed payload types
//!
//! `LiveSnapshot` is the unit broadcast to every connected viewer: the most
//! recently accepted sample merged with its derived classification fields.

use crate::db::models::{HealthStatus, Sex, SourceKind, StatusColor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The most recently published sample plus its derived classification fields.
///
/// At most one "latest" snapshot exists at a time; the live bus also retains
/// the last 20 published snapshots as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub rfid: String,
    pub weight_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub detection_time: DateTime<Utc>,
    pub species_flag: bool,
    pub molting: bool,
    pub confidence: f64,
    pub stage_name: String,
    pub daily_change: f64,
    pub health: HealthStatus,
    pub status_color: StatusColor,
    pub source_kind: SourceKind,
    pub notes: String,
}
