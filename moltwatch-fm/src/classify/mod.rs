//! Classification capabilities
//!
//! Each detector wraps a pretrained model behind a narrow, independently
//! mockable interface: one method, typed input, typed result-or-error.
//! Failures are ordinary values, never panics, so the pipeline's fallback
//! and degrade paths are normal branches.

pub mod health;
pub mod molt;
pub mod pipeline;
pub mod species;
pub mod stage;

pub use health::evaluate_health;
pub use molt::HttpMoltClassifier;
pub use pipeline::{ClassificationPipeline, Verdict};
pub use species::HttpSpeciesDetector;
pub use stage::HttpStageClassifier;

use chrono::{DateTime, Utc};
use moltwatch_common::db::models::{Sex, SourceKind};
use thiserror::Error;

/// One normalized inbound sample, constructed per request and discarded
/// after classification.
#[derive(Debug, Clone)]
pub struct Sample {
    pub rfid: String,
    pub weight_kg: f64,
    pub sex: Option<Sex>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light_level: Option<f64>,
    pub pressure: Option<f64>,
    /// Decoded image bytes (already validated as a real picture)
    pub image: Vec<u8>,
    pub source_kind: SourceKind,
    pub captured_at: DateTime<Utc>,
}

/// Species gate result
#[derive(Debug, Clone)]
pub struct SpeciesVerdict {
    /// Whether the image contains the monitored species
    pub is_target: bool,
    /// Human-readable detection summary, carried into record notes
    pub notes: String,
}

/// Molt probability scores, both in [0, 1]
#[derive(Debug, Clone, Copy)]
pub struct MoltScores {
    pub molt_probability: f64,
    pub normal_probability: f64,
}

/// Molt stage result from the tabular stage model
#[derive(Debug, Clone)]
pub struct StageVerdict {
    /// One of "Pre-molt", "Mid-molt", "Post-molt"
    pub stage_name: String,
    pub confidence: f64,
}

/// Classifier failure kinds
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model endpoint not configured or not reachable
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// Request-level failure talking to the model server
    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Model server answered with something we cannot use
    #[error("classifier returned malformed response: {0}")]
    Parse(String),
}

/// Species gate: is the monitored species present in the image?
#[async_trait::async_trait]
pub trait SpeciesDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<SpeciesVerdict, ClassifierError>;
}

/// Vision model scoring molt vs. normal plumage from the image
#[async_trait::async_trait]
pub trait MoltClassifier: Send + Sync {
    async fn score(&self, image: &[u8]) -> Result<MoltScores, ClassifierError>;
}

/// Tabular model assigning a molt stage from weight, sex, and season
#[async_trait::async_trait]
pub trait StageClassifier: Send + Sync {
    async fn classify_stage(
        &self,
        weight_kg: f64,
        sex: Option<Sex>,
        observed_at: DateTime<Utc>,
    ) -> Result<StageVerdict, ClassifierError>;
}
