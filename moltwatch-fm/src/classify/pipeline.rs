//! Classification pipeline
//!
//! Orchestrates the species gate, molt scoring, stage assignment, and health
//! evaluation into one verdict per sample. Stage-classifier failures fall
//! back to deterministic staging; species/molt failures degrade the verdict
//! to recorded defaults instead of failing the request.

use super::{evaluate_health, MoltClassifier, Sample, SpeciesDetector, StageClassifier};
use moltwatch_common::db::models::{HealthStatus, StatusColor};
use std::sync::Arc;
use tracing::warn;

/// Molt probability at which the stage model is consulted
const STAGING_THRESHOLD: f64 = 0.5;

/// Fallback boundary between early and late staging
const LATE_MOLT_THRESHOLD: f64 = 0.7;

/// Derived classification fields for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub species_flag: bool,
    pub molting: bool,
    pub molt_probability: f64,
    pub confidence: f64,
    pub stage_name: String,
    /// None when the individual has no previous weight on record
    pub daily_change: Option<f64>,
    pub health: HealthStatus,
    pub status_color: StatusColor,
    pub notes: String,
}

/// Chains the capability classifiers into a single verdict
pub struct ClassificationPipeline {
    species: Arc<dyn SpeciesDetector>,
    molt: Arc<dyn MoltClassifier>,
    stage: Arc<dyn StageClassifier>,
}

impl ClassificationPipeline {
    pub fn new(
        species: Arc<dyn SpeciesDetector>,
        molt: Arc<dyn MoltClassifier>,
        stage: Arc<dyn StageClassifier>,
    ) -> Self {
        Self {
            species,
            molt,
            stage,
        }
    }

    /// Classify one sample.
    ///
    /// `previous_weight` is the individual's last recorded weight, if any.
    /// Never fails: classifier errors produce degraded verdicts that are
    /// still persisted and published.
    pub async fn classify(&self, sample: &Sample, previous_weight: Option<f64>) -> Verdict {
        // Species gate
        let species = match self.species.detect(&sample.image).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(rfid = %sample.rfid, "species detection failed: {}", e);
                return Verdict::degraded(false, format!("Species detection failed: {e}"));
            }
        };

        if !species.is_target {
            return Verdict {
                species_flag: false,
                molting: false,
                molt_probability: 0.0,
                confidence: 0.0,
                stage_name: "Not a Species".to_string(),
                daily_change: None,
                health: HealthStatus::Danger,
                status_color: StatusColor::Red,
                notes: species.notes,
            };
        }

        // Molt scoring
        let scores = match self.molt.score(&sample.image).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(rfid = %sample.rfid, "molt scoring failed: {}", e);
                return Verdict::degraded(true, format!("{} | Molt scoring failed: {e}", species.notes));
            }
        };

        let molting = scores.molt_probability > scores.normal_probability;
        let confidence = scores.molt_probability.max(scores.normal_probability);
        let daily_change =
            previous_weight.map(|prev| round_hundredths(sample.weight_kg - prev));

        // Stage assignment
        let (stage_name, health, notes) = if scores.molt_probability >= STAGING_THRESHOLD {
            match self
                .stage
                .classify_stage(sample.weight_kg, sample.sex, sample.captured_at)
                .await
            {
                Ok(stage) => {
                    let notes = format!(
                        "{} | Stage confidence: {:.2}",
                        species.notes, stage.confidence
                    );
                    (stage.stage_name, HealthStatus::Molting, notes)
                }
                Err(e) => {
                    warn!(rfid = %sample.rfid, "stage classification failed, using fallback staging: {}", e);
                    let stage = if scores.molt_probability < LATE_MOLT_THRESHOLD {
                        "Early-molt"
                    } else {
                        "Late-molt"
                    };
                    let notes = format!("{} | Fallback staging used", species.notes);
                    (stage.to_string(), HealthStatus::Molting, notes)
                }
            }
        } else {
            let health = evaluate_health(sample.weight_kg, scores.molt_probability, daily_change);
            ("Non-molting".to_string(), health, species.notes)
        };

        Verdict {
            species_flag: true,
            molting,
            molt_probability: scores.molt_probability,
            confidence,
            stage_name,
            daily_change,
            health,
            status_color: color_for(health),
            notes,
        }
    }
}

impl Verdict {
    /// Verdict recorded when a non-recoverable classifier failed: the sample
    /// completes with default fields rather than aborting the request.
    fn degraded(species_flag: bool, notes: String) -> Self {
        Verdict {
            species_flag,
            molting: false,
            molt_probability: 0.0,
            confidence: 0.0,
            stage_name: "Unknown".to_string(),
            daily_change: None,
            health: HealthStatus::Unknown,
            status_color: StatusColor::Black,
            notes,
        }
    }
}

/// Map a health verdict to its UI status color
fn color_for(health: HealthStatus) -> StatusColor {
    match health {
        HealthStatus::Molting => StatusColor::Orange,
        HealthStatus::Underweight | HealthStatus::RapidWeightLoss | HealthStatus::Danger => {
            StatusColor::Red
        }
        HealthStatus::Unknown => StatusColor::Black,
        HealthStatus::Healthy => StatusColor::Green,
    }
}

/// Round to two decimal places (weight deltas are reported in hundredths)
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
