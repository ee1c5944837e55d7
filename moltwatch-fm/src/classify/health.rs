//! Health evaluation rules
//!
//! Pure rule chain over weight, molt probability, and day-over-day weight
//! change. First matching rule wins.

use moltwatch_common::db::models::HealthStatus;

/// Weight below this is flagged regardless of any other signal (kg)
const UNDERWEIGHT_THRESHOLD_KG: f64 = 3.0;

/// Day-over-day loss beyond this is flagged (kg)
const RAPID_LOSS_THRESHOLD_KG: f64 = -0.2;

/// Evaluate health for a non-molting sample.
///
/// `daily_change` is None when no previous weight exists for the individual.
pub fn evaluate_health(
    weight_kg: f64,
    molt_probability: f64,
    daily_change: Option<f64>,
) -> HealthStatus {
    if weight_kg < UNDERWEIGHT_THRESHOLD_KG {
        HealthStatus::Underweight
    } else if matches!(daily_change, Some(d) if d < RAPID_LOSS_THRESHOLD_KG) {
        HealthStatus::RapidWeightLoss
    } else if molt_probability > 0.5 {
        // Retained from the source rule set; the pipeline routes only
        // molt_probability < 0.5 samples here, so this arm fires only for
        // direct callers of the evaluator
        HealthStatus::Molting
    } else {
        HealthStatus::Healthy
    }
}
