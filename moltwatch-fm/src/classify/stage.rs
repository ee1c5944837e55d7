//! Molt stage classifier client
//!
//! The tabular stage model takes weight, sex, and the day of year (the
//! seasonality signal) and returns one of Pre-molt / Mid-molt / Post-molt.
//! Invoked only for samples already scored as molting; the pipeline falls
//! back to deterministic staging when this capability fails.

use super::{ClassifierError, StageClassifier, StageVerdict};
use chrono::{DateTime, Datelike, Utc};
use moltwatch_common::db::models::Sex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stage names the model may return
const KNOWN_STAGES: [&str; 3] = ["Pre-molt", "Mid-molt", "Post-molt"];

#[derive(Serialize)]
struct StageRequest {
    weight_kg: f64,
    sex: Option<Sex>,
    day_of_year: u32,
}

#[derive(Deserialize)]
struct StageResponse {
    stage: String,
    confidence: f64,
}

/// HTTP client for the molt stage model
pub struct HttpStageClassifier {
    http_client: Client,
    base_url: Option<String>,
}

impl HttpStageClassifier {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StageClassifier for HttpStageClassifier {
    async fn classify_stage(
        &self,
        weight_kg: f64,
        sex: Option<Sex>,
        observed_at: DateTime<Utc>,
    ) -> Result<StageVerdict, ClassifierError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ClassifierError::Unavailable("stage model not configured".into()))?;

        let response: StageResponse = self
            .http_client
            .post(format!("{base}/stage"))
            .json(&StageRequest {
                weight_kg,
                sex,
                day_of_year: observed_at.ordinal(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !KNOWN_STAGES.contains(&response.stage.as_str()) {
            return Err(ClassifierError::Parse(format!(
                "unknown stage name '{}'",
                response.stage
            )));
        }

        Ok(StageVerdict {
            stage_name: response.stage,
            confidence: response.confidence.clamp(0.0, 1.0),
        })
    }
}
