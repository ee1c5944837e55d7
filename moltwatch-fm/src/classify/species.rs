//! Species detector client
//!
//! Sends the sample image to the open-vocabulary detection endpoint of the
//! model server and gates on whether the monitored species appears among the
//! returned detections.

use super::{ClassifierError, SpeciesDetector, SpeciesVerdict};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Minimum detection confidence for a label to count
const DETECTION_THRESHOLD: f64 = 0.25;

/// Default timeout for model server requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

#[derive(Deserialize)]
struct Detection {
    label: String,
    confidence: f64,
}

/// HTTP client for the species detection model
pub struct HttpSpeciesDetector {
    http_client: Client,
    /// Model server base URL; None means the capability is unavailable
    base_url: Option<String>,
    /// Label the gate tests for (e.g. "penguin")
    target_label: String,
}

impl HttpSpeciesDetector {
    pub fn new(base_url: Option<String>, target_label: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
            target_label: target_label.into(),
        }
    }
}

#[async_trait::async_trait]
impl SpeciesDetector for HttpSpeciesDetector {
    async fn detect(&self, image: &[u8]) -> Result<SpeciesVerdict, ClassifierError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ClassifierError::Unavailable("species model not configured".into()))?;

        let encoded = BASE64.encode(image);
        let response: DetectResponse = self
            .http_client
            .post(format!("{base}/species"))
            .json(&DetectRequest { image: &encoded })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut is_target = false;
        let mut seen = Vec::new();
        for det in &response.detections {
            if det.confidence < DETECTION_THRESHOLD {
                continue;
            }
            if det.label == self.target_label {
                is_target = true;
            }
            seen.push(format!("{} (confidence: {:.2})", det.label, det.confidence));
        }

        let notes = if seen.is_empty() {
            "No animals detected".to_string()
        } else {
            format!("Detected animals: {}", seen.join(", "))
        };
        debug!("species gate: target={} [{}]", is_target, notes);

        Ok(SpeciesVerdict { is_target, notes })
    }
}
