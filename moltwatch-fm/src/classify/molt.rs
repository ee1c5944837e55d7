//! Molt probability classifier client
//!
//! Sends the sample image to the molt scoring endpoint and returns the
//! molt/normal probability pair, clamped into [0, 1].

use super::{ClassifierError, MoltClassifier, MoltScores};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ScoreRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct ScoreResponse {
    molt_probability: f64,
    normal_probability: f64,
}

/// HTTP client for the molt probability model
pub struct HttpMoltClassifier {
    http_client: Client,
    base_url: Option<String>,
}

impl HttpMoltClassifier {
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
impl MoltClassifier for HttpMoltClassifier {
    async fn score(&self, image: &[u8]) -> Result<MoltScores, ClassifierError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ClassifierError::Unavailable("molt model not configured".into()))?;

        let encoded = BASE64.encode(image);
        let response: ScoreResponse = self
            .http_client
            .post(format!("{base}/molt"))
            .json(&ScoreRequest { image: &encoded })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.molt_probability.is_finite() || !response.normal_probability.is_finite() {
            return Err(ClassifierError::Parse("non-finite probability".into()));
        }

        Ok(MoltScores {
            molt_probability: response.molt_probability.clamp(0.0, 1.0),
            normal_probability: response.normal_probability.clamp(0.0, 1.0),
        })
    }
}
