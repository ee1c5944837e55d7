//! Integration tests for moltwatch-fm API endpoints
//!
//! Drives the real router with mock classifiers and a throwaway database:
//! ingest happy path, validation failures (no mutation), live latest/history,
//! export, roster, environment, and stats.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use moltwatch_common::db::models::Sex;
use moltwatch_fm::classify::{
    ClassificationPipeline, ClassifierError, MoltClassifier, MoltScores, SpeciesDetector,
    SpeciesVerdict, StageClassifier, StageVerdict,
};
use moltwatch_fm::live::LiveBus;
use moltwatch_fm::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

// =============================================================================
// Mock classifiers
// =============================================================================

struct MockSpecies {
    is_target: bool,
}

#[async_trait::async_trait]
impl SpeciesDetector for MockSpecies {
    async fn detect(&self, _image: &[u8]) -> Result<SpeciesVerdict, ClassifierError> {
        Ok(SpeciesVerdict {
            is_target: self.is_target,
            notes: if self.is_target {
                "Detected animals: penguin (confidence: 0.92)".to_string()
            } else {
                "Detected animals: seal (confidence: 0.64)".to_string()
            },
        })
    }
}

struct MockMolt {
    molt: f64,
    normal: f64,
}

#[async_trait::async_trait]
impl MoltClassifier for MockMolt {
    async fn score(&self, _image: &[u8]) -> Result<MoltScores, ClassifierError> {
        Ok(MoltScores {
            molt_probability: self.molt,
            normal_probability: self.normal,
        })
    }
}

struct MockStage {
    stage: Option<(&'static str, f64)>,
}

#[async_trait::async_trait]
impl StageClassifier for MockStage {
    async fn classify_stage(
        &self,
        _weight_kg: f64,
        _sex: Option<Sex>,
        _observed_at: DateTime<Utc>,
    ) -> Result<StageVerdict, ClassifierError> {
        match self.stage {
            Some((name, confidence)) => Ok(StageVerdict {
                stage_name: name.to_string(),
                confidence,
            }),
            None => Err(ClassifierError::Unavailable("stage model offline".into())),
        }
    }
}

// =============================================================================
// Test helpers
// =============================================================================

struct TestApp {
    app: axum::Router,
    bus: Arc<LiveBus>,
    // Keeps the database and uploads directory alive for the test's duration
    _dir: tempfile::TempDir,
}

async fn setup_app(
    species_target: bool,
    molt: (f64, f64),
    stage: Option<(&'static str, f64)>,
) -> TestApp {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let db = moltwatch_common::db::init_database(&dir.path().join("test.db"))
        .await
        .expect("Should initialize database");

    let pipeline = Arc::new(ClassificationPipeline::new(
        Arc::new(MockSpecies {
            is_target: species_target,
        }),
        Arc::new(MockMolt {
            molt: molt.0,
            normal: molt.1,
        }),
        Arc::new(MockStage { stage }),
    ));

    let bus = Arc::new(LiveBus::new());
    let state = AppState::new(db, Arc::clone(&bus), pipeline, dir.path().join("uploads"));

    TestApp {
        app: build_router(state),
        bus,
        _dir: dir,
    }
}

/// 1x1 PNG, the smallest decodable picture
fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::new(1, 1);
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn ingest_body(rfid: &str, weight: f64) -> Value {
    json!({
        "rfid": rfid,
        "weight": weight,
        "image_base64": BASE64.encode(tiny_png()),
        "sex": "female",
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = http_body_util::BodyExt::collect(body)
        .await
        .expect("Should read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_text(body: Body) -> String {
    let bytes = http_body_util::BodyExt::collect(body)
        .await
        .expect("Should read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

// =============================================================================
// Health endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let response = t.app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "moltwatch-fm");
    assert!(body["version"].is_string());
}

// =============================================================================
// Ingest: validation failures perform no mutation
// =============================================================================

#[tokio::test]
async fn test_ingest_rejects_missing_rfid() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let mut body = ingest_body("", 4.2);
    body["rfid"] = json!("");
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/detections", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing persisted, nothing published
    let recent = t
        .app
        .clone()
        .oneshot(get_request("/api/v1/detections/recent"))
        .await
        .unwrap();
    assert_eq!(extract_json(recent.into_body()).await.as_array().unwrap().len(), 0);

    let latest = t.app.oneshot(get_request("/api/v1/live/latest")).await.unwrap();
    assert_eq!(latest.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingest_rejects_undecodable_image() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let mut body = ingest_body("A12", 4.2);
    body["image_base64"] = json!(BASE64.encode(b"not a picture at all"));
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/v1/detections", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(t.bus.latest(), None);
}

#[tokio::test]
async fn test_ingest_rejects_non_positive_weight() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/detections",
            ingest_body("A12", 0.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Ingest: end-to-end happy path
// =============================================================================

#[tokio::test]
async fn test_ingest_molting_sample_end_to_end() {
    let t = setup_app(true, (0.55, 0.45), Some(("Mid-molt", 0.81))).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/detections",
            ingest_body("A12", 4.2),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["health"], "Molting");
    assert_eq!(body["stage_name"], "Mid-molt");
    assert_eq!(body["status_color"], "orange");
    assert_eq!(body["species_flag"], true);
    assert_eq!(body["molting"], true);

    // One detection persisted with those fields
    let recent = t
        .app
        .clone()
        .oneshot(get_request("/api/v1/detections/recent"))
        .await
        .unwrap();
    let records = extract_json(recent.into_body()).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["rfid"], "A12");
    assert_eq!(records[0]["stage_name"], "Mid-molt");
    assert_eq!(records[0]["health"], "Molting");

    // Individual upserted with last_weight 4.2
    let detail = t
        .app
        .clone()
        .oneshot(get_request("/api/v1/individuals/A12"))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    let detail = extract_json(detail.into_body()).await;
    assert_eq!(detail["individual"]["last_weight"], 4.2);
    assert_eq!(detail["individual"]["health"], "Molting");

    // Live snapshot published with the merged fields
    let latest = t.app.oneshot(get_request("/api/v1/live/latest")).await.unwrap();
    assert_eq!(latest.status(), StatusCode::OK);
    let latest = extract_json(latest.into_body()).await;
    assert_eq!(latest["rfid"], "A12");
    assert_eq!(latest["status_color"], "orange");
}

#[tokio::test]
async fn test_ingest_non_target_species() {
    let t = setup_app(false, (0.9, 0.1), Some(("Pre-molt", 0.9))).await;

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/detections",
            ingest_body("X1", 4.2),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["species_flag"], false);
    assert_eq!(body["stage_name"], "Not a Species");
    assert_eq!(body["health"], "Danger");
    assert_eq!(body["status_color"], "red");
}

#[tokio::test]
async fn test_ingest_fallback_staging() {
    let t = setup_app(true, (0.6, 0.4), None).await;

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/detections",
            ingest_body("A12", 4.2),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stage_name"], "Early-molt");
    assert_eq!(body["health"], "Molting");
    assert!(body["notes"].as_str().unwrap().contains("Fallback staging used"));
}

#[tokio::test]
async fn test_second_sample_computes_daily_change() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let first = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/detections",
            ingest_body("A12", 5.00),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = extract_json(first.into_body()).await;
    // No previous weight: change reported as 0, health from the rule chain
    assert_eq!(first["daily_change"], 0.0);
    assert_eq!(first["health"], "Healthy");

    let second = t
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/detections",
            ingest_body("A12", 4.76),
        ))
        .await
        .unwrap();
    let second = extract_json(second.into_body()).await;
    assert_eq!(second["daily_change"], -0.24);
    assert_eq!(second["health"], "Rapid Weight Loss");
    assert_eq!(second["status_color"], "red");
}

#[tokio::test]
async fn test_multipart_ingest() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let boundary = "moltwatch-test-boundary";
    let png = tiny_png();
    let mut body = Vec::new();
    for (name, value) in [("rfid", "M7".as_bytes()), ("weight", "4.5".as_bytes())] {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"m7.png\"\r\n\
          Content-Type: image/png\r\n\r\n",
    );
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/detections")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Manual uploads are recorded with the manual source kind
    let recent = t
        .app
        .oneshot(get_request("/api/v1/detections/recent"))
        .await
        .unwrap();
    let records = extract_json(recent.into_body()).await;
    assert_eq!(records[0]["rfid"], "M7");
    assert_eq!(records[0]["source_kind"], "manual");
}

// =============================================================================
// Live feed read endpoints
// =============================================================================

#[tokio::test]
async fn test_latest_is_404_before_first_publish() {
    let t = setup_app(true, (0.1, 0.9), None).await;
    let response = t.app.oneshot(get_request("/api/v1/live/latest")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_preserves_arrival_order() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    for rfid in ["H1", "H2", "H3"] {
        let response = t
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/detections",
                ingest_body(rfid, 4.2),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = t
        .app
        .oneshot(get_request("/api/v1/live/history"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 3);
    let snapshots = body["snapshots"].as_array().unwrap();
    assert_eq!(snapshots[0]["rfid"], "H1");
    assert_eq!(snapshots[2]["rfid"], "H3");
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_csv_newest_first() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    for rfid in ["E1", "E2"] {
        t.app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/detections",
                ingest_body(rfid, 4.2),
            ))
            .await
            .unwrap();
    }

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/v1/detections/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("detections_all.csv"));

    let text = extract_text(response.into_body()).await;
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("id,rfid,detection_time"));
    // Newest first: E2 ingested after E1
    assert!(lines[1].contains("E2"));
    assert!(lines[2].contains("E1"));

    // rfid filter
    let filtered = t
        .app
        .oneshot(get_request("/api/v1/detections/export?rfid=E1&format=txt"))
        .await
        .unwrap();
    let text = extract_text(filtered.into_body()).await;
    assert!(text.contains('\t'));
    assert!(text.contains("E1"));
    assert!(!text.contains("E2"));
}

#[tokio::test]
async fn test_export_404_when_empty() {
    let t = setup_app(true, (0.1, 0.9), None).await;
    let response = t
        .app
        .oneshot(get_request("/api/v1/detections/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Environment, roster, stats
// =============================================================================

#[tokio::test]
async fn test_environment_reading_appended_with_sample() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let mut body = ingest_body("A12", 4.2);
    body["temperature"] = json!(3.5);
    body["humidity"] = json!(61.0);
    t.app
        .clone()
        .oneshot(json_request("POST", "/api/v1/detections", body))
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(get_request("/api/v1/environment"))
        .await
        .unwrap();
    let readings = extract_json(response.into_body()).await;
    assert_eq!(readings.as_array().unwrap().len(), 1);
    assert_eq!(readings[0]["temperature"], 3.5);
}

#[tokio::test]
async fn test_individual_detail_404_for_unknown_rfid() {
    let t = setup_app(true, (0.1, 0.9), None).await;
    let response = t
        .app
        .oneshot(get_request("/api/v1/individuals/NOPE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_roster_and_stats() {
    let t = setup_app(true, (0.55, 0.45), Some(("Mid-molt", 0.8))).await;

    for rfid in ["R1", "R2"] {
        t.app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/detections",
                ingest_body(rfid, 4.2),
            ))
            .await
            .unwrap();
    }

    let roster = t
        .app
        .clone()
        .oneshot(get_request("/api/v1/individuals"))
        .await
        .unwrap();
    let roster = extract_json(roster.into_body()).await;
    assert_eq!(roster.as_array().unwrap().len(), 2);
    assert_eq!(roster[0]["detection_count"], 1);

    let stats = t.app.oneshot(get_request("/api/v1/stats")).await.unwrap();
    let stats = extract_json(stats.into_body()).await;
    assert_eq!(stats["total_individuals"], 2);
    assert_eq!(stats["molting"], 2);
    assert_eq!(stats["recent_detections"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_manual_profile_update() {
    let t = setup_app(true, (0.1, 0.9), None).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/individuals",
            json!({"rfid": "P9", "weight": 3.8, "sex": "male", "notes": "tag replaced"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detail = t
        .app
        .oneshot(get_request("/api/v1/individuals/P9"))
        .await
        .unwrap();
    let detail = extract_json(detail.into_body()).await;
    assert_eq!(detail["individual"]["notes"], "tag replaced");
    assert_eq!(detail["individual"]["sex"], "male");
}
