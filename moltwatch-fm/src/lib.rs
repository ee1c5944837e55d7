//! moltwatch-fm library - Field Monitor service
//!
//! Ingests sensor+image samples from field devices, classifies them through
//! the detection pipeline, persists verdicts, and republishes the live feed
//! to connected viewers.

pub mod api;
pub mod classify;
pub mod db;
pub mod error;
pub mod images;
pub mod live;

pub use crate::error::{ApiError, ApiResult};

use crate::classify::ClassificationPipeline;
use crate::live::LiveBus;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

/// Largest accepted request body; sample images arrive inline
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Live feed broadcaster
    pub bus: Arc<LiveBus>,
    /// Classification pipeline over the capability classifiers
    pub pipeline: Arc<ClassificationPipeline>,
    /// Directory accepted sample images are stored under
    pub uploads_dir: PathBuf,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        bus: Arc<LiveBus>,
        pipeline: Arc<ClassificationPipeline>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            bus,
            pipeline,
            uploads_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                // Ingest (write)
                .route("/detections", post(api::ingest::submit_detection))
                // Detection records (read)
                .route("/detections/recent", get(api::records::recent_detections))
                .route("/detections/export", get(api::records::export_detections))
                // Live feed
                .route("/live/latest", get(api::live::latest_snapshot))
                .route("/live/history", get(api::live::snapshot_history))
                .route("/live/events", get(api::sse::event_stream))
                // Roster
                .route(
                    "/individuals",
                    get(api::individuals::list_individuals).post(api::individuals::update_profile),
                )
                .route("/individuals/:rfid", get(api::individuals::individual_detail))
                // Ambient readings and dashboard
                .route("/environment", get(api::environment::recent_readings))
                .route("/stats", get(api::stats::dashboard_stats)),
        )
        .merge(api::health::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
