//! Field Monitor (moltwatch-fm) - Main entry point
//!
//! Runs the ingest API, classification pipeline, and live feed broadcaster
//! as one service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moltwatch_fm::classify::{
    ClassificationPipeline, HttpMoltClassifier, HttpSpeciesDetector, HttpStageClassifier,
};
use moltwatch_fm::live::LiveBus;
use moltwatch_fm::{build_router, AppState};

/// Command-line arguments for moltwatch-fm
#[derive(Parser, Debug)]
#[command(name = "moltwatch-fm")]
#[command(about = "Field Monitor service for MoltWatch")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "MOLTWATCH_FM_PORT")]
    port: u16,

    /// Data folder (database + stored images)
    #[arg(short, long, env = "MOLTWATCH_DATA")]
    data_folder: Option<PathBuf>,

    /// Base URL of the classifier model server; when absent the pipeline
    /// runs in degraded mode
    #[arg(long, env = "MOLTWATCH_MODEL_URL")]
    model_url: Option<String>,

    /// Species label the detection gate tests for
    #[arg(long, default_value = "penguin", env = "MOLTWATCH_TARGET_SPECIES")]
    target_species: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moltwatch_fm=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting MoltWatch Field Monitor on port {}", args.port);

    let data_folder = moltwatch_common::config::resolve_data_folder(args.data_folder.clone());
    moltwatch_common::config::ensure_layout(&data_folder)
        .context("Failed to initialize data folder")?;
    info!("Data folder: {}", data_folder.display());

    let db_path = moltwatch_common::config::database_path(&data_folder);
    let db = moltwatch_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    match &args.model_url {
        Some(url) => info!("Classifier model server: {}", url),
        None => info!("No model server configured; classification runs degraded"),
    }
    let pipeline = Arc::new(ClassificationPipeline::new(
        Arc::new(HttpSpeciesDetector::new(
            args.model_url.clone(),
            args.target_species.clone(),
        )),
        Arc::new(HttpMoltClassifier::new(args.model_url.clone())),
        Arc::new(HttpStageClassifier::new(args.model_url.clone())),
    ));

    // Live bus with its heartbeat loop; stopped explicitly on shutdown
    let bus = Arc::new(LiveBus::new());
    let broadcast = bus.start();

    let state = AppState::new(
        db,
        Arc::clone(&bus),
        pipeline,
        moltwatch_common::config::uploads_path(&data_folder),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    broadcast.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
