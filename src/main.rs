//! Trimmarr - tag-driven retention cleanup for Sonarr
//!
//! Reads `trimmarr_retain_*` tags from Sonarr, computes which episode
//! files fall outside each series' retention window, and deletes/unmonitors
//! them (or reports the plan in dry-run mode). Runs as a REST service with
//! an optional interval scheduler, or as a one-shot pass with `--once`.

mod api;
mod cli;
mod config;
mod jobs;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CliOptions, RunMode};
use crate::config::Config;
use crate::services::{LogBuffer, RingBufferLayer, SonarrClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` until an API key is configured; endpoints that need Sonarr
    /// fail fast with 503
    pub sonarr: Option<Arc<SonarrClient>>,
    pub log_buffer: LogBuffer,
    /// Single-flight guard: at most one cleanup pass runs at a time
    pub pass_gate: Arc<tokio::sync::Mutex<()>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    // Initialize tracing with console output and the in-memory ring buffer
    // that backs /api/logs
    let log_buffer = LogBuffer::default();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trimmarr=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(RingBufferLayer::new(tracing::Level::INFO, log_buffer.clone()))
        .init();

    tracing::info!("Starting Trimmarr");
    tracing::info!(dry_run = config.dry_run, sonarr_url = %config.sonarr_url, "Configuration loaded");

    let sonarr = config
        .sonarr_api_key
        .as_ref()
        .map(|key| Arc::new(SonarrClient::new(config.sonarr_url.clone(), key.clone())));
    if sonarr.is_none() {
        tracing::warn!("SONARR_API_KEY not set; cleanup endpoints will return 503");
    }

    let state = AppState {
        config: config.clone(),
        sonarr,
        log_buffer,
        pass_gate: Arc::new(tokio::sync::Mutex::new(())),
    };

    let run_mode = CliOptions::from_args()
        .run_mode_override
        .unwrap_or_else(RunMode::from_env);
    if run_mode == RunMode::Once {
        return run_once(state).await;
    }

    // Keep the scheduler handle alive for the lifetime of the server
    let _scheduler = if config.run_interval_hours > 0 {
        tracing::info!(
            "Scheduler enabled: cleanup every {}h",
            config.run_interval_hours
        );
        Some(jobs::start_scheduler(state.clone()).await?)
    } else {
        None
    };

    let app = Router::new()
        // Health endpoints (root level)
        .merge(api::health::router())
        // REST API endpoints
        .nest("/api", api::tags::router())
        .nest("/api", api::series::router())
        .nest("/api", api::cleanup::router())
        .nest("/api", api::logs::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!(
        "{}:{}",
        config.host.as_deref().unwrap_or("0.0.0.0"),
        config.port
    )
    .parse()
    .context("Invalid HOST/PORT combination")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// One tagged cleanup pass, then exit. A missing API key is fatal here.
async fn run_once(state: AppState) -> anyhow::Result<()> {
    let sonarr = state
        .sonarr
        .clone()
        .context("SONARR_API_KEY is required for a one-shot run")?;

    let _guard = state.pass_gate.lock().await;
    let totals =
        services::cleanup::run_tagged_pass(&sonarr, None, state.config.dry_run).await?;

    let mode = if state.config.dry_run { "would " } else { "" };
    tracing::info!(
        "Cleanup: {mode}deleted {} files, {mode}unmonitored {} episodes across {} series",
        totals.deleted,
        totals.unmonitored,
        totals.series_processed
    );
    Ok(())
}
