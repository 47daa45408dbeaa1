//! Health check and Sonarr status endpoints

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::error;

use crate::AppState;
use crate::api::{ApiError, require_sonarr};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub sonarr: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub dry_run: bool,
}

/// Health check - always returns OK if the server is running
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Status probe - verifies Sonarr is reachable with the configured key
async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let sonarr = require_sonarr(&state)?;
    let dry_run = state.config.dry_run;

    match sonarr.get_series().await {
        Ok(_) => Ok(Json(StatusResponse {
            ok: true,
            sonarr: "connected",
            detail: None,
            dry_run,
        })),
        Err(e) => {
            error!(error = %e, "Sonarr connection failed");
            Ok(Json(StatusResponse {
                ok: false,
                sonarr: "error",
                detail: Some(e.to_string()),
                dry_run,
            }))
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/status", get(status))
}
