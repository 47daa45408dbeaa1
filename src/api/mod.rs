//! API route definitions
//!
//! One router module per resource, all nested under /api in main (health
//! probes stay at the root). Handlers validate before touching Sonarr and
//! map upstream failures to 502.

pub mod cleanup;
pub mod health;
pub mod logs;
pub mod series;
pub mod tags;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::AppState;
use crate::services::SonarrClient;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Fail fast with 503 when no Sonarr API key is configured
pub fn require_sonarr(state: &AppState) -> Result<Arc<SonarrClient>, ApiError> {
    state.sonarr.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Sonarr not configured: set SONARR_API_KEY".to_string(),
            }),
        )
    })
}

pub fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub fn upstream_error(error: anyhow::Error) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
