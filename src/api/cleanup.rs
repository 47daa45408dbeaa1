//! Cleanup preview and execute endpoints

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::{ApiError, bad_request, require_sonarr, upstream_error};
use crate::services::cleanup::{CleanupTotals, SeriesPreview, preview_pass, run_override_pass, run_tagged_pass};
use crate::services::cleanup_planner::KeepPolicy;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub tag: String,
    pub keep_seasons: Option<u32>,
    pub keep_episodes: Option<u32>,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub preview: Vec<SeriesPreview>,
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub tag: Option<String>,
    pub keep_seasons: Option<u32>,
    pub keep_episodes: Option<u32>,
    pub series_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Build the override policy from a request, enforcing that exactly one
/// count is present and at least 1. Runs before any Sonarr I/O.
fn override_policy(keep_seasons: Option<u32>, keep_episodes: Option<u32>) -> Result<KeepPolicy, ApiError> {
    let policy = match (keep_seasons, keep_episodes) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(bad_request("Provide exactly one of keep_seasons or keep_episodes"));
        }
        (Some(seasons), None) => KeepPolicy::Seasons(seasons),
        (None, Some(episodes)) => KeepPolicy::Episodes(episodes),
    };
    match policy {
        KeepPolicy::Seasons(0) | KeepPolicy::Episodes(0) => {
            Err(bad_request("Keep count must be at least 1"))
        }
        _ => Ok(policy),
    }
}

/// Compute the cleanup plan for a tag and explicit rule, no side effects
async fn preview_cleanup(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let policy = override_policy(req.keep_seasons, req.keep_episodes)?;
    let sonarr = require_sonarr(&state)?;

    let preview = preview_pass(&sonarr, &req.tag, policy)
        .await
        .map_err(upstream_error)?;

    Ok(Json(PreviewResponse {
        preview,
        tag: req.tag,
    }))
}

/// Execute one cleanup pass: explicit series ids honoring their own tag
/// rules, or a tag with an explicit override rule
async fn execute_cleanup(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<CleanupTotals>, ApiError> {
    let dry_run = req.dry_run || state.config.dry_run;

    // Validate the selection before any I/O
    enum Selection {
        ByIds(Vec<i64>),
        ByTag(String, KeepPolicy),
    }
    let selection = match (&req.series_ids, &req.tag) {
        (Some(ids), _) if !ids.is_empty() => Selection::ByIds(ids.clone()),
        (_, Some(tag)) if req.keep_seasons.is_some() || req.keep_episodes.is_some() => {
            Selection::ByTag(tag.clone(), override_policy(req.keep_seasons, req.keep_episodes)?)
        }
        _ => {
            return Err(bad_request(
                "Provide series_ids or tag with keep_seasons/keep_episodes",
            ));
        }
    };

    let sonarr = require_sonarr(&state)?;

    // On-demand passes serialize behind the gate
    let _guard = state.pass_gate.lock().await;

    let totals = match selection {
        Selection::ByIds(ids) => run_tagged_pass(&sonarr, Some(&ids), dry_run).await,
        Selection::ByTag(tag, policy) => run_override_pass(&sonarr, &tag, policy, dry_run).await,
    }
    .map_err(upstream_error)?;

    Ok(Json(totals))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/preview", post(preview_cleanup))
        .route("/cleanup", post(execute_cleanup))
}
