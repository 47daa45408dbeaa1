//! Tag catalog endpoint

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::api::{ApiError, require_sonarr, upstream_error};
use crate::services::Tag;

#[derive(Serialize)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
}

/// List all tags known to Sonarr
async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, ApiError> {
    let sonarr = require_sonarr(&state)?;
    let tags = sonarr.get_tags().await.map_err(upstream_error)?;
    Ok(Json(TagsResponse { tags }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}
