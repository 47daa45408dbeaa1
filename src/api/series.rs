//! Series listing endpoints

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::AppState;
use crate::api::{ApiError, require_sonarr, upstream_error};
use crate::services::cleanup::series_by_tag;
use crate::services::cleanup_planner::{KeepPolicy, plan_cleanup};
use crate::services::retention::resolve_retention;
use crate::services::sonarr::Series;

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub tag: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub id: i64,
    pub title: String,
    pub monitored: bool,
    pub season_count: i32,
}

#[derive(Serialize)]
pub struct SeriesResponse {
    pub series: Vec<SeriesSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSeriesEntry {
    pub id: i64,
    pub title: String,
    pub network: Option<String>,
    pub quality_profile: Option<String>,
    pub season_count: i32,
    pub episode_file_count: usize,
    pub total_episode_count: usize,
    pub retention_label: String,
    pub episodes_to_unmonitor: usize,
    pub files_to_delete: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSeriesResponse {
    pub series: Vec<RetentionSeriesEntry>,
    pub sonarr_url: String,
}

/// List series, optionally narrowed to monitored series carrying a tag
async fn list_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let sonarr = require_sonarr(&state)?;
    let series = sonarr.get_series().await.map_err(upstream_error)?;

    let series: Vec<Series> = match query.tag {
        Some(label) => {
            let tags = sonarr.get_tags().await.map_err(upstream_error)?;
            series_by_tag(&series, &tags, &label)
        }
        None => series,
    };

    Ok(Json(SeriesResponse {
        series: series
            .into_iter()
            .map(|s| SeriesSummary {
                id: s.id,
                title: s.title,
                monitored: s.monitored,
                season_count: s.season_count,
            })
            .collect(),
    }))
}

/// Overview of every monitored series with a retention tag: its rule and
/// the counts the next pass would act on
async fn list_retention_series(
    State(state): State<AppState>,
) -> Result<Json<RetentionSeriesResponse>, ApiError> {
    let sonarr = require_sonarr(&state)?;
    let series = sonarr.get_series().await.map_err(upstream_error)?;
    let tags = sonarr.get_tags().await.map_err(upstream_error)?;
    let profiles = sonarr.get_quality_profiles().await.map_err(upstream_error)?;
    let profile_names: HashMap<i64, String> =
        profiles.into_iter().map(|p| (p.id, p.name)).collect();

    let mut entries = Vec::new();
    for s in series.iter().filter(|s| s.monitored) {
        let Some(rule) = resolve_retention(s, &tags) else {
            continue;
        };
        let Some(policy) = KeepPolicy::from_rule(&rule) else {
            continue;
        };
        let (episodes, files) = match sonarr.get_inventory(s.id).await {
            Ok(inventory) => inventory,
            Err(e) => {
                error!(series_id = s.id, series_title = %s.title, error = %e, "Skipping series in overview");
                continue;
            }
        };
        let plan = plan_cleanup(&episodes, policy);

        entries.push(RetentionSeriesEntry {
            id: s.id,
            title: s.title.clone(),
            network: s
                .network
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            quality_profile: s
                .quality_profile_id
                .and_then(|id| profile_names.get(&id).cloned()),
            season_count: s.season_count,
            episode_file_count: files.len(),
            total_episode_count: episodes.iter().filter(|e| e.season_number >= 0).count(),
            retention_label: rule.describe(),
            episodes_to_unmonitor: plan.episode_ids_to_unmonitor.len(),
            files_to_delete: plan.episode_file_ids_to_delete.len(),
        });
    }

    Ok(Json(RetentionSeriesResponse {
        series: entries,
        sonarr_url: state.config.sonarr_url.clone(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/series", get(list_series))
        .route("/retention-series", get(list_retention_series))
}
