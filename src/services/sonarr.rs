//! Sonarr v3 API client and library inventory models
//!
//! All requests go to `{base_url}/api/v3` with the API key in the
//! `X-Api-Key` header. Episode and episode-file payloads vary in shape
//! across Sonarr versions, so raw wire models are normalized into one
//! canonical form right after fetch; everything downstream consumes the
//! canonical [Episode]/[EpisodeFile] shapes only.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sonarr API client
pub struct SonarrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Tag from the Sonarr catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

/// Series record from Sonarr
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: i64,
    pub title: String,
    #[serde(default = "default_monitored")]
    pub monitored: bool,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub season_count: i32,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub quality_profile_id: Option<i64>,
}

fn default_monitored() -> bool {
    true
}

/// Quality profile from Sonarr
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Episode as Sonarr sends it; field naming differs between API versions
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEpisode {
    pub id: i64,
    pub season_number: i32,
    #[serde(default)]
    pub episode_number: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub air_date_utc: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default, alias = "has_file")]
    pub has_file: Option<bool>,
    #[serde(default, alias = "episode_file_id")]
    pub episode_file_id: Option<i64>,
    #[serde(default, alias = "episode_file")]
    pub episode_file: Option<EmbeddedEpisodeFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedEpisodeFile {
    pub id: i64,
}

/// Episode file as Sonarr sends it; older responses use a singular
/// `episodeId` instead of the `episodeIds` list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEpisodeFile {
    pub id: i64,
    #[serde(default, alias = "episode_ids")]
    pub episode_ids: Option<Vec<i64>>,
    #[serde(default, alias = "episode_id")]
    pub episode_id: Option<i64>,
}

/// Canonical episode shape consumed by the retention planner
#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    pub id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: Option<String>,
    /// `airDateUtc` falling back to `airDate`; `None` when unaired/unplaced
    pub air_date: Option<String>,
    pub has_file: bool,
    /// Covering file, resolved via direct reference, embedded object, or
    /// reverse lookup through the file list
    pub file_id: Option<i64>,
}

/// Canonical episode-file shape
#[derive(Debug, Clone)]
pub struct EpisodeFile {
    pub id: i64,
    pub episode_ids: Vec<i64>,
}

/// Collapse the raw wire shapes into canonical [Episode]/[EpisodeFile]
/// records, resolving each episode's covering file exactly once
pub fn normalize_inventory(
    raw_episodes: Vec<RawEpisode>,
    raw_files: Vec<RawEpisodeFile>,
) -> (Vec<Episode>, Vec<EpisodeFile>) {
    let files: Vec<EpisodeFile> = raw_files
        .into_iter()
        .map(|f| EpisodeFile {
            id: f.id,
            episode_ids: f
                .episode_ids
                .unwrap_or_else(|| f.episode_id.into_iter().collect()),
        })
        .collect();

    let mut file_by_episode: HashMap<i64, i64> = HashMap::new();
    for file in &files {
        for episode_id in &file.episode_ids {
            file_by_episode.insert(*episode_id, file.id);
        }
    }

    let episodes = raw_episodes
        .into_iter()
        .map(|e| {
            // Sonarr sends episodeFileId: 0 for episodes without a file
            let direct = e
                .episode_file_id
                .filter(|id| *id > 0)
                .or(e.episode_file.as_ref().map(|f| f.id));
            let file_id = direct.or_else(|| file_by_episode.get(&e.id).copied());
            Episode {
                id: e.id,
                season_number: e.season_number,
                episode_number: e.episode_number,
                title: e.title,
                air_date: e
                    .air_date_utc
                    .or(e.air_date)
                    .filter(|d| !d.is_empty()),
                has_file: e.has_file.unwrap_or(file_id.is_some()),
                file_id,
            }
        })
        .collect();

    (episodes, files)
}

impl SonarrClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    /// Fetch all series in the library
    pub async fn get_series(&self) -> Result<Vec<Series>> {
        let response = self
            .client
            .get(self.url("/series"))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch series from Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!("Sonarr series request failed with status: {}", response.status());
        }

        let series: Vec<Series> = response
            .json()
            .await
            .context("Failed to parse Sonarr series list")?;

        debug!(count = series.len(), "Sonarr returned series");
        Ok(series)
    }

    /// Fetch the tag catalog
    pub async fn get_tags(&self) -> Result<Vec<Tag>> {
        let response = self
            .client
            .get(self.url("/tag"))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch tags from Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!("Sonarr tag request failed with status: {}", response.status());
        }

        response.json().await.context("Failed to parse Sonarr tags")
    }

    /// Fetch quality profiles (for display names)
    pub async fn get_quality_profiles(&self) -> Result<Vec<QualityProfile>> {
        let response = self
            .client
            .get(self.url("/qualityprofile"))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch quality profiles from Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Sonarr quality profile request failed with status: {}",
                response.status()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse Sonarr quality profiles")
    }

    /// Fetch all episodes of one series
    pub async fn get_episodes(&self, series_id: i64) -> Result<Vec<RawEpisode>> {
        let response = self
            .client
            .get(self.url("/episode"))
            .header("X-Api-Key", &self.api_key)
            .query(&[("seriesId", series_id)])
            .send()
            .await
            .context("Failed to fetch episodes from Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Sonarr episode request failed with status: {}",
                response.status()
            );
        }

        let episodes: Vec<RawEpisode> = response
            .json()
            .await
            .context("Failed to parse Sonarr episodes")?;

        debug!(series_id, count = episodes.len(), "Sonarr returned episodes");
        Ok(episodes)
    }

    /// Fetch all episode files of one series
    pub async fn get_episode_files(&self, series_id: i64) -> Result<Vec<RawEpisodeFile>> {
        let response = self
            .client
            .get(self.url("/episodefile"))
            .header("X-Api-Key", &self.api_key)
            .query(&[("seriesId", series_id)])
            .send()
            .await
            .context("Failed to fetch episode files from Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Sonarr episode file request failed with status: {}",
                response.status()
            );
        }

        let files: Vec<RawEpisodeFile> = response
            .json()
            .await
            .context("Failed to parse Sonarr episode files")?;

        debug!(series_id, count = files.len(), "Sonarr returned episode files");
        Ok(files)
    }

    /// Fetch one series' full inventory, already normalized
    pub async fn get_inventory(&self, series_id: i64) -> Result<(Vec<Episode>, Vec<EpisodeFile>)> {
        let raw_episodes = self.get_episodes(series_id).await?;
        let raw_files = self.get_episode_files(series_id).await?;
        Ok(normalize_inventory(raw_episodes, raw_files))
    }

    /// Delete an episode file from disk via Sonarr
    pub async fn delete_episode_file(&self, episode_file_id: i64) -> Result<()> {
        info!(episode_file_id, "Deleting episode file via Sonarr");

        let response = self
            .client
            .delete(self.url(&format!("/episodefile/{episode_file_id}")))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("Failed to delete episode file via Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Sonarr episode file delete failed with status: {}",
                response.status()
            );
        }

        Ok(())
    }

    /// Set the monitored flag on a batch of episodes
    pub async fn set_episode_monitored(&self, episode_ids: &[i64], monitored: bool) -> Result<()> {
        if episode_ids.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.url("/episode/monitor"))
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({
                "episodeIds": episode_ids,
                "monitored": monitored,
            }))
            .send()
            .await
            .context("Failed to update episode monitoring via Sonarr")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Sonarr episode monitor update failed with status: {}",
                response.status()
            );
        }

        Ok(())
    }
}
