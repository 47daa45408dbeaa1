//! Retention decision engine
//!
//! Pure logic: given one series' normalized episode inventory and a keep
//! policy, compute which episodes to unmonitor and which files to delete.
//! No I/O happens here; the cleanup orchestrator applies the plan.

use std::collections::{BTreeSet, HashSet};

use crate::services::retention::RetentionRule;
use crate::services::sonarr::Episode;

/// How much of a series to keep on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    /// Keep the N most recent seasons that have files
    Seasons(u32),
    /// Keep the N most recent filed-and-dated episodes
    Episodes(u32),
    /// Keep `seasons` full seasons plus an `episodes` tail in the season
    /// just below the cutoff
    Combined { seasons: u32, episodes: u32 },
}

impl KeepPolicy {
    /// Map a resolved rule onto a policy; combined takes precedence when
    /// both counts are present
    pub fn from_rule(rule: &RetentionRule) -> Option<Self> {
        match (rule.seasons, rule.episodes) {
            (Some(seasons), Some(episodes)) => Some(Self::Combined { seasons, episodes }),
            (Some(seasons), None) => Some(Self::Seasons(seasons)),
            (None, Some(episodes)) => Some(Self::Episodes(episodes)),
            (None, None) => None,
        }
    }
}

/// Per-series cleanup decision, produced once per pass and never persisted
#[derive(Debug, Clone, Default)]
pub struct CleanupPlan {
    pub episode_ids_to_unmonitor: Vec<i64>,
    /// Deduplicated by file id, first-seen order
    pub episode_file_ids_to_delete: Vec<i64>,
    pub episodes_removed: Vec<Episode>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.episode_ids_to_unmonitor.is_empty() && self.episode_file_ids_to_delete.is_empty()
    }
}

/// Season numbers (>= 0) that currently have at least one filed episode,
/// most recent first. Specials and fileless seasons never enter the ranking.
fn ranked_seasons_with_files(episodes: &[Episode]) -> Vec<i32> {
    let seasons: BTreeSet<i32> = episodes
        .iter()
        .filter(|e| e.season_number >= 0 && e.has_file)
        .map(|e| e.season_number)
        .collect();
    seasons.into_iter().rev().collect()
}

/// The N most recent filed-and-dated episodes of `episodes`, by air date
/// descending. Undated or fileless episodes never qualify for keeping.
fn most_recent_filed_ids<'a>(episodes: impl Iterator<Item = &'a Episode>, keep: usize) -> HashSet<i64> {
    let mut dated: Vec<&Episode> = episodes
        .filter(|e| e.has_file && e.air_date.is_some())
        .collect();
    dated.sort_by(|a, b| b.air_date.cmp(&a.air_date));
    dated.iter().take(keep).map(|e| e.id).collect()
}

/// Compute the cleanup plan for one series.
///
/// Every episode outside the keep set is a removal candidate; a candidate
/// turns into an unmonitor/delete action only when it resolves to a file
/// not yet claimed by an earlier candidate in this plan. Candidates with no
/// file are skipped silently.
pub fn plan_cleanup(episodes: &[Episode], policy: KeepPolicy) -> CleanupPlan {
    let ranked = ranked_seasons_with_files(episodes);

    let candidates: Vec<&Episode> = match policy {
        KeepPolicy::Seasons(keep) => {
            let kept: HashSet<i32> = ranked.iter().take(keep as usize).copied().collect();
            episodes
                .iter()
                .filter(|e| !kept.contains(&e.season_number))
                .collect()
        }
        KeepPolicy::Episodes(keep) => {
            let keep_ids = most_recent_filed_ids(episodes.iter(), keep as usize);
            episodes
                .iter()
                .filter(|e| !keep_ids.contains(&e.id))
                .collect()
        }
        KeepPolicy::Combined { seasons, episodes: tail } => {
            let full_keep: HashSet<i32> = ranked.iter().take(seasons as usize).copied().collect();
            let boundary = ranked.get(seasons as usize).copied();
            let mut keep_ids: HashSet<i64> = episodes
                .iter()
                .filter(|e| full_keep.contains(&e.season_number))
                .map(|e| e.id)
                .collect();
            if let Some(boundary) = boundary {
                keep_ids.extend(most_recent_filed_ids(
                    episodes.iter().filter(|e| e.season_number == boundary),
                    tail as usize,
                ));
            }
            episodes
                .iter()
                .filter(|e| !keep_ids.contains(&e.id))
                .collect()
        }
    };

    let mut plan = CleanupPlan::default();
    let mut seen_files: HashSet<i64> = HashSet::new();
    for episode in candidates {
        let Some(file_id) = episode.file_id else {
            continue;
        };
        if seen_files.insert(file_id) {
            plan.episode_file_ids_to_delete.push(file_id);
            plan.episode_ids_to_unmonitor.push(episode.id);
            plan.episodes_removed.push(episode.clone());
        }
    }
    plan
}
