//! Retention rule parsing and resolution
//!
//! Retention policy is encoded in Sonarr tag labels:
//! - `trimmarr_retain_<N>_seasons` keeps the N most recent seasons on disk
//! - `trimmarr_retain_<N>_episodes` keeps the N most recent episodes
//!
//! A series carrying one tag of each mode enters combined mode (full recent
//! seasons plus a partial tail in the next-oldest season).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::services::sonarr::{Series, Tag};

static SEASONS_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^trimmarr_retain_(\d+)_seasons?$").unwrap());
static EPISODES_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^trimmarr_retain_(\d+)_episodes?$").unwrap());

/// Which unit a single retention tag counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionMode {
    Seasons,
    Episodes,
}

/// Effective retention rule for one series, folded from its tags.
/// Each count is >= 1 when present; both present means combined mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionRule {
    pub seasons: Option<u32>,
    pub episodes: Option<u32>,
}

impl RetentionRule {
    pub fn is_combined(&self) -> bool {
        self.seasons.is_some() && self.episodes.is_some()
    }

    /// Human-readable form for listings, e.g. "Keep 2 seasons + 1 episode"
    pub fn describe(&self) -> String {
        fn plural(n: u32) -> &'static str {
            if n == 1 { "" } else { "s" }
        }
        match (self.seasons, self.episodes) {
            (Some(s), Some(e)) => {
                format!("{s} season{} + {e} episode{}", plural(s), plural(e))
            }
            (Some(s), None) => format!("Keep {s} season{}", plural(s)),
            (None, Some(e)) => format!("Keep {e} episode{}", plural(e)),
            (None, None) => String::new(),
        }
    }
}

/// Parse one tag label into a retention mode and count.
/// Returns `None` for anything that is not a retention tag.
pub fn parse_retention_tag(label: &str) -> Option<(RetentionMode, u32)> {
    let label = label.trim();
    for (re, mode) in [
        (&*SEASONS_TAG_RE, RetentionMode::Seasons),
        (&*EPISODES_TAG_RE, RetentionMode::Episodes),
    ] {
        if let Some(caps) = re.captures(label) {
            // Absurdly long digit runs overflow u32; treat them as non-tags
            if let Ok(count) = caps[1].parse::<u32>() {
                return Some((mode, count));
            }
        }
    }
    None
}

/// Fold a series' tags into its effective retention rule.
///
/// Tags are folded in the order Sonarr lists them on the series; the last
/// matching tag of a given mode wins. Counts below 1 are discarded.
/// Returns `None` when no tag produced a rule.
pub fn resolve_retention(series: &Series, tags: &[Tag]) -> Option<RetentionRule> {
    let mut rule = RetentionRule::default();
    for tag_id in &series.tags {
        let Some(tag) = tags.iter().find(|t| t.id == *tag_id) else {
            continue;
        };
        if let Some((mode, count)) = parse_retention_tag(&tag.label) {
            if count >= 1 {
                match mode {
                    RetentionMode::Seasons => rule.seasons = Some(count),
                    RetentionMode::Episodes => rule.episodes = Some(count),
                }
            }
        }
    }
    if rule.seasons.is_none() && rule.episodes.is_none() {
        None
    } else {
        Some(rule)
    }
}
