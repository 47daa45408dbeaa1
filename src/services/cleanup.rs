//! Cleanup orchestrator
//!
//! One pass per invocation: fetch the series and tag catalog once, select
//! the qualifying series, then process each one strictly sequentially so
//! write calls against Sonarr never race for the same series. A series that
//! fails upstream is logged and skipped; the pass carries on and still
//! reports totals for the rest. Dry-run computes identical selections and
//! counts, it just never issues the writes.

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::services::cleanup_planner::{CleanupPlan, KeepPolicy, plan_cleanup};
use crate::services::retention::resolve_retention;
use crate::services::sonarr::{Episode, Series, SonarrClient, Tag};

/// Aggregate totals for one pass
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleanupTotals {
    pub deleted: usize,
    pub unmonitored: usize,
    pub series_processed: usize,
}

/// Per-series would-be counts, used by the preview endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SeriesPreview {
    pub series_id: i64,
    pub title: String,
    pub episodes_to_unmonitor: usize,
    pub files_to_delete: usize,
}

/// Monitored series carrying the given tag label
pub fn series_by_tag(series: &[Series], tags: &[Tag], label: &str) -> Vec<Series> {
    let Some(tag_id) = tags.iter().find(|t| t.label == label).map(|t| t.id) else {
        return Vec::new();
    };
    series
        .iter()
        .filter(|s| s.monitored && s.tags.contains(&tag_id))
        .cloned()
        .collect()
}

/// Monitored series whose tags resolve to a retention rule, paired with the
/// policy that rule maps to
pub fn series_with_retention_rules(series: &[Series], tags: &[Tag]) -> Vec<(Series, KeepPolicy)> {
    series
        .iter()
        .filter(|s| s.monitored)
        .filter_map(|s| {
            let rule = resolve_retention(s, tags)?;
            let policy = KeepPolicy::from_rule(&rule)?;
            Some((s.clone(), policy))
        })
        .collect()
}

/// One pass over every monitored series with a retention tag, each honoring
/// its own rule. `series_ids` narrows the selection when given.
pub async fn run_tagged_pass(
    sonarr: &SonarrClient,
    series_ids: Option<&[i64]>,
    dry_run: bool,
) -> Result<CleanupTotals> {
    info!(dry_run, series_ids = ?series_ids, "Cleanup pass started");

    let series = sonarr.get_series().await?;
    let tags = sonarr.get_tags().await?;

    let mut selected = series_with_retention_rules(&series, &tags);
    if let Some(ids) = series_ids {
        selected.retain(|(s, _)| ids.contains(&s.id));
    }

    execute_pass(sonarr, selected, dry_run).await
}

/// One pass over every monitored series carrying `tag`, all using the same
/// explicit override policy instead of their own tag rules
pub async fn run_override_pass(
    sonarr: &SonarrClient,
    tag: &str,
    policy: KeepPolicy,
    dry_run: bool,
) -> Result<CleanupTotals> {
    info!(dry_run, tag, "Override cleanup pass started");

    let series = sonarr.get_series().await?;
    let tags = sonarr.get_tags().await?;

    let selected = series_by_tag(&series, &tags, tag)
        .into_iter()
        .map(|s| (s, policy))
        .collect();

    execute_pass(sonarr, selected, dry_run).await
}

/// Compute per-series plans for every monitored series carrying `tag`
/// without issuing any side effect
pub async fn preview_pass(
    sonarr: &SonarrClient,
    tag: &str,
    policy: KeepPolicy,
) -> Result<Vec<SeriesPreview>> {
    let series = sonarr.get_series().await?;
    let tags = sonarr.get_tags().await?;

    let mut preview = Vec::new();
    for s in series_by_tag(&series, &tags, tag) {
        let (episodes, _files) = match sonarr.get_inventory(s.id).await {
            Ok(inventory) => inventory,
            Err(e) => {
                error!(series_id = s.id, series_title = %s.title, error = %e, "Skipping series in preview");
                continue;
            }
        };
        let plan = plan_cleanup(&episodes, policy);
        if !plan.is_empty() {
            preview.push(SeriesPreview {
                series_id: s.id,
                title: s.title,
                episodes_to_unmonitor: plan.episode_ids_to_unmonitor.len(),
                files_to_delete: plan.episode_file_ids_to_delete.len(),
            });
        }
    }
    Ok(preview)
}

/// Apply (or simulate) one plan per selected series, sequentially, and
/// aggregate totals across the pass
async fn execute_pass(
    sonarr: &SonarrClient,
    selected: Vec<(Series, KeepPolicy)>,
    dry_run: bool,
) -> Result<CleanupTotals> {
    let mut totals = CleanupTotals {
        series_processed: selected.len(),
        ..Default::default()
    };

    for (series, policy) in &selected {
        if let Err(e) = process_series(sonarr, series, *policy, dry_run, &mut totals).await {
            error!(
                series_id = series.id,
                series_title = %series.title,
                error = %e,
                "Series cleanup failed, continuing pass"
            );
        }
    }

    info!(
        deleted = totals.deleted,
        unmonitored = totals.unmonitored,
        series = totals.series_processed,
        "Cleanup pass complete: {} files, {} episodes across {} series",
        totals.deleted,
        totals.unmonitored,
        totals.series_processed
    );
    Ok(totals)
}

async fn process_series(
    sonarr: &SonarrClient,
    series: &Series,
    policy: KeepPolicy,
    dry_run: bool,
    totals: &mut CleanupTotals,
) -> Result<()> {
    let (episodes, _files) = sonarr.get_inventory(series.id).await?;
    let plan = plan_cleanup(&episodes, policy);

    let planned_deletes = plan.episode_file_ids_to_delete.len();
    let planned_unmonitors = plan.episode_ids_to_unmonitor.len();

    log_series_summary(series, &plan, dry_run);

    if dry_run {
        totals.deleted += planned_deletes;
        totals.unmonitored += planned_unmonitors;
        return Ok(());
    }

    // Count only what actually succeeded; a failure surfaces to the caller
    // after the partial counts are recorded
    for file_id in &plan.episode_file_ids_to_delete {
        sonarr.delete_episode_file(*file_id).await?;
        totals.deleted += 1;
    }
    if !plan.episode_ids_to_unmonitor.is_empty() {
        sonarr
            .set_episode_monitored(&plan.episode_ids_to_unmonitor, false)
            .await?;
        totals.unmonitored += planned_unmonitors;
    }
    Ok(())
}

fn log_series_summary(series: &Series, plan: &CleanupPlan, dry_run: bool) {
    let mut msg = format!(
        "{}: {}delete {} files, unmonitor {} episodes",
        series.title,
        if dry_run { "would " } else { "" },
        plan.episode_file_ids_to_delete.len(),
        plan.episode_ids_to_unmonitor.len(),
    );
    if let Some(details) = format_removed_episodes(&plan.episodes_removed) {
        msg.push_str(" | Episodes: ");
        msg.push_str(&details);
    }
    info!(
        series_id = series.id,
        series_title = %series.title,
        dry_run,
        "{msg}"
    );
}

/// Up to the first ten removed episodes as "S1E2 Title" entries, with an
/// overflow marker beyond that
fn format_removed_episodes(removed: &[Episode]) -> Option<String> {
    if removed.is_empty() {
        return None;
    }
    let mut details = removed
        .iter()
        .take(10)
        .map(|e| {
            format!(
                "S{}E{} {}",
                e.season_number,
                e.episode_number,
                e.title.as_deref().unwrap_or(""),
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("; ");
    if removed.len() > 10 {
        details.push_str(&format!(" ... +{} more", removed.len() - 10));
    }
    Some(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: i64, title: &str, monitored: bool, tags: Vec<i64>) -> Series {
        Series {
            id,
            title: title.to_string(),
            monitored,
            tags,
            season_count: 0,
            network: None,
            quality_profile_id: None,
        }
    }

    fn tag(id: i64, label: &str) -> Tag {
        Tag {
            id,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_series_by_tag_requires_monitored() {
        let all = vec![
            series(1, "A", true, vec![7]),
            series(2, "B", false, vec![7]),
            series(3, "C", true, vec![]),
        ];
        let tags = vec![tag(7, "weekly")];

        let filtered = series_by_tag(&all, &tags, "weekly");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_series_by_tag_unknown_label_selects_nothing() {
        let all = vec![series(1, "A", true, vec![7])];
        let tags = vec![tag(7, "weekly")];
        assert!(series_by_tag(&all, &tags, "nope").is_empty());
    }

    #[test]
    fn test_series_with_retention_rules_maps_policies() {
        let all = vec![
            series(1, "A", true, vec![7]),
            series(2, "B", true, vec![8]),
            series(3, "C", false, vec![7]),
        ];
        let tags = vec![
            tag(7, "trimmarr_retain_2_seasons"),
            tag(8, "plain-tag"),
        ];

        let selected = series_with_retention_rules(&all, &tags);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, 1);
        assert_eq!(selected[0].1, KeepPolicy::Seasons(2));
    }

    #[test]
    fn test_format_removed_episodes_overflow_marker() {
        let removed: Vec<Episode> = (1..=12)
            .map(|i| Episode {
                id: i,
                season_number: 1,
                episode_number: i as i32,
                title: Some(format!("Ep {i}")),
                air_date: None,
                has_file: true,
                file_id: Some(i),
            })
            .collect();

        let details = format_removed_episodes(&removed).unwrap();
        assert!(details.starts_with("S1E1 Ep 1; "));
        assert!(details.ends_with(" ... +2 more"));
        assert_eq!(details.matches(';').count(), 9);
    }

    #[test]
    fn test_format_removed_episodes_empty() {
        assert_eq!(format_removed_episodes(&[]), None);
    }
}

#[cfg(test)]
mod pass_tests {
    //! Whole-pass tests against a mocked Sonarr API

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Inventory from the end-to-end scenario: season 1 has three undated,
    /// filed episodes; season 2 has two dated, filed episodes; one file per
    /// episode. `trimmarr_retain_1_seasons` keeps season 2.
    async fn mount_show_a(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/v3/series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 1,
                "title": "Show A",
                "monitored": true,
                "tags": [5],
                "seasonCount": 2,
            }])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/tag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 5, "label": "trimmarr_retain_1_seasons"},
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/episode"))
            .and(query_param("seriesId", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 101, "seasonNumber": 1, "episodeNumber": 1, "title": "One", "hasFile": true, "episodeFileId": 11},
                {"id": 102, "seasonNumber": 1, "episodeNumber": 2, "title": "Two", "hasFile": true, "episodeFileId": 12},
                {"id": 103, "seasonNumber": 1, "episodeNumber": 3, "title": "Three", "hasFile": true, "episodeFileId": 13},
                {"id": 104, "seasonNumber": 2, "episodeNumber": 1, "title": "Four", "hasFile": true, "episodeFileId": 21, "airDateUtc": "2024-01-01T00:00:00Z"},
                {"id": 105, "seasonNumber": 2, "episodeNumber": 2, "title": "Five", "hasFile": true, "episodeFileId": 22, "airDateUtc": "2024-02-01T00:00:00Z"},
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/episodefile"))
            .and(query_param("seriesId", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 11, "episodeIds": [101]},
                {"id": 12, "episodeIds": [102]},
                {"id": 13, "episodeIds": [103]},
                {"id": 21, "episodeIds": [104]},
                {"id": 22, "episodeIds": [105]},
            ])))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> SonarrClient {
        SonarrClient::new(server.uri(), "test-key".to_string())
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_writes() {
        let server = MockServer::start().await;
        mount_show_a(&server).await;
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/api/v3/episodefile/\d+$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v3/episode/monitor"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let totals = run_tagged_pass(&client_for(&server), None, true)
            .await
            .unwrap();

        assert_eq!(totals.deleted, 3);
        assert_eq!(totals.unmonitored, 3);
        assert_eq!(totals.series_processed, 1);
    }

    #[tokio::test]
    async fn test_live_run_matches_dry_run_counts_and_writes() {
        let server = MockServer::start().await;
        mount_show_a(&server).await;
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/api/v3/episodefile/1[123]$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v3/episode/monitor"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let totals = run_tagged_pass(&client_for(&server), None, false)
            .await
            .unwrap();

        // Identical counts to the dry run over the same inventory
        assert_eq!(totals.deleted, 3);
        assert_eq!(totals.unmonitored, 3);
        assert_eq!(totals.series_processed, 1);
    }

    #[tokio::test]
    async fn test_series_ids_narrow_the_selection() {
        let server = MockServer::start().await;
        mount_show_a(&server).await;

        let totals = run_tagged_pass(&client_for(&server), Some(&[999]), true)
            .await
            .unwrap();

        assert_eq!(totals.series_processed, 0);
        assert_eq!(totals.deleted, 0);
    }

    #[tokio::test]
    async fn test_failing_series_is_skipped_and_pass_continues() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "title": "Broken", "monitored": true, "tags": [5]},
                {"id": 2, "title": "Fine", "monitored": true, "tags": [5]},
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/tag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 5, "label": "trimmarr_retain_1_seasons"},
            ])))
            .mount(&server)
            .await;
        // Series 1 fails upstream
        Mock::given(method("GET"))
            .and(path("/api/v3/episode"))
            .and(query_param("seriesId", "1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/episode"))
            .and(query_param("seriesId", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 201, "seasonNumber": 1, "episodeNumber": 1, "hasFile": true, "episodeFileId": 31},
                {"id": 202, "seasonNumber": 2, "episodeNumber": 1, "hasFile": true, "episodeFileId": 32},
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/episodefile"))
            .and(query_param("seriesId", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 31, "episodeIds": [201]},
                {"id": 32, "episodeIds": [202]},
            ])))
            .mount(&server)
            .await;

        let totals = run_tagged_pass(&client_for(&server), None, true)
            .await
            .unwrap();

        // Both selected, only the healthy one contributed counts
        assert_eq!(totals.series_processed, 2);
        assert_eq!(totals.deleted, 1);
        assert_eq!(totals.unmonitored, 1);
    }

    #[tokio::test]
    async fn test_live_partial_delete_failure_keeps_partial_counts() {
        let server = MockServer::start().await;
        mount_show_a(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/api/v3/episodefile/11"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v3/episodefile/12"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let totals = run_tagged_pass(&client_for(&server), None, false)
            .await
            .unwrap();

        // The series aborted mid-apply: one successful delete counted, the
        // unmonitor call never happened
        assert_eq!(totals.deleted, 1);
        assert_eq!(totals.unmonitored, 0);
    }

    #[tokio::test]
    async fn test_override_pass_uses_the_explicit_rule() {
        let server = MockServer::start().await;
        mount_show_a(&server).await;

        // Keep the two most recent dated episodes; season 1 is undated and
        // has three files to drop
        let totals = run_override_pass(
            &client_for(&server),
            "trimmarr_retain_1_seasons",
            KeepPolicy::Episodes(2),
            true,
        )
        .await
        .unwrap();

        assert_eq!(totals.deleted, 3);
        assert_eq!(totals.unmonitored, 3);
    }

    #[tokio::test]
    async fn test_preview_reports_counts_without_writes() {
        let server = MockServer::start().await;
        mount_show_a(&server).await;
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/api/v3/episodefile/\d+$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v3/episode/monitor"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let preview = preview_pass(
            &client_for(&server),
            "trimmarr_retain_1_seasons",
            KeepPolicy::Seasons(1),
        )
        .await
        .unwrap();

        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].series_id, 1);
        assert_eq!(preview[0].files_to_delete, 3);
        assert_eq!(preview[0].episodes_to_unmonitor, 3);
    }

    #[tokio::test]
    async fn test_pass_aborts_when_catalog_fetch_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/series"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = run_tagged_pass(&client_for(&server), None, true).await;
        assert!(result.is_err());
    }
}
