//! Sonarr integration and cleanup logic

pub mod cleanup;
pub mod cleanup_planner;
pub mod logging;
pub mod retention;
pub mod sonarr;

pub use cleanup::{CleanupTotals, SeriesPreview};
pub use cleanup_planner::{CleanupPlan, KeepPolicy, plan_cleanup};
pub use logging::{LogBuffer, LogEntry, RingBufferLayer};
pub use retention::{RetentionRule, parse_retention_tag, resolve_retention};
pub use sonarr::{Episode, EpisodeFile, Series, SonarrClient, Tag};
