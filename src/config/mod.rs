//! Application configuration management

use std::env;

use anyhow::{Context, Result};
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server (defaults to 0.0.0.0)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// Sonarr base URL (trailing slash trimmed)
    pub sonarr_url: String,

    /// Sonarr API key; endpoints that need Sonarr return 503 when unset
    pub sonarr_api_key: Option<String>,

    /// Simulate cleanup passes without issuing deletes/unmonitors
    pub dry_run: bool,

    /// Scheduled cleanup interval in hours (0 = scheduler disabled)
    pub run_interval_hours: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let sonarr_url = env::var("SONARR_URL")
            .unwrap_or_else(|_| "http://localhost:8989".to_string())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&sonarr_url).context("SONARR_URL is not a valid URL")?;

        let sonarr_api_key = env::var("SONARR_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            host: env::var("HOST").ok(),

            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("Invalid PORT")?,

            sonarr_url,

            sonarr_api_key,

            dry_run: env::var("TRIMMARR_DRY_RUN")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),

            run_interval_hours: env::var("TRIMMARR_INTERVAL_HOURS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .context("Invalid TRIMMARR_INTERVAL_HOURS")?,
        })
    }
}
