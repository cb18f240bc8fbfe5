// src/config.rs
//! Runtime configuration: optional TOML file, then environment overrides.
//!
//! Lookup order for the file: `$APP_CONFIG_PATH`, then `config/app.toml`.
//! A missing file is not an error; every field has a default.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::HelperContact;

pub const ENV_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Scraped site origin, no trailing slash.
    pub base_url: String,
    /// Leaderboard/news language segment ("EN", "BR", ...).
    pub region: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Minimum spacing between two outbound requests to the scraped site.
    pub min_request_interval_ms: u64,
    pub max_concurrent_pages: usize,

    pub initial_check_delay_secs: u64,
    pub ranking_interval_secs: u64,
    pub news_interval_secs: u64,

    pub push_endpoint: String,
    pub push_timeout_secs: u64,

    /// JSON file backing the subscription store; empty keeps subscriptions in memory.
    pub subscriptions_path: String,
    pub helpers_path: String,
    pub assets_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gunboundggh.com".to_string(),
            region: "EN".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            request_timeout_secs: 15,
            min_request_interval_ms: 250,
            max_concurrent_pages: 4,
            initial_check_delay_secs: 5,
            ranking_interval_secs: 30 * 60,
            news_interval_secs: 15 * 60,
            push_endpoint: "https://exp.host/--/api/v2/push/send".to_string(),
            push_timeout_secs: 10,
            subscriptions_path: "state/subscriptions.json".to_string(),
            helpers_path: "config/helpers.json".to_string(),
            assets_dir: "public/images".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default location, then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Some(pb)
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                pb.exists().then_some(pb)
            }
        };

        let mut cfg = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg.sanitized())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    fn apply_env(&mut self) {
        override_string(&mut self.base_url, "BASE_URL");
        override_string(&mut self.region, "SITE_REGION");
        override_string(&mut self.push_endpoint, "PUSH_ENDPOINT");
        override_string(&mut self.subscriptions_path, "SUBSCRIPTIONS_PATH");
        override_string(&mut self.helpers_path, "HELPERS_PATH");
        override_string(&mut self.assets_dir, "ASSETS_DIR");
        override_parsed(&mut self.ranking_interval_secs, "RANKING_INTERVAL_SECS");
        override_parsed(&mut self.news_interval_secs, "NEWS_INTERVAL_SECS");
        override_parsed(&mut self.initial_check_delay_secs, "INITIAL_CHECK_DELAY_SECS");
        override_parsed(&mut self.max_concurrent_pages, "MAX_CONCURRENT_PAGES");
        override_parsed(&mut self.request_timeout_secs, "REQUEST_TIMEOUT_SECS");
        override_parsed(&mut self.min_request_interval_ms, "MIN_REQUEST_INTERVAL_MS");
    }

    /// Clamp values that would stall the scheduler or the paginator.
    fn sanitized(mut self) -> Self {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.max_concurrent_pages = self.max_concurrent_pages.max(1);
        self.ranking_interval_secs = self.ranking_interval_secs.max(1);
        self.news_interval_secs = self.news_interval_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.push_timeout_secs = self.push_timeout_secs.max(1);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    pub fn initial_check_delay(&self) -> Duration {
        Duration::from_secs(self.initial_check_delay_secs)
    }

    pub fn ranking_interval(&self) -> Duration {
        Duration::from_secs(self.ranking_interval_secs)
    }

    pub fn news_interval(&self) -> Duration {
        Duration::from_secs(self.news_interval_secs)
    }
}

/// Helper contacts for `/api/helpers`. A missing file means an empty list.
pub fn load_helpers(path: &Path) -> Result<Vec<HelperContact>> {
    match std::fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).with_context(|| format!("parsing helpers {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "helpers file not found, serving an empty list");
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("reading helpers {}", path.display())),
    }
}

fn override_string(slot: &mut String, key: &str) {
    if let Ok(v) = std::env::var(key) {
        let v = v.trim();
        if !v.is_empty() {
            *slot = v.to_string();
        }
    }
}

fn override_parsed<T: std::str::FromStr>(slot: &mut T, key: &str) {
    if let Some(v) = std::env::var(key).ok().and_then(|v| v.trim().parse().ok()) {
        *slot = v;
    }
}
