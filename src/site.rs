// src/site.rs
//! Access to the scraped site: the [`PageSource`] seam, its HTTP implementation,
//! and [`Site`], which turns pages into records.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::extract;
use crate::paginator::Paginator;
use crate::types::{NewsItem, RankEntry};

/// Fetches a site-relative path (e.g. `/rank/EN?page=2`) as markup text.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String, ScrapeError>;
}

pub fn ranking_index_path(region: &str) -> String {
    format!("/rank/{region}")
}

pub fn ranking_page_path(region: &str, page: u32) -> String {
    format!("/rank/{region}?page={page}")
}

pub fn news_path(region: &str) -> String {
    format!("/news/{region}")
}

/// reqwest-backed source with a request timeout and a minimum spacing between
/// request starts, so a burst of page fetches does not hammer the site.
pub struct HttpPageSource {
    base_url: String,
    client: Client,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl HttpPageSource {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&cfg.user_agent)
            .timeout(cfg.request_timeout())
            .build()
            .context("building scrape http client")?;
        Ok(Self {
            base_url: cfg.base_url.clone(),
            client,
            min_interval: cfg.min_request_interval(),
            last_start: Mutex::new(None),
        })
    }

    async fn pace(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.min_interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, path: &str) -> Result<String, ScrapeError> {
        self.pace().await;

        let url = format!("{}{}", self.base_url, path);
        let t0 = std::time::Instant::now();
        counter!("scrape_requests_total").increment(1);

        let resp = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|source| {
                counter!("scrape_errors_total").increment(1);
                ScrapeError::Http {
                    url: url.clone(),
                    source,
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            counter!("scrape_errors_total").increment(1);
            return Err(ScrapeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|source| {
            counter!("scrape_errors_total").increment(1);
            ScrapeError::Http {
                url: url.clone(),
                source,
            }
        })?;

        histogram!("scrape_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(target: "scrape", %url, bytes = body.len(), "page fetched");
        Ok(body)
    }
}

/// Leaderboard + news reader for one region of the site.
pub struct Site {
    source: Arc<dyn PageSource>,
    paginator: Paginator,
    region: String,
}

impl Site {
    pub fn new(source: Arc<dyn PageSource>, region: impl Into<String>, max_concurrent_pages: usize) -> Self {
        let region = region.into();
        let paginator = Paginator::new(source.clone(), region.clone(), max_concurrent_pages);
        Self {
            source,
            paginator,
            region,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let source = HttpPageSource::new(cfg)?;
        Ok(Self::new(Arc::new(source), cfg.region.clone(), cfg.max_concurrent_pages))
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Full leaderboard across all pages, page order preserved.
    pub async fn fetch_ranking(&self) -> Result<Vec<RankEntry>, ScrapeError> {
        self.paginator.fetch_all_ranking().await
    }

    pub async fn fetch_news(&self) -> Result<Vec<NewsItem>, ScrapeError> {
        let html = self.source.fetch(&news_path(&self.region)).await?;
        let news = extract::extract_news(&html);
        tracing::debug!(target: "scrape", items = news.len(), "news extracted");
        Ok(news)
    }
}
