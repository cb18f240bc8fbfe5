// src/paginator.rs
//! Leaderboard pagination: discover the page count, then fetch every page with
//! bounded concurrency and stitch the rows back together in page order.

use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ScrapeError;
use crate::extract;
use crate::site::{ranking_index_path, ranking_page_path, PageSource};
use crate::types::RankEntry;

static NUMERIC_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("numeric label regex"));

/// Highest purely numeric label, ignoring arrows/ellipses. `None` if there is none.
pub fn max_page_number<S: AsRef<str>>(labels: &[S]) -> Option<u32> {
    labels
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| NUMERIC_LABEL.is_match(l))
        .filter_map(|l| l.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .max()
}

pub struct Paginator {
    source: Arc<dyn PageSource>,
    region: String,
    max_concurrency: usize,
}

impl Paginator {
    pub fn new(source: Arc<dyn PageSource>, region: String, max_concurrency: usize) -> Self {
        Self {
            source,
            region,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Number of leaderboard pages, read from the pagination control.
    pub async fn total_pages(&self) -> Result<u32, ScrapeError> {
        let html = self.source.fetch(&ranking_index_path(&self.region)).await?;
        let labels = extract::extract_page_labels(&html);
        max_page_number(&labels).ok_or(ScrapeError::NoPaginationFound)
    }

    pub async fn fetch_page(&self, page: u32) -> Result<Vec<RankEntry>, ScrapeError> {
        let html = self
            .source
            .fetch(&ranking_page_path(&self.region, page))
            .await?;
        Ok(extract::extract_ranking(&html))
    }

    /// All pages `1..=total`, at most `max_concurrency` in flight. Rows come back
    /// page 1 first regardless of which fetch finished first; any failed page
    /// fails the whole call.
    pub async fn fetch_all_ranking(&self) -> Result<Vec<RankEntry>, ScrapeError> {
        let total = self.total_pages().await?;
        tracing::info!(
            target: "scrape",
            pages = total,
            concurrency = self.max_concurrency,
            "fetching ranking pages"
        );

        let pages: Vec<Vec<RankEntry>> = stream::iter(1..=total)
            .map(|page| self.fetch_page(page))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        Ok(pages.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_label_ignores_non_numeric() {
        let labels = ["«", "1", "2", "…", "17", "»", " 3", "4a"];
        assert_eq!(max_page_number(&labels), Some(17));
    }

    #[test]
    fn no_numeric_label_is_none() {
        let labels = ["«", "»"];
        assert_eq!(max_page_number(&labels), None);
        let empty: [&str; 0] = [];
        assert_eq!(max_page_number(&empty), None);
    }
}
