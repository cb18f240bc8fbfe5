//! snapshot.rs: in-memory last-seen leaderboard and news, shared between the
//! monitor (single writer per kind) and API readers.

use chrono::{DateTime, Utc};
use metrics::gauge;
use parking_lot::RwLock;

use crate::types::{NewsItem, NotificationKind, RankEntry, Snapshot};

#[derive(Debug, Default)]
pub struct SnapshotStore {
    ranking: RwLock<Snapshot<RankEntry>>,
    news: RwLock<Snapshot<NewsItem>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranking(&self) -> Snapshot<RankEntry> {
        self.ranking.read().clone()
    }

    pub fn news(&self) -> Snapshot<NewsItem> {
        self.news.read().clone()
    }

    pub fn replace_ranking(&self, items: Vec<RankEntry>, at: DateTime<Utc>) {
        gauge!("snapshot_entries", "kind" => NotificationKind::Ranking.as_str()).set(items.len() as f64);
        *self.ranking.write() = Snapshot::captured(items, at);
    }

    pub fn replace_news(&self, items: Vec<NewsItem>, at: DateTime<Utc>) {
        gauge!("snapshot_entries", "kind" => NotificationKind::News.as_str()).set(items.len() as f64);
        *self.news.write() = Snapshot::captured(items, at);
    }
}
