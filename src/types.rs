// src/types.rs
//! Records extracted from the site plus the change/subscription vocabulary
//! shared by the monitor, notifier and API.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    /// 1-based rank as printed on the page.
    pub position: u32,
    /// Unique within one snapshot.
    pub nickname: String,
    pub gp: String,
    pub change: String,
    pub rank_icon_url: String,
}

/// One card of the news listing. `title` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub url: String,
    pub image_url: String,
    pub title: String,
    pub description: String,
}

/// Ordered items captured at one point in time. Replaced wholesale, never merged.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    items: Arc<Vec<T>>,
    captured_at: Option<DateTime<Utc>>,
}

impl<T> Snapshot<T> {
    /// Empty snapshot that was never captured (process start).
    pub fn empty() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            captured_at: None,
        }
    }

    pub fn captured(items: Vec<T>, at: DateTime<Utc>) -> Self {
        Self {
            items: Arc::new(items),
            captured_at: Some(at),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    /// True once at least one poll has replaced the initial empty snapshot.
    pub fn is_captured(&self) -> bool {
        self.captured_at.is_some()
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Discrete change in the top 10 between two ranking snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    #[serde(rename_all = "camelCase")]
    RankUp {
        player: String,
        old_position: u32,
        new_position: u32,
        gp: String,
    },
    #[serde(rename_all = "camelCase")]
    RankDown {
        player: String,
        old_position: u32,
        new_position: u32,
        gp: String,
    },
    #[serde(rename_all = "camelCase")]
    NewTop10 {
        player: String,
        position: u32,
        gp: String,
    },
}

impl ChangeEvent {
    pub fn player(&self) -> &str {
        match self {
            Self::RankUp { player, .. }
            | Self::RankDown { player, .. }
            | Self::NewTop10 { player, .. } => player,
        }
    }

    /// Gains are announced, losses are not.
    pub fn is_significant(&self) -> bool {
        matches!(self, Self::RankUp { .. } | Self::NewTop10 { .. })
    }
}

/// Channel a subscriber can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Ranking,
    News,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ranking => "ranking",
            Self::News => "news",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push destination plus the channels it wants. `token` is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub token: String,
    pub notifications: BTreeSet<NotificationKind>,
}

impl Subscription {
    pub fn new(token: impl Into<String>, kinds: impl IntoIterator<Item = NotificationKind>) -> Self {
        Self {
            token: token.into(),
            notifications: kinds.into_iter().collect(),
        }
    }

    pub fn wants(&self, kind: NotificationKind) -> bool {
        self.notifications.contains(&kind)
    }
}

/// Static contact record served by `/api/helpers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperContact {
    pub name: String,
    pub role: String,
    pub contact: String,
}
