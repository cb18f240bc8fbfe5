// src/notify/mod.rs
//! Push notifications: the [`PushSender`] capability, message building, and
//! fan-out to subscribers with per-subscriber failure isolation.

pub mod expo;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;

use crate::error::NotifyError;
use crate::types::{ChangeEvent, NewsItem, NotificationKind, Subscription};

pub use expo::ExpoPushClient;

/// Accepted token shapes: `ExponentPushToken[...]` and `ExpoPushToken[...]`.
pub const TOKEN_PREFIXES: [&str; 2] = ["ExponentPushToken[", "ExpoPushToken["];

/// Delivers one message to one device. Returns the provider's response.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<serde_json::Value, NotifyError>;
}

pub fn validate_push_token(token: &str) -> Result<(), NotifyError> {
    let token = token.trim();
    let ok = TOKEN_PREFIXES
        .iter()
        .any(|p| token.len() > p.len() + 1 && token.starts_with(p))
        && token.ends_with(']');
    if ok {
        Ok(())
    } else {
        Err(NotifyError::InvalidTokenFormat)
    }
}

/// Short stable fingerprint for logs. Tokens are never logged raw.
pub(crate) fn anon_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
}

/// One aggregate message for all significant events; `None` if there are none.
pub fn ranking_message(events: &[ChangeEvent]) -> Option<PushMessage> {
    let sig: Vec<&ChangeEvent> = events.iter().filter(|e| e.is_significant()).collect();
    let first = sig.first()?;

    let headline = match first {
        ChangeEvent::RankUp {
            player,
            old_position,
            new_position,
            ..
        } => format!("{player} climbed from #{old_position} to #{new_position}"),
        ChangeEvent::NewTop10 {
            player, position, ..
        } => format!("{player} entered the top 10 at #{position}"),
        ChangeEvent::RankDown { player, .. } => format!("{player} moved"),
    };

    let body = if sig.len() == 1 {
        headline
    } else {
        format!(
            "{} changes in the top 10: {headline} and {} more",
            sig.len(),
            sig.len() - 1
        )
    };

    Some(PushMessage {
        title: "🏆 Ranking update".to_string(),
        body,
    })
}

pub fn news_message(items: &[NewsItem]) -> Option<PushMessage> {
    let first = items.first()?;
    let body = if items.len() == 1 {
        first.title.clone()
    } else {
        format!("{} new articles: {}", items.len(), first.title)
    };
    Some(PushMessage {
        title: "📰 GunBound news".to_string(),
        body,
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn PushSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn PushSender>) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &Arc<dyn PushSender> {
        &self.sender
    }

    /// Announce rank gains. Rank drops are filtered out here.
    pub async fn notify_ranking(&self, subs: &[Subscription], events: &[ChangeEvent]) -> DeliveryReport {
        match ranking_message(events) {
            Some(msg) => self.notify(subs, NotificationKind::Ranking, &msg).await,
            None => DeliveryReport::default(),
        }
    }

    pub async fn notify_news(&self, subs: &[Subscription], items: &[NewsItem]) -> DeliveryReport {
        match news_message(items) {
            Some(msg) => self.notify(subs, NotificationKind::News, &msg).await,
            None => DeliveryReport::default(),
        }
    }

    /// Send `msg` to every subscriber of `kind`. A failure for one subscriber is
    /// logged and counted; the rest are still attempted.
    pub async fn notify(&self, subs: &[Subscription], kind: NotificationKind, msg: &PushMessage) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for sub in subs.iter().filter(|s| s.wants(kind)) {
            let id = anon_token(&sub.token);
            let result = match validate_push_token(&sub.token) {
                Ok(()) => self.sender.send(&sub.token, &msg.title, &msg.body).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(_) => {
                    report.sent += 1;
                    counter!("push_sent_total").increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    counter!("push_failed_total").increment(1);
                    tracing::warn!(target: "notify", token = %id, %kind, error = %e, "push failed");
                }
            }
        }

        tracing::info!(
            target: "notify",
            %kind,
            sent = report.sent,
            failed = report.failed,
            "notification fan-out done"
        );
        report
    }
}
