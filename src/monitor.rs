// src/monitor.rs
//! One check cycle per kind: fetch → diff against the last snapshot → notify
//! subscribers → replace the snapshot.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::change_detector::{detect_news_changes, detect_ranking_changes};
use crate::notify::{DeliveryReport, Notifier};
use crate::site::Site;
use crate::snapshot::SnapshotStore;
use crate::subscriptions::SubscriptionStore;
use crate::types::NotificationKind;

/// What one cycle did.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub kind: NotificationKind,
    pub fetched: usize,
    /// All detected changes (including ones that are not announced).
    pub changes: usize,
    /// `false` on the cycle that seeds the baseline.
    pub compared: bool,
    pub delivery: DeliveryReport,
}

/// Result of a manual/initial ranking + news pass. Failures are kept as text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub ranking: Result<CheckOutcome, String>,
    pub news: Result<CheckOutcome, String>,
    pub finished_at: DateTime<Utc>,
}

impl CheckReport {
    pub fn total_changes(&self) -> usize {
        [&self.ranking, &self.news]
            .into_iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|o| o.changes)
            .sum()
    }
}

pub struct Monitor {
    site: Arc<Site>,
    store: Arc<SnapshotStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    notifier: Notifier,
    // Serialize same-kind cycles (timer vs manual trigger) so diff+replace never interleave.
    ranking_cycle: Mutex<()>,
    news_cycle: Mutex<()>,
}

impl Monitor {
    pub fn new(
        site: Arc<Site>,
        store: Arc<SnapshotStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            site,
            store,
            subscriptions,
            notifier,
            ranking_cycle: Mutex::new(()),
            news_cycle: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub async fn check(&self, kind: NotificationKind) -> Result<CheckOutcome> {
        counter!("check_runs_total", "kind" => kind.as_str()).increment(1);
        let res = match kind {
            NotificationKind::Ranking => self.check_ranking().await,
            NotificationKind::News => self.check_news().await,
        };
        match &res {
            Ok(o) => {
                counter!("change_events_total", "kind" => kind.as_str()).increment(o.changes as u64);
                tracing::info!(
                    target: "monitor",
                    %kind,
                    fetched = o.fetched,
                    changes = o.changes,
                    sent = o.delivery.sent,
                    failed = o.delivery.failed,
                    "check done"
                );
            }
            Err(e) => {
                counter!("check_failures_total", "kind" => kind.as_str()).increment(1);
                tracing::warn!(target: "monitor", %kind, error = %format!("{e:#}"), "check failed");
            }
        }
        res
    }

    async fn check_ranking(&self) -> Result<CheckOutcome> {
        let _cycle = self.ranking_cycle.lock().await;

        let fresh = self.site.fetch_ranking().await.context("fetching ranking")?;
        let previous = self.store.ranking();

        let mut outcome = CheckOutcome {
            kind: NotificationKind::Ranking,
            fetched: fresh.len(),
            changes: 0,
            compared: previous.is_captured(),
            delivery: DeliveryReport::default(),
        };

        if previous.is_captured() && !previous.is_empty() {
            let events = detect_ranking_changes(previous.items(), &fresh);
            outcome.changes = events.len();
            if events.iter().any(|e| e.is_significant()) {
                outcome.delivery = match self.subscriptions.subscribers_for(NotificationKind::Ranking).await {
                    Ok(subs) => self.notifier.notify_ranking(&subs, &events).await,
                    Err(e) => {
                        tracing::warn!(target: "monitor", error = %format!("{e:#}"), "loading ranking subscribers failed");
                        DeliveryReport::default()
                    }
                };
            }
        }

        self.store.replace_ranking(fresh, Utc::now());
        Ok(outcome)
    }

    async fn check_news(&self) -> Result<CheckOutcome> {
        let _cycle = self.news_cycle.lock().await;

        let fresh = self.site.fetch_news().await.context("fetching news")?;
        let previous = self.store.news();

        let mut outcome = CheckOutcome {
            kind: NotificationKind::News,
            fetched: fresh.len(),
            changes: 0,
            compared: previous.is_captured(),
            delivery: DeliveryReport::default(),
        };

        if previous.is_captured() {
            let added = detect_news_changes(previous.items(), &fresh);
            outcome.changes = added.len();
            if !added.is_empty() {
                outcome.delivery = match self.subscriptions.subscribers_for(NotificationKind::News).await {
                    Ok(subs) => self.notifier.notify_news(&subs, &added).await,
                    Err(e) => {
                        tracing::warn!(target: "monitor", error = %format!("{e:#}"), "loading news subscribers failed");
                        DeliveryReport::default()
                    }
                };
            }
        }

        self.store.replace_news(fresh, Utc::now());
        Ok(outcome)
    }

    /// Ranking then news. Failures are logged and reported, never propagated.
    pub async fn check_all(&self) -> CheckReport {
        let ranking = self
            .check(NotificationKind::Ranking)
            .await
            .map_err(|e| format!("{e:#}"));
        let news = self
            .check(NotificationKind::News)
            .await
            .map_err(|e| format!("{e:#}"));
        CheckReport {
            ranking,
            news,
            finished_at: Utc::now(),
        }
    }
}
