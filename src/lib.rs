// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// Scraping
pub mod extract;
pub mod paginator;
pub mod site;

// Change detection, notifications & background jobs
pub mod change_detector;
pub mod monitor;
pub mod notify;
pub mod scheduler;
pub mod snapshot;
pub mod subscriptions;

use std::sync::Arc;

use anyhow::Result;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::types::{ChangeEvent, NewsItem, NotificationKind, RankEntry, Subscription};

use crate::monitor::Monitor;
use crate::notify::{ExpoPushClient, Notifier, PushSender};
use crate::site::Site;
use crate::snapshot::SnapshotStore;
use crate::subscriptions::{JsonFileSubscriptionStore, MemorySubscriptionStore, SubscriptionStore};

/// Wire the production collaborators from `cfg`: HTTP page source, Expo push,
/// file-backed subscriptions (in-memory when `subscriptions_path` is empty).
pub async fn build_state(cfg: &AppConfig) -> Result<AppState> {
    let site = Arc::new(Site::from_config(cfg)?);
    let push: Arc<dyn PushSender> = Arc::new(ExpoPushClient::from_config(cfg));

    let subscriptions: Arc<dyn SubscriptionStore> = if cfg.subscriptions_path.is_empty() {
        Arc::new(MemorySubscriptionStore::new())
    } else {
        Arc::new(JsonFileSubscriptionStore::open(&cfg.subscriptions_path).await?)
    };

    let helpers = config::load_helpers(std::path::Path::new(&cfg.helpers_path))?;

    Ok(assemble(site, subscriptions, push, helpers))
}

/// Build the state around already-constructed collaborators.
pub fn assemble(
    site: Arc<Site>,
    subscriptions: Arc<dyn SubscriptionStore>,
    push: Arc<dyn PushSender>,
    helpers: Vec<types::HelperContact>,
) -> AppState {
    let store = Arc::new(SnapshotStore::new());
    let monitor = Arc::new(Monitor::new(
        site.clone(),
        store,
        subscriptions.clone(),
        Notifier::new(push.clone()),
    ));
    AppState {
        site,
        monitor,
        subscriptions,
        push,
        helpers: Arc::new(helpers),
    }
}
