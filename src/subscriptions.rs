// src/subscriptions.rs
//! Keyed subscription storage (token → Subscription).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;

use crate::types::{NotificationKind, Subscription};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or replace by token.
    async fn upsert(&self, sub: Subscription) -> Result<()>;
    /// Returns whether a subscription was removed.
    async fn remove(&self, token: &str) -> Result<bool>;
    async fn subscribers_for(&self, kind: NotificationKind) -> Result<Vec<Subscription>>;
    async fn count(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    inner: RwLock<BTreeMap<String, Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries(entries: BTreeMap<String, Subscription>) -> Self {
        Self {
            inner: RwLock::new(entries),
        }
    }

    fn snapshot(&self) -> BTreeMap<String, Subscription> {
        self.inner.read().clone()
    }

    fn contains(&self, token: &str) -> bool {
        self.inner.read().contains_key(token)
    }

    fn replace(&self, entries: BTreeMap<String, Subscription>) {
        *self.inner.write() = entries;
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn upsert(&self, sub: Subscription) -> Result<()> {
        self.inner.write().insert(sub.token.clone(), sub);
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<bool> {
        Ok(self.inner.write().remove(token).is_some())
    }

    async fn subscribers_for(&self, kind: NotificationKind) -> Result<Vec<Subscription>> {
        Ok(self
            .inner
            .read()
            .values()
            .filter(|s| s.wants(kind))
            .cloned()
            .collect())
    }

    async fn count(&self) -> usize {
        self.inner.read().len()
    }
}

/// Memory store mirrored to a JSON file. Changes become visible only once written.
pub struct JsonFileSubscriptionStore {
    path: PathBuf,
    mem: MemorySubscriptionStore,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileSubscriptionStore {
    /// Open `path`, loading existing subscriptions. A missing file starts empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path).await {
            Ok(s) => {
                let list: Vec<Subscription> = serde_json::from_str(&s)
                    .with_context(|| format!("parsing subscriptions {}", path.display()))?;
                list.into_iter().map(|s| (s.token.clone(), s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading subscriptions {}", path.display()))
            }
        };
        tracing::info!(target: "subscriptions", path = %path.display(), count = entries.len(), "subscriptions loaded");
        Ok(Self {
            path,
            mem: MemorySubscriptionStore::with_entries(entries),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Apply `change` to a copy of the current map, write the copy to disk and
    /// only then make it live. A failed write leaves memory and disk as they were.
    async fn commit<R>(&self, change: impl FnOnce(&mut BTreeMap<String, Subscription>) -> R) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.mem.snapshot();
        let out = change(&mut next);
        self.persist(&next).await?;
        self.mem.replace(next);
        Ok(out)
    }

    async fn persist(&self, entries: &BTreeMap<String, Subscription>) -> Result<()> {
        let list: Vec<&Subscription> = entries.values().collect();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&list)?)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for JsonFileSubscriptionStore {
    async fn upsert(&self, sub: Subscription) -> Result<()> {
        self.commit(|entries| {
            entries.insert(sub.token.clone(), sub);
        })
        .await
    }

    async fn remove(&self, token: &str) -> Result<bool> {
        if !self.mem.contains(token) {
            return Ok(false);
        }
        self.commit(|entries| entries.remove(token).is_some()).await
    }

    async fn subscribers_for(&self, kind: NotificationKind) -> Result<Vec<Subscription>> {
        self.mem.subscribers_for(kind).await
    }

    async fn count(&self) -> usize {
        self.mem.count().await
    }
}
