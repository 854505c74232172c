use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use sf_core::{ApplyReport, Item, ItemStorage, Result, UpsertPolicy};
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
pub struct MemoryStore {
    items: BTreeMap<String, Item>,
}

impl MemoryStore {
    pub fn upsert(&mut self, item: &Item, policy: UpsertPolicy) -> bool {
        match policy {
            UpsertPolicy::SkipKnown if self.items.contains_key(&item.url) => false,
            _ => {
                self.items.insert(item.url.clone(), item.clone());
                true
            }
        }
    }

    pub fn prune(&mut self, retention: usize) -> u64 {
        let keep: HashSet<String> = self
            .latest(retention)
            .into_iter()
            .map(|item| item.url)
            .collect();
        let before = self.items.len();
        self.items.retain(|url, _| keep.contains(url));
        (before - self.items.len()) as u64
    }

    pub fn latest(&self, limit: usize) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.values().cloned().collect();
        items.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.url.cmp(&b.url))
        });
        items.truncate(limit);
        items
    }
}

/// Volatile store, used for tests and `--storage memory` runs.
#[derive(Default)]
pub struct InMemoryStorage {
    store: RwLock<MemoryStore>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_data_dir: &Path, _site_id: &str) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ItemStorage for InMemoryStorage {
    async fn known_urls(&self) -> Result<HashSet<String>> {
        Ok(self.store.read().await.items.keys().cloned().collect())
    }

    async fn upsert(&self, item: &Item, policy: UpsertPolicy) -> Result<bool> {
        Ok(self.store.write().await.upsert(item, policy))
    }

    async fn prune(&self, retention: usize) -> Result<u64> {
        Ok(self.store.write().await.prune(retention))
    }

    async fn apply(
        &self,
        items: &[Item],
        policy: UpsertPolicy,
        retention: usize,
    ) -> Result<ApplyReport> {
        let mut store = self.store.write().await;
        let mut report = ApplyReport::default();
        for item in items {
            if store.upsert(item, policy) {
                report.written += 1;
            } else {
                report.unchanged += 1;
            }
        }
        report.pruned = store.prune(retention);
        Ok(report)
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Item>> {
        Ok(self.store.read().await.latest(limit))
    }
}
