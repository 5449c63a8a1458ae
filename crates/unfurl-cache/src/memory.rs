//! In-process stores for local development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use unfurl_core::ports::{CacheStore, GeneratedStore};
use unfurl_core::{CacheEntry, Expiry, GeneratedValue, Result};

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut entries = self.entries.write().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| matches!(entry.expires, Expiry::At(at) if at < now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        Ok(expired)
    }
}

#[derive(Debug, Default)]
pub struct MemoryGeneratedStore {
    values: RwLock<HashMap<String, GeneratedValue>>,
}

impl MemoryGeneratedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }
}

#[async_trait]
impl GeneratedStore for MemoryGeneratedStore {
    async fn get(&self, key: &str) -> Result<Option<GeneratedValue>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn upsert(&self, value: &GeneratedValue) -> Result<()> {
        self.values
            .write()
            .await
            .insert(value.key.clone(), value.clone());
        Ok(())
    }

    async fn remove_by_parent(&self, parent_key: &str) -> Result<Vec<String>> {
        let mut values = self.values.write().await;
        let removed: Vec<String> = values
            .values()
            .filter(|value| value.parent_key == parent_key)
            .map(|value| value.key.clone())
            .collect();
        for key in &removed {
            values.remove(key);
        }
        Ok(removed)
    }
}
