//! Get-or-load cache backed by a durable store.

use crate::keys::PrefixKeyProvider;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use unfurl_core::ports::{CacheStore, Dependent, KeyProvider, Loader};
use unfurl_core::{CacheEntry, RequestContext, Response, Result};

/// Cache keyed by semantic identity.
///
/// On a live hit the stored entry is returned verbatim. On a miss the loader
/// runs and its result is persisted according to the returned
/// [`CacheDuration`](unfurl_core::CacheDuration). Concurrent misses for the
/// same key may each run the loader; the store's upsert makes the last write
/// win.
pub struct PersistentCache {
    keys: PrefixKeyProvider,
    loader: Arc<dyn Loader>,
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
    dependents: Vec<Arc<dyn Dependent>>,
    stats: CacheStats,
}

impl PersistentCache {
    pub fn new(
        namespace: impl Into<String>,
        loader: Arc<dyn Loader>,
        store: Arc<dyn CacheStore>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            keys: PrefixKeyProvider::new(namespace),
            loader,
            store,
            default_ttl,
            dependents: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    /// Notify `dependent` whenever an expired entry of this cache is
    /// reloaded. The dependency graph must be acyclic.
    pub fn register_dependent(&mut self, dependent: Arc<dyn Dependent>) {
        self.dependents.push(dependent);
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    pub fn key(&self, identity: &str) -> String {
        self.keys.key(identity)
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn get(&self, identity: &str, request: &RequestContext) -> Result<Response> {
        let key = self.keys.key(identity);
        let now = Utc::now();

        let stale = match self.store.get(&key).await {
            Ok(Some(entry)) if entry.is_live(now) => {
                self.stats.record_hit();
                debug!(key = %key, "cache hit");
                return Ok(entry.to_response());
            }
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                self.stats.record_storage_failure();
                warn!(key = %key, request_id = request.request_id.as_deref(), error = %e, "cache read failed, treating as miss");
                false
            }
        };

        self.stats.record_miss();
        debug!(key = %key, stale, "cache miss");

        if stale {
            self.notify_dependents(&key, request).await;
        }

        let loaded = match self.loader.load(identity, request).await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.stats.record_load_failure();
                warn!(key = %key, request_id = request.request_id.as_deref(), error = %e, "loader failed");
                return Err(e);
            }
        };
        let response = loaded.to_response();

        let Some(expires) = loaded.duration.expiry(self.default_ttl, now) else {
            debug!(key = %key, "loader result not persisted");
            return Ok(response);
        };

        let entry = CacheEntry {
            key,
            payload: response.payload.clone(),
            status_code: response.status_code,
            content_type: response.content_type.clone(),
            expires,
        };

        match self.store.upsert(&entry).await {
            Ok(()) => self.stats.record_store(),
            Err(e) => {
                self.stats.record_storage_failure();
                error!(key = %entry.key, request_id = request.request_id.as_deref(), error = %e, "failed to persist cache entry");
            }
        }

        Ok(response)
    }

    async fn notify_dependents(&self, key: &str, request: &RequestContext) {
        for dependent in &self.dependents {
            if let Err(e) = dependent.source_invalidated(key).await {
                warn!(key = %key, request_id = request.request_id.as_deref(), error = %e, "dependent invalidation failed");
            }
        }
    }
}
