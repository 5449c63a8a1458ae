//! Periodic removal of expired cache rows.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};
use unfurl_core::Result;
use unfurl_core::ports::{CacheStore, Dependent};

/// Delete expired entries every `period`, starting one period from now.
/// Values derived from a removed entry are discarded through `dependents`.
pub fn spawn(
    store: Arc<dyn CacheStore>,
    dependents: Vec<Arc<dyn Dependent>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sweep(store.as_ref(), &dependents, Utc::now()).await {
                Ok(0) => debug!("no expired cache entries"),
                Ok(removed) => info!(removed, "purged expired cache entries"),
                Err(e) => error!(error = %e, "failed to purge expired cache entries"),
            }
        }
    })
}

async fn sweep(
    store: &dyn CacheStore,
    dependents: &[Arc<dyn Dependent>],
    now: DateTime<Utc>,
) -> Result<usize> {
    let removed = store.purge_expired(now).await?;
    for key in &removed {
        for dependent in dependents {
            if let Err(e) = dependent.source_invalidated(key).await {
                warn!(key = %key, error = %e, "dependent invalidation failed");
            }
        }
    }
    Ok(removed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use unfurl_cache::{DependentCache, MemoryCacheStore, MemoryGeneratedStore};
    use unfurl_core::{CacheEntry, Expiry};

    fn entry(key: &str, expires: Expiry) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            payload: b"{}".to_vec(),
            status_code: 200,
            content_type: "application/json".to_string(),
            expires,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_purges_expired_entries() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .upsert(&entry(
                "default:link:https://old.example/",
                Expiry::At(Utc::now() - chrono::Duration::seconds(5)),
            ))
            .await
            .unwrap();
        store
            .upsert(&entry("default:link:https://kept.example/", Expiry::Never))
            .await
            .unwrap();

        let handle = spawn(store.clone(), Vec::new(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        handle.abort();

        assert_eq!(store.len().await, 1);
        assert!(
            store
                .get("default:link:https://kept.example/")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_sweep_discards_values_derived_from_removed_entries() {
        let now = Utc::now();
        let store = MemoryCacheStore::new();
        store
            .upsert(&entry(
                "twitter:tweet:1",
                Expiry::At(now - chrono::Duration::seconds(5)),
            ))
            .await
            .unwrap();
        store
            .upsert(&entry("twitter:tweet:2", Expiry::Never))
            .await
            .unwrap();

        let collages = Arc::new(DependentCache::new(Arc::new(MemoryGeneratedStore::new())));
        collages
            .insert("twitter:tweet:1", "tweet-1", vec![1], "image/png")
            .await
            .unwrap();
        collages
            .insert("twitter:tweet:2", "tweet-2", vec![2], "image/png")
            .await
            .unwrap();

        let dependents: Vec<Arc<dyn Dependent>> = vec![collages.clone()];
        assert_eq!(sweep(&store, &dependents, now).await.unwrap(), 1);

        assert!(collages.get("tweet-1").await.unwrap().is_none());
        assert!(collages.get("tweet-2").await.unwrap().is_some());
    }
}
