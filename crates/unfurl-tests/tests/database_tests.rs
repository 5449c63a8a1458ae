//! Storage integration tests.
//!
//! Run with: `cargo test -p unfurl-tests --test database_tests --features integration -- --ignored`

#![cfg(feature = "integration")]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use unfurl_cache::{DependentCache, PersistentCache};
use unfurl_core::ports::{CacheStore, Dependent, GeneratedStore, HealthCheck, Loader};
use unfurl_core::{CacheDuration, CacheEntry, Expiry, GeneratedValue, Loaded, RequestContext, Result};
use unfurl_tests::TestContext;

fn entry(key: &str, payload: &str, expires: Expiry) -> CacheEntry {
    CacheEntry {
        key: key.to_string(),
        payload: payload.as_bytes().to_vec(),
        status_code: 200,
        content_type: "application/json".to_string(),
        expires,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_cache_upsert_replaces_row() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    let store = ctx.cache_store();

    assert!(store.get("default:link:a").await.unwrap().is_none());

    store
        .upsert(&entry("default:link:a", "first", Expiry::Never))
        .await
        .unwrap();
    let mut replacement = entry(
        "default:link:a",
        "second",
        Expiry::At(Utc::now() + ChronoDuration::minutes(10)),
    );
    replacement.status_code = 404;
    replacement.content_type = "image/png".to_string();
    store.upsert(&replacement).await.unwrap();

    let found = store.get("default:link:a").await.unwrap().unwrap();
    assert_eq!(found.payload, b"second".to_vec());
    assert_eq!(found.status_code, 404);
    assert_eq!(found.content_type, "image/png");
    assert!(matches!(found.expires, Expiry::At(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_purge_keeps_live_and_permanent_rows() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    let store = ctx.cache_store();
    let now = Utc::now();

    store
        .upsert(&entry("k:expired", "x", Expiry::At(now - ChronoDuration::seconds(30))))
        .await
        .unwrap();
    store
        .upsert(&entry("k:live", "x", Expiry::At(now + ChronoDuration::seconds(30))))
        .await
        .unwrap();
    store
        .upsert(&entry("k:permanent", "x", Expiry::Never))
        .await
        .unwrap();

    assert_eq!(store.purge_expired(now).await.unwrap(), vec!["k:expired".to_string()]);
    assert!(store.get("k:expired").await.unwrap().is_none());
    assert!(store.get("k:live").await.unwrap().is_some());
    assert!(store.get("k:permanent").await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_generated_values_removed_by_parent() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    let store = ctx.generated_store();

    for (key, parent) in [
        ("default:dependent:a", "twitter:tweet:1"),
        ("default:dependent:b", "twitter:tweet:1"),
        ("default:dependent:c", "twitter:tweet:2"),
    ] {
        store
            .upsert(&GeneratedValue {
                key: key.to_string(),
                parent_key: parent.to_string(),
                payload: vec![1, 2, 3],
                content_type: "image/png".to_string(),
            })
            .await
            .unwrap();
    }

    let mut removed = store.remove_by_parent("twitter:tweet:1").await.unwrap();
    removed.sort();
    assert_eq!(removed, vec!["default:dependent:a", "default:dependent:b"]);
    assert!(store.get("default:dependent:a").await.unwrap().is_none());

    let kept = store.get("default:dependent:c").await.unwrap().unwrap();
    assert_eq!(kept.parent_key, "twitter:tweet:2");
    assert_eq!(kept.payload, vec![1, 2, 3]);
}

struct CountingLoader {
    calls: AtomicUsize,
    duration: CacheDuration,
}

#[async_trait]
impl Loader for CountingLoader {
    async fn load(&self, identity: &str, _request: &RequestContext) -> Result<Loaded> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Loaded::new(identity.as_bytes().to_vec(), self.duration)
            .with_status(202)
            .with_content_type("text/plain"))
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_persistent_cache_survives_restart() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    let request = RequestContext::default();

    let loader = Arc::new(CountingLoader {
        calls: AtomicUsize::new(0),
        duration: CacheDuration::Default,
    });
    let first = PersistentCache::new(
        "test:counting",
        loader.clone(),
        ctx.cache_store(),
        Duration::from_secs(600),
    );
    let response = first.get("hello", &request).await.unwrap();
    assert_eq!(response.payload, b"hello".to_vec());
    assert_eq!(response.status_code, 202);

    // A new cache instance over the same table sees the stored row.
    let second = PersistentCache::new(
        "test:counting",
        loader.clone(),
        ctx.cache_store(),
        Duration::from_secs(600),
    );
    let cached = second.get("hello", &request).await.unwrap();
    assert_eq!(cached.content_type, "text/plain");
    assert_eq!(cached.status_code, 202);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.stats().hits, 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_reload_discards_generated_values() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    let request = RequestContext::default();
    let dependents = Arc::new(DependentCache::new(ctx.generated_store()));

    let loader = Arc::new(CountingLoader {
        calls: AtomicUsize::new(0),
        duration: CacheDuration::NoCache,
    });
    let mut source = PersistentCache::new(
        "twitter:tweet",
        loader,
        ctx.cache_store(),
        Duration::from_secs(600),
    );
    source.register_dependent(dependents.clone());

    // An expired source row forces a reload on the next read.
    ctx.cache_store()
        .upsert(&entry(
            "twitter:tweet:1",
            "old",
            Expiry::At(Utc::now() - ChronoDuration::seconds(1)),
        ))
        .await
        .unwrap();
    dependents
        .insert("twitter:tweet:1", "tweet-1", vec![9, 9], "image/png")
        .await
        .unwrap();
    assert!(dependents.get("tweet-1").await.unwrap().is_some());

    source.get("1", &request).await.unwrap();
    assert!(dependents.get("tweet-1").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_purged_rows_release_generated_values() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    let cache_store = ctx.cache_store();
    let collages = DependentCache::new(ctx.generated_store());
    let now = Utc::now();

    cache_store
        .upsert(&entry(
            "twitter:tweet:7",
            "old",
            Expiry::At(now - ChronoDuration::seconds(30)),
        ))
        .await
        .unwrap();
    cache_store
        .upsert(&entry("twitter:tweet:8", "live", Expiry::Never))
        .await
        .unwrap();
    collages
        .insert("twitter:tweet:7", "tweet-7", vec![7], "image/png")
        .await
        .unwrap();
    collages
        .insert("twitter:tweet:8", "tweet-8", vec![8], "image/png")
        .await
        .unwrap();

    let removed = cache_store.purge_expired(now).await.unwrap();
    assert_eq!(removed, vec!["twitter:tweet:7".to_string()]);
    for key in &removed {
        collages.source_invalidated(key).await.unwrap();
    }

    assert!(collages.get("tweet-7").await.unwrap().is_none());
    assert!(collages.get("tweet-8").await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_database_ping() {
    let ctx = TestContext::new().await.expect("Failed to create context");
    ctx.db.ping().await.expect("ping failed");
    assert!(ctx.db_url().starts_with("postgres://"));
}
