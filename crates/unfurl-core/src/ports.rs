//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the cache engine, the resolvers
//! and external adapters (storage, outbound HTTP).

use crate::cache::{CacheDuration, CacheEntry, GeneratedValue, Loaded};
use crate::resolver::RequestContext;
use crate::response::ResolverResponse;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

/// Maps a semantic identity to a namespaced storage key.
pub trait KeyProvider: Send + Sync {
    fn namespace(&self) -> &str;

    /// `"<namespace>:<identity>"`.
    fn key(&self, identity: &str) -> String {
        format!("{}:{}", self.namespace(), identity)
    }
}

/// Computes a value on cache miss.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, identity: &str, request: &RequestContext) -> Result<Loaded>;
}

/// Loader producing a structured [`ResolverResponse`]. Adapted to [`Loader`]
/// by [`JsonLoader`](crate::loader::JsonLoader).
#[async_trait]
pub trait ResponseLoader: Send + Sync {
    async fn load(
        &self,
        identity: &str,
        request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)>;
}

/// Durable storage for cache entries.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry, expired or not. Liveness is decided by the caller.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert or fully replace the entry for `entry.key`.
    async fn upsert(&self, entry: &CacheEntry) -> Result<()>;

    /// Delete entries whose expiry is before `now`, returning their keys.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}

/// Storage for generated artifacts, keyed independently of URLs.
#[async_trait]
pub trait GeneratedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<GeneratedValue>>;

    async fn upsert(&self, value: &GeneratedValue) -> Result<()>;

    /// Remove every value derived from `parent_key`, returning their keys.
    async fn remove_by_parent(&self, parent_key: &str) -> Result<Vec<String>>;
}

/// Receives invalidation signals from a source cache.
#[async_trait]
pub trait Dependent: Send + Sync {
    async fn source_invalidated(&self, source_key: &str) -> Result<()>;
}

/// Response from an outbound GET, with the body not yet read.
pub struct FetchResponse {
    pub status: u16,
    pub final_url: Url,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: Box<dyn FetchBody>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Content type without parameters, lower-cased.
    pub fn mime_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("final_url", &self.final_url.as_str())
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Lazily read response body.
#[async_trait]
pub trait FetchBody: Send {
    /// Read the whole body, failing with [`Error::TooLarge`](crate::Error::TooLarge)
    /// once more than `limit` bytes arrive.
    async fn read(self: Box<Self>, limit: u64) -> Result<Vec<u8>>;
}

/// Outbound HTTP client.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET with extra request headers.
    async fn get_with_headers(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
    ) -> Result<FetchResponse>;

    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        self.get_with_headers(url, &[]).await
    }
}

/// Readiness check for the backing storage.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
