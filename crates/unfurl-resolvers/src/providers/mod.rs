//! Provider-specific resolvers. Each pairs a typed URL match with its own
//! namespaced [`PersistentCache`] and a [`ResponseLoader`] talking to the
//! provider's API.
//!
//! [`ResponseLoader`]: unfurl_core::ports::ResponseLoader

pub mod betterttv;
pub mod frankerfacez;
pub mod supinic;
pub mod twitter;
pub mod wikipedia;

use serde::de::DeserializeOwned;
use tracing::debug;
use unfurl_cache::PersistentCache;
use unfurl_core::ports::HttpFetcher;
use unfurl_core::{CacheDuration, Error, Outcome, RequestContext, ResolverResponse, Result};
use url::Url;

/// API replies larger than this are treated as failures.
const MAX_API_RESPONSE: u64 = 1024 * 1024;

/// Reply from a provider API.
#[derive(Debug)]
pub(crate) enum ApiReply<T> {
    Found(T),
    /// The API answered with a non-2xx status.
    Missing(u16),
    /// The body could not be decoded as `T`.
    Malformed(String),
}

/// GET `endpoint` and decode the body as JSON. Transport failures are errors,
/// everything the API actually said is an [`ApiReply`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    fetcher: &dyn HttpFetcher,
    endpoint: &str,
    headers: &[(&str, &str)],
) -> Result<ApiReply<T>> {
    let url = Url::parse(endpoint).map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;
    let response = fetcher.get_with_headers(&url, headers).await?;

    if !response.is_success() {
        debug!(url = %url, status = response.status, "provider API returned non-success status");
        return Ok(ApiReply::Missing(response.status));
    }

    let body = response.body.read(MAX_API_RESPONSE).await?;
    Ok(match serde_json::from_slice(&body) {
        Ok(value) => ApiReply::Found(value),
        Err(e) => ApiReply::Malformed(e.to_string()),
    })
}

/// Response for an API reply that could not be decoded. Never persisted.
pub(crate) fn decode_error(provider: &str, reason: &str) -> (ResolverResponse, CacheDuration) {
    (
        ResolverResponse::error(500, &format!("{provider} API response decode error: {reason}")),
        CacheDuration::NoCache,
    )
}

/// Response for a non-2xx API status. A 404 is the provider's confirmed
/// negative and is cached with the default TTL; any other status is
/// transient and never persisted.
pub(crate) fn api_status(
    provider: &str,
    status: u16,
    not_found: &str,
) -> (ResolverResponse, CacheDuration) {
    if status == 404 {
        return (ResolverResponse::not_found(not_found), CacheDuration::Default);
    }
    (
        ResolverResponse::error(status, &format!("{provider} API error")),
        CacheDuration::NoCache,
    )
}

/// Serve `identity` from a provider cache.
pub(crate) async fn run_cached(
    cache: &PersistentCache,
    identity: &str,
    request: &RequestContext,
) -> Outcome {
    match cache.get(identity, request).await {
        Ok(response) => Outcome::Handled(response),
        Err(e) => Outcome::Failed(e),
    }
}

/// Exact, case-insensitive host match.
pub(crate) fn host_in(url: &Url, hosts: &[&str]) -> bool {
    url.host_str()
        .is_some_and(|host| hosts.iter().any(|h| host.eq_ignore_ascii_case(h)))
}

/// `url`'s host is one of `domains` or a subdomain of one.
pub(crate) fn is_subdomain_of(url: &Url, domains: &[&str]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    domains.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use unfurl_cache::MemoryCacheStore;
    use unfurl_core::loader::JsonLoader;
    use unfurl_core::ports::ResponseLoader;

    pub(crate) fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    /// Provider cache over an in-memory store, returned with the store.
    pub(crate) fn cache_over<L: ResponseLoader + 'static>(
        namespace: &str,
        loader: L,
    ) -> (PersistentCache, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = PersistentCache::new(
            namespace,
            Arc::new(JsonLoader::new(loader)),
            store.clone(),
            Duration::from_secs(3600),
        );
        (cache, store)
    }

    #[test]
    fn test_api_status() {
        let (response, duration) = api_status("FrankerFaceZ", 404, "No emote");
        assert_eq!(response, ResolverResponse::not_found("No emote"));
        assert_eq!(duration, CacheDuration::Default);

        for status in [429, 500, 503] {
            let (response, duration) = api_status("FrankerFaceZ", status, "No emote");
            assert_eq!(response, ResolverResponse::error(status, "FrankerFaceZ API error"));
            assert_eq!(duration, CacheDuration::NoCache);
        }
    }

    #[test]
    fn test_host_matching() {
        assert!(host_in(&url("https://WWW.Example.com/"), &["www.example.com"]));
        assert!(!host_in(&url("https://evil-example.com/"), &["example.com"]));

        assert!(is_subdomain_of(&url("https://mobile.twitter.com/"), &["twitter.com"]));
        assert!(is_subdomain_of(&url("https://x.com/"), &["twitter.com", "x.com"]));
        assert!(!is_subdomain_of(&url("https://nottwitter.com/"), &["twitter.com"]));
    }
}
