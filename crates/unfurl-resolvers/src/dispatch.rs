//! Dispatch engine: decides which resolver answers a link request.

use crate::guard::UrlGuard;
use crate::metrics::{CacheStatsReport, DEFAULT_RESOLVER, ResolverHits};
use crate::registry::ResolverRegistry;
use std::sync::Arc;
use tracing::{debug, error, warn};
use unfurl_cache::{DependentCache, PersistentCache};
use unfurl_core::{GeneratedValue, Outcome, RequestContext, ResolverResponse, Response, Result};
use url::Url;

/// Entry point for `/link_resolver`, `/thumbnail` and `/generated`.
///
/// Every call to [`resolve`](Self::resolve) yields exactly one response:
/// malformed or forbidden input is answered before any resolver runs, the
/// first matching custom resolver commits the request, and anything it does
/// not handle goes to the default link cache.
pub struct LinkResolver {
    registry: Arc<ResolverRegistry>,
    guard: UrlGuard,
    link_cache: Arc<PersistentCache>,
    thumbnail_cache: Arc<PersistentCache>,
    generated_cache: Arc<DependentCache>,
    hits: ResolverHits,
}

impl LinkResolver {
    pub fn new(
        registry: Arc<ResolverRegistry>,
        guard: UrlGuard,
        link_cache: Arc<PersistentCache>,
        thumbnail_cache: Arc<PersistentCache>,
        generated_cache: Arc<DependentCache>,
    ) -> Self {
        let hits = ResolverHits::new(registry.names());
        Self {
            registry,
            guard,
            link_cache,
            thumbnail_cache,
            generated_cache,
            hits,
        }
    }

    pub fn hits(&self) -> &ResolverHits {
        &self.hits
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Counters of the link and thumbnail caches, by namespace.
    pub fn cache_stats(&self) -> CacheStatsReport {
        [&self.link_cache, &self.thumbnail_cache]
            .into_iter()
            .map(|cache| (cache.namespace().to_string(), cache.stats()))
            .collect()
    }

    /// Store of generated values, to be told about entries removed outside
    /// the caches.
    pub fn generated_cache(&self) -> Arc<DependentCache> {
        self.generated_cache.clone()
    }

    /// Parse and vet a decoded `url` argument.
    fn target(&self, url_argument: Option<&str>) -> std::result::Result<Url, ResolverResponse> {
        let raw = url_argument
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(ResolverResponse::invalid_url)?;

        let url = match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                debug!(url = %raw, "rejecting invalid url");
                return Err(ResolverResponse::invalid_url());
            }
        };

        if !self.guard.allows(&url) {
            debug!(url = %url, "rejecting forbidden url");
            return Err(ResolverResponse::forbidden_url());
        }

        Ok(url)
    }

    pub async fn resolve(&self, url_argument: Option<&str>, request: &RequestContext) -> Response {
        let url = match self.target(url_argument) {
            Ok(url) => url,
            Err(rejection) => return rejection.to_response(),
        };

        if let Some((name, outcome)) = self.registry.dispatch(&url, request).await {
            match outcome {
                Outcome::Handled(response) => {
                    self.hits.record(name);
                    return response;
                }
                Outcome::NotApplicable => {
                    debug!(resolver = name, url = %url, request_id = request.request_id.as_deref(), "resolver declined, falling back to default");
                }
                Outcome::Failed(e) => {
                    error!(resolver = name, url = %url, request_id = request.request_id.as_deref(), error = %e, "error in custom resolver, falling back to default");
                }
            }
        }

        self.hits.record(DEFAULT_RESOLVER);

        match self.link_cache.get(url.as_str(), request).await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %url, request_id = request.request_id.as_deref(), error = %e, "error in default resolver");
                ResolverResponse::internal_error().to_response()
            }
        }
    }

    pub async fn thumbnail(&self, url_argument: Option<&str>, request: &RequestContext) -> Response {
        let url = match self.target(url_argument) {
            Ok(url) => url,
            Err(rejection) => return rejection.to_response(),
        };

        match self.thumbnail_cache.get(url.as_str(), request).await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %url, request_id = request.request_id.as_deref(), error = %e, "error in thumbnail request");
                ResolverResponse::thumbnail_failed().to_response()
            }
        }
    }

    /// `Ok(None)` when nothing was generated under `token`.
    pub async fn generated(&self, token: &str) -> Result<Option<GeneratedValue>> {
        let value = self.generated_cache.get(token).await?;
        if value.is_none() {
            warn!(token = %token, "requested generated value does not exist");
        }
        Ok(value)
    }
}
