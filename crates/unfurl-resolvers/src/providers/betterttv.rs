//! BetterTTV emote pages, e.g. `https://betterttv.com/emotes/566ca06065dbbdab32ec054e`.

use super::{ApiReply, api_status, decode_error, get_json, host_in, run_cached};
use crate::settings::fill;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use unfurl_cache::PersistentCache;
use unfurl_core::loader::JsonLoader;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::{CacheStore, HttpFetcher, ResponseLoader};
use unfurl_core::{CacheDuration, Outcome, RequestContext, Resolver, ResolverResponse, Result};
use url::Url;

pub const NAMESPACE: &str = "betterttv:emote";

const HOSTS: [&str; 2] = ["betterttv.com", "www.betterttv.com"];

static EMOTE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/emotes/([a-f0-9]+)").unwrap());

pub struct EmoteResolver {
    cache: PersistentCache,
}

impl EmoteResolver {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        endpoint: impl Into<String>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        let loader = EmoteLoader {
            fetcher,
            endpoint: endpoint.into(),
        };
        Self {
            cache: PersistentCache::new(NAMESPACE, Arc::new(JsonLoader::new(loader)), store, ttl),
        }
    }
}

#[async_trait]
impl Resolver for EmoteResolver {
    /// Hex emote hash.
    type Match = String;

    fn name(&self) -> &str {
        NAMESPACE
    }

    fn check(&self, url: &Url) -> Option<String> {
        if !host_in(url, &HOSTS) {
            return None;
        }
        EMOTE_PATH
            .captures(url.path())
            .map(|captures| captures[1].to_string())
    }

    async fn run(&self, emote_hash: String, _url: &Url, request: &RequestContext) -> Outcome {
        run_cached(&self.cache, &emote_hash, request).await
    }
}

#[derive(Debug, Deserialize)]
struct Emote {
    code: String,
    /// Global emotes have no owner.
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    display_name: String,
}

struct EmoteLoader {
    fetcher: Arc<dyn HttpFetcher>,
    endpoint: String,
}

#[async_trait]
impl ResponseLoader for EmoteLoader {
    async fn load(
        &self,
        emote_hash: &str,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let endpoint = fill(&self.endpoint, &[("id", emote_hash)]);

        let emote = match get_json::<Emote>(self.fetcher.as_ref(), &endpoint, &[]).await? {
            ApiReply::Found(emote) => emote,
            ApiReply::Missing(status) => {
                return Ok(api_status(
                    "BetterTTV",
                    status,
                    "No BetterTTV emote with this id found",
                ));
            }
            ApiReply::Malformed(reason) => return Ok(decode_error("BetterTTV", &reason)),
        };

        let (kind, uploader) = match &emote.user {
            Some(user) => ("Shared", user.display_name.as_str()),
            None => ("Global", "BetterTTV"),
        };

        let tooltip = format!(
            "<div style=\"text-align: left;\"><b>{}</b><br><b>{kind} BetterTTV Emote</b><br><b>By:</b> {}</div>",
            escape_html(&emote.code),
            escape_html(uploader),
        );

        Ok((
            ResolverResponse::tooltip(&tooltip)
                .with_thumbnail(format!("https://cdn.betterttv.net/emote/{emote_hash}/3x")),
            CacheDuration::Default,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ReqwestFetcher;
    use crate::guard::UrlGuard;
    use crate::providers::tests::{cache_over, url};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_check() {
        let resolver = EmoteResolver::new(
            Arc::new(ReqwestFetcher::new(Duration::from_secs(1), UrlGuard::default()).unwrap()),
            "http://unused/{id}",
            Arc::new(unfurl_cache::MemoryCacheStore::new()),
            Duration::from_secs(60),
        );

        assert_eq!(
            resolver.check(&url("https://betterttv.com/emotes/566ca06065dbbdab32ec054e")),
            Some("566ca06065dbbdab32ec054e".to_string())
        );
        assert_eq!(
            resolver.check(&url("https://www.betterttv.com/emotes/566ca06065dbbdab32ec054e")),
            Some("566ca06065dbbdab32ec054e".to_string())
        );
        assert_eq!(resolver.check(&url("https://betterttv.com/users/566ca04265dbbdab32ec054a")), None);
        assert_eq!(resolver.check(&url("https://example.com/emotes/566ca06065dbbdab32ec054e")), None);
    }

    #[tokio::test]
    async fn test_shared_and_global_emotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/emotes/aaa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "aaa",
                "code": "<3",
                "user": {"id": "1", "name": "nymn", "displayName": "NymN"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/3/emotes/bbb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "bbb",
                "code": "FeelsBadMan"
            })))
            .mount(&server)
            .await;

        let loader = EmoteLoader {
            fetcher: Arc::new(
                ReqwestFetcher::new(Duration::from_secs(5), UrlGuard::default()).unwrap(),
            ),
            endpoint: format!("{}/3/emotes/{{id}}", server.uri()),
        };
        let (cache, _) = cache_over(NAMESPACE, loader);

        let shared: ResolverResponse = serde_json::from_slice(
            &cache.get("aaa", &RequestContext::default()).await.unwrap().payload,
        )
        .unwrap();
        assert_eq!(
            shared.thumbnail.as_deref(),
            Some("https://cdn.betterttv.net/emote/aaa/3x")
        );
        let tooltip = shared.tooltip.unwrap();
        assert!(tooltip.contains("%3Cb%3E&lt%3B3%3C%2Fb%3E"));
        assert!(tooltip.contains("Shared%20BetterTTV%20Emote"));
        assert!(tooltip.contains("NymN"));

        let global: ResolverResponse = serde_json::from_slice(
            &cache.get("bbb", &RequestContext::default()).await.unwrap().payload,
        )
        .unwrap();
        assert!(global.tooltip.unwrap().contains("Global%20BetterTTV%20Emote"));
    }

    #[tokio::test]
    async fn test_missing_emote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = EmoteLoader {
            fetcher: Arc::new(
                ReqwestFetcher::new(Duration::from_secs(5), UrlGuard::default()).unwrap(),
            ),
            endpoint: format!("{}/3/emotes/{{id}}", server.uri()),
        };
        let (response, duration) = loader
            .load("abc", &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(
            response,
            ResolverResponse::not_found("No BetterTTV emote with this id found")
        );
        assert_eq!(duration, CacheDuration::Default);
    }

    #[tokio::test]
    async fn test_unavailable_upstream_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let loader = EmoteLoader {
            fetcher: Arc::new(
                ReqwestFetcher::new(Duration::from_secs(5), UrlGuard::default()).unwrap(),
            ),
            endpoint: format!("{}/3/emotes/{{id}}", server.uri()),
        };
        let (cache, store) = cache_over(NAMESPACE, loader);

        let body: ResolverResponse = serde_json::from_slice(
            &cache.get("aaa", &RequestContext::default()).await.unwrap().payload,
        )
        .unwrap();
        assert_eq!(body, ResolverResponse::error(503, "BetterTTV API error"));
        assert!(store.get("betterttv:emote:aaa").await.unwrap().is_none());
    }
}
