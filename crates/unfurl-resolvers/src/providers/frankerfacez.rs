//! FrankerFaceZ emote pages, e.g. `https://www.frankerfacez.com/emoticon/297734-pajaSx`.

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

pub const NAMESPACE: &str = "frankerfacez:emote";

const HOSTS: [&str; 2] = ["frankerfacez.com", "www.frankerfacez.com"];

static EMOTE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/emoticon/([0-9]+)(?:-(.+))?").unwrap());

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
    /// Numeric emote id.
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

    async fn run(&self, emote_id: String, _url: &Url, request: &RequestContext) -> Outcome {
        run_cached(&self.cache, &emote_id, request).await
    }
}

#[derive(Debug, Deserialize)]
struct EmoteEnvelope {
    emote: Emote,
}

#[derive(Debug, Deserialize)]
struct Emote {
    name: String,
    owner: Owner,
    /// Present (an object of sized URLs) only for animated emotes.
    #[serde(default)]
    animated: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Owner {
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
        emote_id: &str,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let endpoint = fill(&self.endpoint, &[("id", emote_id)]);

        let emote = match get_json::<EmoteEnvelope>(self.fetcher.as_ref(), &endpoint, &[]).await? {
            ApiReply::Found(envelope) => envelope.emote,
            ApiReply::Missing(status) => {
                return Ok(api_status(
                    "FrankerFaceZ",
                    status,
                    "No FrankerFaceZ emote with this id found",
                ));
            }
            ApiReply::Malformed(reason) => return Ok(decode_error("FrankerFaceZ", &reason)),
        };

        let thumbnail = match emote.animated {
            Some(serde_json::Value::Object(_)) => {
                format!("https://cdn.frankerfacez.com/emoticon/{emote_id}/animated/4")
            }
            _ => format!("https://cdn.frankerfacez.com/emoticon/{emote_id}/4"),
        };

        let tooltip = format!(
            "<div style=\"text-align: left;\">\n<b>{}</b><br>\n<b>FrankerFaceZ Emote</b><br>\n<b>By:</b> {}</div>",
            escape_html(&emote.name),
            escape_html(&emote.owner.display_name),
        );

        Ok((
            ResolverResponse::tooltip(&tooltip).with_thumbnail(thumbnail),
            CacheDuration::Default,
        ))
    }
}
