//! Wikipedia articles, e.g. `https://en.wikipedia.org/wiki/Rust_(programming_language)`.

use super::{ApiReply, api_status, decode_error, get_json, run_cached};
use crate::humanize;
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
use unfurl_core::{
    CacheDuration, Error, Outcome, RequestContext, Resolver, ResolverResponse, Result,
};
use url::Url;

pub const NAMESPACE: &str = "wikipedia:article";

static LOCALE_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z]+)\.(?:m\.)?wikipedia\.org$").unwrap());
static TITLE_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/wiki/(.+)").unwrap());

/// Article addressed by locale and (still percent-encoded) title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleId {
    pub locale: String,
    pub title: String,
}

impl ArticleId {
    /// Cache identity, `<locale>:<title>`.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.locale, self.title)
    }

    fn from_identity(identity: &str) -> Option<Self> {
        let (locale, title) = identity.split_once(':')?;
        Some(Self {
            locale: locale.to_string(),
            title: title.to_string(),
        })
    }
}

pub struct ArticleResolver {
    cache: PersistentCache,
}

impl ArticleResolver {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        endpoint: impl Into<String>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        let loader = ArticleLoader {
            fetcher,
            endpoint: endpoint.into(),
        };
        Self {
            cache: PersistentCache::new(NAMESPACE, Arc::new(JsonLoader::new(loader)), store, ttl),
        }
    }
}

#[async_trait]
impl Resolver for ArticleResolver {
    type Match = ArticleId;

    fn name(&self) -> &str {
        NAMESPACE
    }

    fn check(&self, url: &Url) -> Option<ArticleId> {
        let locale = LOCALE_HOST.captures(url.host_str()?)?[1].to_ascii_lowercase();
        let title = TITLE_PATH.captures(url.path())?[1].to_string();
        Some(ArticleId { locale, title })
    }

    async fn run(&self, article: ArticleId, _url: &Url, request: &RequestContext) -> Outcome {
        run_cached(&self.cache, &article.identity(), request).await
    }
}

#[derive(Debug, Deserialize)]
struct Summary {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    thumbnail: Option<SummaryThumbnail>,
}

#[derive(Debug, Deserialize)]
struct SummaryThumbnail {
    source: String,
}

struct ArticleLoader {
    fetcher: Arc<dyn HttpFetcher>,
    endpoint: String,
}

#[async_trait]
impl ResponseLoader for ArticleLoader {
    async fn load(
        &self,
        identity: &str,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let article = ArticleId::from_identity(identity)
            .ok_or_else(|| Error::InvalidKey(format!("not a wikipedia identity: {identity}")))?;
        let endpoint = fill(
            &self.endpoint,
            &[("locale", &article.locale), ("title", &article.title)],
        );

        let summary = match get_json::<Summary>(self.fetcher.as_ref(), &endpoint, &[]).await? {
            ApiReply::Found(summary) => summary,
            ApiReply::Missing(status) => {
                return Ok(api_status(
                    "Wikipedia",
                    status,
                    "No Wikipedia article with this title found",
                ));
            }
            ApiReply::Malformed(reason) => return Ok(decode_error("Wikipedia", &reason)),
        };

        let mut heading = escape_html(&humanize::title(&summary.title));
        if let Some(description) = summary.description.as_deref().filter(|d| !d.is_empty()) {
            heading.push_str(&format!("&nbsp;•&nbsp;{}", escape_html(description)));
        }
        let tooltip = format!(
            "<div style=\"text-align: left;\"><b>{heading}</b><br>{}</div>",
            escape_html(&humanize::description(&summary.extract)),
        );

        let mut response = ResolverResponse::tooltip(&tooltip);
        if let Some(thumbnail) = summary.thumbnail {
            response = response.with_thumbnail(thumbnail.source);
        }
        Ok((response, CacheDuration::Default))
    }
}
