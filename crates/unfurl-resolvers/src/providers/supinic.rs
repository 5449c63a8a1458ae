//! Supinic track list entries, e.g. `https://supinic.com/track/detail/1883`.

use super::{ApiReply, api_status, decode_error, get_json, host_in, run_cached};
use crate::humanize;
use crate::settings::fill;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;
use unfurl_cache::PersistentCache;
use unfurl_core::loader::JsonLoader;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::{CacheStore, HttpFetcher, ResponseLoader};
use unfurl_core::{CacheDuration, Outcome, RequestContext, Resolver, ResolverResponse, Result};
use url::Url;

pub const NAMESPACE: &str = "supinic:track";

const HOSTS: [&str; 2] = ["supinic.com", "www.supinic.com"];

const PROVIDER: &str = "Supinic track list";
const NOT_FOUND: &str = "No track with this ID found";

static TRACK_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/track/detail/([0-9]+)").unwrap());

pub struct TrackResolver {
    cache: PersistentCache,
}

impl TrackResolver {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        endpoint: impl Into<String>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        let loader = TrackLoader {
            fetcher,
            endpoint: endpoint.into(),
        };
        Self {
            cache: PersistentCache::new(NAMESPACE, Arc::new(JsonLoader::new(loader)), store, ttl),
        }
    }
}

#[async_trait]
impl Resolver for TrackResolver {
    /// Track id digits as they appear in the path.
    type Match = String;

    fn name(&self) -> &str {
        NAMESPACE
    }

    fn check(&self, url: &Url) -> Option<String> {
        if !host_in(url, &HOSTS) {
            return None;
        }
        TRACK_PATH
            .captures(url.path())
            .map(|captures| captures[1].to_string())
    }

    async fn run(&self, raw_id: String, url: &Url, request: &RequestContext) -> Outcome {
        let Ok(track_id) = raw_id.parse::<i32>() else {
            debug!(url = %url, "track id out of range");
            return Outcome::NotApplicable;
        };
        run_cached(&self.cache, &track_id.to_string(), request).await
    }
}

#[derive(Debug, Deserialize)]
struct TrackReply {
    data: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: i64,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    /// Seconds.
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(rename = "ID")]
    id: i64,
    name: String,
    role: String,
}

fn format_authors(authors: &[Author]) -> String {
    if authors.is_empty() {
        return "unknown".to_string();
    }
    authors
        .iter()
        .map(|author| format!("{} (ID {} - {})", author.name, author.id, author.role))
        .collect::<Vec<_>>()
        .join(", ")
}

struct TrackLoader {
    fetcher: Arc<dyn HttpFetcher>,
    endpoint: String,
}

#[async_trait]
impl ResponseLoader for TrackLoader {
    async fn load(
        &self,
        track_id: &str,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let endpoint = fill(&self.endpoint, &[("id", track_id)]);
        let track = match get_json::<TrackReply>(self.fetcher.as_ref(), &endpoint, &[]).await? {
            ApiReply::Found(TrackReply { data: Some(track) }) => track,
            ApiReply::Found(TrackReply { data: None }) => {
                return Ok(api_status(PROVIDER, 404, NOT_FOUND));
            }
            ApiReply::Missing(status) => return Ok(api_status(PROVIDER, status, NOT_FOUND)),
            ApiReply::Malformed(reason) => return Ok(decode_error(PROVIDER, &reason)),
        };

        let duration = track
            .duration
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .map_or_else(
                || "unknown".to_string(),
                |seconds| humanize::duration(Duration::from_secs(seconds as u64)),
            );

        let tooltip = format!(
            "<div style=\"text-align: left;\"><b>{}</b><hr><b>Track ID:</b> {}<br><b>Duration:</b> {}<br><b>By:</b> {}<br><b>Tags:</b> {}</div>",
            escape_html(&track.name),
            track.id,
            duration,
            escape_html(&format_authors(&track.authors)),
            escape_html(&track.tags.join(", ")),
        );

        Ok((ResolverResponse::tooltip(&tooltip), CacheDuration::Default))
    }
}
