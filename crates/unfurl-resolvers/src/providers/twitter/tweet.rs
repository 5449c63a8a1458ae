use super::TWEET_NAMESPACE;
use crate::humanize;
use crate::links::generated_link;
use crate::providers::{ApiReply, api_status, decode_error, get_json};
use crate::settings::fill;
use crate::thumbnail::build_collage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use unfurl_cache::{DependentCache, PrefixKeyProvider};
use unfurl_core::markup::escape_html;
use unfurl_core::ports::{HttpFetcher, KeyProvider, ResponseLoader};
use unfurl_core::{CacheDuration, Error, RequestContext, ResolverResponse, Result};
use url::Url;

const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Deserialize)]
struct Tweet {
    #[serde(alias = "text")]
    full_text: String,
    created_at: String,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    retweet_count: u64,
    user: Author,
    #[serde(default)]
    extended_entities: Option<Entities>,
    #[serde(default)]
    entities: Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
    screen_name: String,
}

#[derive(Debug, Deserialize)]
struct Entities {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    media_url_https: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl Tweet {
    /// Photo URLs, preferring the extended entities which list every photo.
    fn photos(&self) -> Vec<String> {
        self.extended_entities
            .as_ref()
            .or(self.entities.as_ref())
            .map(|entities| {
                entities
                    .media
                    .iter()
                    .filter(|media| media.kind.as_deref().is_none_or(|kind| kind == "photo"))
                    .map(|media| media.media_url_https.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub(super) struct TweetLoader {
    fetcher: Arc<dyn HttpFetcher>,
    bearer: String,
    endpoint: String,
    base_url: Url,
    max_content_length: u64,
    keys: PrefixKeyProvider,
    collages: Arc<DependentCache>,
}

impl TweetLoader {
    pub(super) fn new(
        fetcher: Arc<dyn HttpFetcher>,
        bearer_token: String,
        endpoint: String,
        base_url: Url,
        max_content_length: u64,
        collages: Arc<DependentCache>,
    ) -> Self {
        Self {
            fetcher,
            bearer: format!("Bearer {bearer_token}"),
            endpoint,
            base_url,
            max_content_length,
            keys: PrefixKeyProvider::new(TWEET_NAMESPACE),
            collages,
        }
    }

    /// Thumbnail for the tweet: the photo itself, or a generated collage
    /// when there are several.
    async fn thumbnail(&self, tweet_id: &str, photos: &[String]) -> Option<String> {
        match photos {
            [] => None,
            [single] => Some(single.clone()),
            [first, ..] => match self.collage(tweet_id, photos).await {
                Ok(link) => Some(link),
                Err(e) => {
                    warn!(tweet_id = %tweet_id, error = %e, "collage failed, using first photo");
                    Some(first.clone())
                }
            },
        }
    }

    async fn photo(&self, photo: &str) -> Result<Vec<u8>> {
        let url = Url::parse(photo).map_err(|e| Error::InvalidUrl(format!("{photo}: {e}")))?;
        let response = self.fetcher.get(&url).await?;
        if !response.is_success() {
            return Err(Error::Upstream {
                status: response.status,
                message: format!("photo {photo}"),
            });
        }
        response.body.read(self.max_content_length).await
    }

    async fn collage(&self, tweet_id: &str, photos: &[String]) -> Result<String> {
        let images = try_join_all(photos.iter().map(|photo| self.photo(photo))).await?;

        let collage = tokio::task::spawn_blocking(move || build_collage(&images))
            .await
            .map_err(|e| Error::Internal(format!("collage task failed: {e}")))??;

        let token = format!("tweet-{tweet_id}");
        self.collages
            .insert(
                &self.keys.key(tweet_id),
                &token,
                collage.bytes,
                &collage.content_type,
            )
            .await?;
        debug!(tweet_id = %tweet_id, photos = photos.len(), "stored tweet collage");

        Ok(generated_link(&self.base_url, &token))
    }
}

#[async_trait]
impl ResponseLoader for TweetLoader {
    async fn load(
        &self,
        tweet_id: &str,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let endpoint = fill(&self.endpoint, &[("id", tweet_id)]);
        let headers = [("Authorization", self.bearer.as_str())];

        let tweet = match get_json::<Tweet>(self.fetcher.as_ref(), &endpoint, &headers).await? {
            ApiReply::Found(tweet) => tweet,
            ApiReply::Missing(status) => {
                return Ok(api_status("Twitter", status, "No tweet with this ID found"));
            }
            ApiReply::Malformed(reason) => return Ok(decode_error("Twitter", &reason)),
        };

        let timestamp = DateTime::parse_from_str(&tweet.created_at, TWITTER_DATE_FORMAT)
            .map(|at| humanize::timestamp(at.with_timezone(&Utc)))
            .unwrap_or_default();

        let tooltip = format!(
            "<div style=\"text-align: left;\">\n<b>{} (@{})</b><br>\n<span style=\"white-space: pre-wrap; word-wrap: break-word;\">{}</span><br>\n<span style=\"color: #808892;\">{} likes&nbsp;•&nbsp;{} retweets&nbsp;•&nbsp;{}</span>\n</div>",
            escape_html(&tweet.user.name),
            escape_html(&tweet.user.screen_name),
            escape_html(&tweet.full_text),
            humanize::number(tweet.favorite_count),
            humanize::number(tweet.retweet_count),
            timestamp,
        );

        let mut response = ResolverResponse::tooltip(&tooltip);
        if let Some(thumbnail) = self.thumbnail(tweet_id, &tweet.photos()).await {
            response = response.with_thumbnail(thumbnail);
        }
        Ok((response, CacheDuration::Default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ReqwestFetcher;
    use crate::guard::UrlGuard;
    use crate::providers::twitter::{TwitterMatch, TwitterOptions, TwitterResolver};
    use crate::providers::tests::url;
    use serde_json::json;
    use std::time::Duration;
    use unfurl_cache::{MemoryCacheStore, MemoryGeneratedStore};
    use unfurl_core::ports::{CacheStore, GeneratedStore};
    use unfurl_core::{CacheEntry, Expiry, Outcome, Resolver};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    async fn upstream() -> MockServer {
        let server = MockServer::start().await;
        let photo = |name: &str| format!("{}/media/{name}.png", server.uri());

        Mock::given(method("GET"))
            .and(path("/statuses/show.json"))
            .and(query_param("id", "1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_text": "two <photos>",
                "created_at": "Mon Jan 02 15:04:05 +0000 2006",
                "favorite_count": 1234,
                "retweet_count": 5,
                "user": {"name": "Pajlada", "screen_name": "pajlada"},
                "extended_entities": {"media": [
                    {"media_url_https": photo("a"), "type": "photo"},
                    {"media_url_https": photo("b"), "type": "photo"}
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/statuses/show.json"))
            .and(query_param("id", "404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(png(), "image/png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/b.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(png(), "image/png"))
            .mount(&server)
            .await;
        server
    }

    struct Fixture {
        resolver: TwitterResolver,
        store: Arc<MemoryCacheStore>,
        generated: Arc<MemoryGeneratedStore>,
        collages: Arc<DependentCache>,
        _server: MockServer,
    }

    async fn fixture(tweet_ttl: Duration) -> Fixture {
        let server = upstream().await;
        let store = Arc::new(MemoryCacheStore::new());
        let generated = Arc::new(MemoryGeneratedStore::new());
        let collages = Arc::new(DependentCache::new(generated.clone()));
        let resolver = TwitterResolver::new(
            Arc::new(ReqwestFetcher::new(Duration::from_secs(5), UrlGuard::default()).unwrap()),
            TwitterOptions {
                bearer_token: "secret".to_string(),
                tweet_endpoint: format!("{}/statuses/show.json?id={{id}}", server.uri()),
                user_endpoint: format!("{}/users/show.json?screen_name={{id}}", server.uri()),
                base_url: url("https://unfurl.example/"),
                max_content_length: 1024 * 1024,
                tweet_ttl,
                user_ttl: Duration::from_secs(60),
            },
            store.clone(),
            collages.clone(),
        );
        Fixture {
            resolver,
            store,
            generated,
            collages,
            _server: server,
        }
    }

    async fn run(resolver: &TwitterResolver, id: &str) -> ResolverResponse {
        let target = url(&format!("https://twitter.com/pajlada/status/{id}"));
        match resolver
            .run(TwitterMatch::Tweet(id.to_string()), &target, &RequestContext::default())
            .await
        {
            Outcome::Handled(response) => serde_json::from_slice(&response.payload).unwrap(),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_multi_photo_tweet_gets_collage() {
        let f = fixture(Duration::from_secs(60)).await;

        let response = run(&f.resolver, "1").await;
        assert_eq!(
            response.thumbnail.as_deref(),
            Some("https://unfurl.example/generated/tweet-1")
        );
        let tooltip = response.tooltip.unwrap();
        assert!(tooltip.contains("two%20&lt%3Bphotos&gt%3B"));
        assert!(tooltip.contains("1%2C234%20likes"));
        assert!(tooltip.contains("02%20Jan%202006%20%E2%80%A2%2015:04%20UTC"));

        let collage = f.collages.get("tweet-1").await.unwrap().unwrap();
        assert_eq!(collage.parent_key, "twitter:tweet:1");
        assert_eq!(collage.content_type, "image/png");
        let image = image::load_from_memory(&collage.payload).unwrap();
        assert_eq!((image.width(), image.height()), (8, 2));
    }

    #[tokio::test]
    async fn test_reloading_expired_tweet_discards_collage() {
        let f = fixture(Duration::from_secs(60)).await;
        run(&f.resolver, "1").await;

        // Expire the tweet and swap the collage for a marker value.
        let mut entry: CacheEntry = f.store.get("twitter:tweet:1").await.unwrap().unwrap();
        entry.expires = Expiry::At(Utc::now() - chrono::Duration::seconds(5));
        f.store.upsert(&entry).await.unwrap();
        f.collages
            .insert("twitter:tweet:1", "tweet-1", b"stale".to_vec(), "image/png")
            .await
            .unwrap();

        run(&f.resolver, "1").await;

        let collage = f.generated.get("default:dependent:tweet-1").await.unwrap().unwrap();
        assert_ne!(collage.payload, b"stale");
    }

    #[tokio::test]
    async fn test_missing_tweet() {
        let f = fixture(Duration::from_secs(60)).await;
        assert_eq!(
            run(&f.resolver, "404").await,
            ResolverResponse::not_found("No tweet with this ID found")
        );
        assert_eq!(f.generated.len().await, 0);
    }
}
