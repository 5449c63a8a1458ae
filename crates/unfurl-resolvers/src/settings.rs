//! Resolver configuration.

use std::time::Duration;

/// Upstream API locations. Each template is filled by substituting the
/// `{id}` (or `{locale}` / `{title}`) placeholders.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub frankerfacez_emote: String,
    pub betterttv_emote: String,
    pub supinic_track: String,
    pub wikipedia_summary: String,
    pub twitter_tweet: String,
    pub twitter_user: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            frankerfacez_emote: "https://api.frankerfacez.com/v1/emote/{id}".to_string(),
            betterttv_emote: "https://api.betterttv.net/3/emotes/{id}".to_string(),
            supinic_track: "https://supinic.com/api/track/detail/{id}".to_string(),
            wikipedia_summary:
                "https://{locale}.wikipedia.org/api/rest_v1/page/summary/{title}?redirect=false"
                    .to_string(),
            twitter_tweet:
                "https://api.twitter.com/1.1/statuses/show.json?id={id}&tweet_mode=extended"
                    .to_string(),
            twitter_user: "https://api.twitter.com/1.1/users/show.json?screen_name={id}"
                .to_string(),
        }
    }
}

/// Substitute `{name}` placeholders in an endpoint template.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

/// Settings for the resolver graph.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Public URL of this service, used for `/thumbnail` and `/generated` links.
    pub base_url: String,
    pub max_content_length: u64,
    /// Longest side of a generated thumbnail, in pixels.
    pub max_thumbnail_size: u32,
    pub enable_animated_thumbnails: bool,
    pub request_timeout: Duration,
    pub ignored_hosts: Vec<String>,
    pub default_link_cache: Duration,
    pub thumbnail_cache: Duration,
    pub emote_cache: Duration,
    pub wikipedia_cache: Duration,
    pub track_cache: Duration,
    pub tweet_cache: Duration,
    /// Twitter resolvers are only registered when set.
    pub twitter_bearer_token: Option<String>,
    pub endpoints: ProviderEndpoints,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/".to_string(),
            max_content_length: 5 * 1024 * 1024,
            max_thumbnail_size: 300,
            enable_animated_thumbnails: true,
            request_timeout: Duration::from_secs(15),
            ignored_hosts: vec!["localhost".to_string()],
            default_link_cache: Duration::from_secs(10 * 60),
            thumbnail_cache: Duration::from_secs(10 * 60),
            emote_cache: Duration::from_secs(60 * 60),
            wikipedia_cache: Duration::from_secs(60 * 60),
            track_cache: Duration::from_secs(60 * 60),
            tweet_cache: Duration::from_secs(24 * 60 * 60),
            twitter_bearer_token: None,
            endpoints: ProviderEndpoints::default(),
        }
    }
}

impl ResolverSettings {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_twitter_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.twitter_bearer_token = Some(token.into());
        self
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}
