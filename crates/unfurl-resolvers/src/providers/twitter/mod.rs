//! Tweets and Twitter profiles on `twitter.com` and `x.com`.
//!
//! Both are served by one resolver with a typed match. Tweets with several
//! photos get a collage stored in the generated-value cache; the tweet cache
//! registers that cache as a dependent so a reloaded tweet discards its old
//! collage.

mod tweet;
mod user;

use super::{is_subdomain_of, run_cached};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tweet::TweetLoader;
use unfurl_cache::{DependentCache, PersistentCache};
use unfurl_core::loader::JsonLoader;
use unfurl_core::ports::{CacheStore, HttpFetcher};
use unfurl_core::{Outcome, RequestContext, Resolver};
use url::Url;
use user::UserLoader;

pub const NAME: &str = "twitter";
pub const TWEET_NAMESPACE: &str = "twitter:tweet";
pub const USER_NAMESPACE: &str = "twitter:user";

const DOMAINS: [&str; 2] = ["twitter.com", "x.com"];

static TWEET_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/.*/status(?:es)?/([^/?]+)").unwrap());
static USER_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([a-zA-Z0-9_]{1,15})$").unwrap());

/// First path segments that look like user names but are site pages.
static NON_USER_PAGES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "about",
        "account",
        "bookmarks",
        "communities",
        "compose",
        "download",
        "explore",
        "hashtag",
        "home",
        "i",
        "intent",
        "jobs",
        "lists",
        "login",
        "logout",
        "messages",
        "notifications",
        "privacy",
        "search",
        "settings",
        "share",
        "signup",
        "topics",
        "tos",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwitterMatch {
    Tweet(String),
    /// Lower-cased screen name.
    User(String),
}

/// Settings the Twitter adapter needs beyond the shared fetcher and stores.
#[derive(Debug, Clone)]
pub struct TwitterOptions {
    pub bearer_token: String,
    pub tweet_endpoint: String,
    pub user_endpoint: String,
    pub base_url: Url,
    pub max_content_length: u64,
    pub tweet_ttl: Duration,
    pub user_ttl: Duration,
}

pub struct TwitterResolver {
    tweets: PersistentCache,
    users: PersistentCache,
}

impl TwitterResolver {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        options: TwitterOptions,
        store: Arc<dyn CacheStore>,
        collages: Arc<DependentCache>,
    ) -> Self {
        let tweet_loader = TweetLoader::new(
            fetcher.clone(),
            options.bearer_token.clone(),
            options.tweet_endpoint,
            options.base_url,
            options.max_content_length,
            collages.clone(),
        );
        let mut tweets = PersistentCache::new(
            TWEET_NAMESPACE,
            Arc::new(JsonLoader::new(tweet_loader)),
            store.clone(),
            options.tweet_ttl,
        );
        tweets.register_dependent(collages);

        let user_loader = UserLoader::new(fetcher, options.bearer_token, options.user_endpoint);
        let users = PersistentCache::new(
            USER_NAMESPACE,
            Arc::new(JsonLoader::new(user_loader)),
            store,
            options.user_ttl,
        );

        Self { tweets, users }
    }
}

/// Classify a URL on a Twitter domain.
pub fn classify(url: &Url) -> Option<TwitterMatch> {
    if !is_subdomain_of(url, &DOMAINS) {
        return None;
    }

    if let Some(captures) = TWEET_PATH.captures(url.path()) {
        return Some(TwitterMatch::Tweet(captures[1].to_string()));
    }

    let name = USER_PATH.captures(url.path())?[1].to_ascii_lowercase();
    if NON_USER_PAGES.contains(name.as_str()) {
        return None;
    }
    Some(TwitterMatch::User(name))
}

#[async_trait]
impl Resolver for TwitterResolver {
    type Match = TwitterMatch;

    fn name(&self) -> &str {
        NAME
    }

    fn check(&self, url: &Url) -> Option<TwitterMatch> {
        classify(url)
    }

    async fn run(&self, matched: TwitterMatch, _url: &Url, request: &RequestContext) -> Outcome {
        match matched {
            TwitterMatch::Tweet(id) => run_cached(&self.tweets, &id, request).await,
            TwitterMatch::User(name) => run_cached(&self.users, &name, request).await,
        }
    }
}
