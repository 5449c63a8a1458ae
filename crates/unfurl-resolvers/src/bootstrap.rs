//! Assembles the resolver graph from [`ResolverSettings`].

use crate::default::{ContentTypeResolver, HtmlResolver, LinkLoader, MediaResolver, PdfResolver};
use crate::dispatch::LinkResolver;
use crate::guard::UrlGuard;
use crate::providers::twitter::{TwitterOptions, TwitterResolver};
use crate::providers::{betterttv, frankerfacez, supinic, wikipedia};
use crate::registry::ResolverRegistry;
use crate::settings::ResolverSettings;
use crate::thumbnail::ThumbnailLoader;
use std::sync::Arc;
use tracing::info;
use unfurl_cache::{DependentCache, PersistentCache};
use unfurl_core::ports::{CacheStore, GeneratedStore, HttpFetcher};
use unfurl_core::{Error, Result};
use url::Url;

pub const LINK_NAMESPACE: &str = "default:link";
pub const THUMBNAIL_NAMESPACE: &str = "default:thumbnail";

/// Parse the public base URL. A trailing slash is added so relative links
/// keep any path prefix.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| Error::Config(format!("invalid base_url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("base_url must be http(s): {raw}")));
    }
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

/// Build the registry in its fixed priority order. Twitter is only
/// registered when a bearer token is configured.
fn build_registry(
    settings: &ResolverSettings,
    base_url: &Url,
    fetcher: &Arc<dyn HttpFetcher>,
    store: &Arc<dyn CacheStore>,
    collages: &Arc<DependentCache>,
) -> ResolverRegistry {
    let endpoints = &settings.endpoints;
    let mut builder = ResolverRegistry::builder()
        .register(frankerfacez::EmoteResolver::new(
            fetcher.clone(),
            endpoints.frankerfacez_emote.clone(),
            store.clone(),
            settings.emote_cache,
        ))
        .register(betterttv::EmoteResolver::new(
            fetcher.clone(),
            endpoints.betterttv_emote.clone(),
            store.clone(),
            settings.emote_cache,
        ))
        .register(supinic::TrackResolver::new(
            fetcher.clone(),
            endpoints.supinic_track.clone(),
            store.clone(),
            settings.track_cache,
        ))
        .register(wikipedia::ArticleResolver::new(
            fetcher.clone(),
            endpoints.wikipedia_summary.clone(),
            store.clone(),
            settings.wikipedia_cache,
        ));

    match settings.twitter_bearer_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            builder = builder.register(TwitterResolver::new(
                fetcher.clone(),
                TwitterOptions {
                    bearer_token: token.to_string(),
                    tweet_endpoint: endpoints.twitter_tweet.clone(),
                    user_endpoint: endpoints.twitter_user.clone(),
                    base_url: base_url.clone(),
                    max_content_length: settings.max_content_length,
                    tweet_ttl: settings.tweet_cache,
                    user_ttl: settings.tweet_cache,
                },
                store.clone(),
                collages.clone(),
            ));
        }
        None => info!("no twitter bearer token configured, twitter resolver disabled"),
    }

    builder.build()
}

/// Wire every resolver, cache and loader around the given stores and
/// fetcher.
pub fn build(
    settings: &ResolverSettings,
    cache_store: Arc<dyn CacheStore>,
    generated_store: Arc<dyn GeneratedStore>,
    fetcher: Arc<dyn HttpFetcher>,
) -> Result<LinkResolver> {
    let base_url = parse_base_url(&settings.base_url)?;
    let guard = UrlGuard::new(&settings.ignored_hosts);
    let collages = Arc::new(DependentCache::new(generated_store));

    let registry = Arc::new(build_registry(
        settings,
        &base_url,
        &fetcher,
        &cache_store,
        &collages,
    ));

    let chain: Vec<Box<dyn ContentTypeResolver>> = vec![
        Box::new(PdfResolver),
        Box::new(MediaResolver::new(base_url.clone())),
        Box::new(HtmlResolver::new(base_url, settings.max_content_length)),
    ];
    let link_loader = LinkLoader::new(
        fetcher.clone(),
        registry.clone(),
        chain,
        settings.max_content_length,
    );
    let link_cache = PersistentCache::new(
        LINK_NAMESPACE,
        Arc::new(link_loader),
        cache_store.clone(),
        settings.default_link_cache,
    );

    let thumbnail_loader = ThumbnailLoader::new(
        fetcher,
        settings.max_content_length,
        settings.max_thumbnail_size,
        settings.enable_animated_thumbnails,
        settings.thumbnail_cache,
    );
    let thumbnail_cache = PersistentCache::new(
        THUMBNAIL_NAMESPACE,
        Arc::new(thumbnail_loader),
        cache_store,
        settings.thumbnail_cache,
    );

    info!(
        resolvers = ?registry.names().collect::<Vec<_>>(),
        "resolver registry built"
    );

    Ok(LinkResolver::new(
        registry,
        guard,
        Arc::new(link_cache),
        Arc::new(thumbnail_cache),
        collages,
    ))
}
