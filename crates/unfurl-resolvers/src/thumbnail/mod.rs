//! Thumbnail pipeline behind `/thumbnail`.

mod build;

pub use build::{Thumbnail, build_animated, build_collage, build_static, fit_within};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use unfurl_core::ports::{HttpFetcher, Loader};
use unfurl_core::{CacheDuration, Error, Loaded, RequestContext, ResolverResponse, Result};
use url::Url;

const SUPPORTED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];
const ANIMATED_TYPES: [&str; 2] = ["image/gif", "image/webp"];

/// Whether `mime_type` (without parameters) can be thumbnailed.
pub fn is_supported(mime_type: &str) -> bool {
    SUPPORTED_TYPES.contains(&mime_type)
}

pub fn is_animated_capable(mime_type: &str) -> bool {
    ANIMATED_TYPES.contains(&mime_type)
}

/// Loader behind the `default:thumbnail` cache. The identity is the image URL.
pub struct ThumbnailLoader {
    fetcher: Arc<dyn HttpFetcher>,
    max_content_length: u64,
    max_thumbnail_size: u32,
    enable_animated: bool,
    cache_duration: Duration,
}

impl ThumbnailLoader {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        max_content_length: u64,
        max_thumbnail_size: u32,
        enable_animated: bool,
        cache_duration: Duration,
    ) -> Self {
        Self {
            fetcher,
            max_content_length,
            max_thumbnail_size,
            enable_animated,
            cache_duration,
        }
    }
}

fn json(response: ResolverResponse, duration: CacheDuration) -> Loaded {
    Loaded::new(response.to_json(), duration)
}

#[async_trait]
impl Loader for ThumbnailLoader {
    async fn load(&self, identity: &str, _request: &RequestContext) -> Result<Loaded> {
        let Ok(url) = Url::parse(identity) else {
            return Ok(json(ResolverResponse::invalid_url(), CacheDuration::NoCache));
        };

        let page = self.fetcher.get(&url).await?;

        if page
            .content_length
            .is_some_and(|length| length > self.max_content_length)
        {
            return Ok(json(
                ResolverResponse::too_large(self.max_content_length),
                CacheDuration::Default,
            ));
        }

        if !page.is_success() {
            debug!(url = %page.final_url, status = page.status, "skipping thumbnail for upstream status");
            return Ok(json(
                ResolverResponse::no_thumbnail_found(),
                CacheDuration::Default,
            ));
        }

        let mime_type = page.mime_type().unwrap_or_default();
        if !is_supported(&mime_type) {
            return Ok(json(
                ResolverResponse::unsupported_thumbnail_type(),
                CacheDuration::Default,
            ));
        }

        let bytes = match page.body.read(self.max_content_length).await {
            Ok(bytes) => bytes,
            Err(Error::TooLarge { limit }) => {
                return Ok(json(ResolverResponse::too_large(limit), CacheDuration::Default));
            }
            Err(e) => {
                error!(url = %url, error = %e, "failed to read thumbnail body");
                return Ok(json(
                    ResolverResponse::thumbnail_failed(),
                    CacheDuration::NoCache,
                ));
            }
        };

        let try_animated = self.enable_animated && is_animated_capable(&mime_type);
        let max_size = self.max_thumbnail_size;
        let built = tokio::task::spawn_blocking(move || {
            if try_animated {
                match build_animated(&bytes, &mime_type, max_size) {
                    Ok(thumbnail) => return Ok(thumbnail),
                    Err(e) => {
                        warn!(error = %e, "animated thumbnail failed, falling back to static");
                    }
                }
            }
            build_static(&bytes, max_size)
        })
        .await
        .map_err(|e| Error::Internal(format!("thumbnail task failed: {e}")))?;

        match built {
            Ok(thumbnail) => Ok(Loaded::new(
                thumbnail.bytes,
                CacheDuration::For(self.cache_duration),
            )
            .with_content_type(thumbnail.content_type)),
            Err(e) => {
                error!(url = %url, error = %e, "failed to build static thumbnail");
                Ok(json(
                    ResolverResponse::thumbnail_failed(),
                    CacheDuration::NoCache,
                ))
            }
        }
    }
}
