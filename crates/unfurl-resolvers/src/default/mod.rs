//! Default resolver: fetch the link and describe it by content type.

mod html;
mod media;
mod pdf;

pub use html::HtmlResolver;
pub use media::MediaResolver;
pub use pdf::PdfResolver;

use crate::humanize;
use crate::registry::ResolverRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::{FetchResponse, HttpFetcher, Loader};
use unfurl_core::{CacheDuration, Loaded, Outcome, RequestContext, ResolverResponse, Result};
use url::Url;

/// One link of the content-type chain.
#[async_trait]
pub trait ContentTypeResolver: Send + Sync {
    fn name(&self) -> &str;

    /// `mime_type` is lower-cased and stripped of parameters.
    fn matches(&self, mime_type: &str) -> bool;

    async fn load(
        &self,
        page: FetchResponse,
        request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)>;
}

/// Loader behind the `default:link` cache. The identity is the URL itself.
pub struct LinkLoader {
    fetcher: Arc<dyn HttpFetcher>,
    registry: Arc<ResolverRegistry>,
    chain: Vec<Box<dyn ContentTypeResolver>>,
    max_content_length: u64,
}

impl LinkLoader {
    /// `chain` is consulted in order, so list the most specific types first.
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        registry: Arc<ResolverRegistry>,
        chain: Vec<Box<dyn ContentTypeResolver>>,
        max_content_length: u64,
    ) -> Self {
        Self {
            fetcher,
            registry,
            chain,
            max_content_length,
        }
    }

    async fn describe(
        &self,
        page: FetchResponse,
        request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        if page
            .content_length
            .is_some_and(|length| length > self.max_content_length)
        {
            return Ok((
                ResolverResponse::too_large(self.max_content_length),
                CacheDuration::Default,
            ));
        }

        if !page.is_success() {
            debug!(url = %page.final_url, status = page.status, "no link info for upstream status");
            let duration = if page.status >= 500 {
                CacheDuration::NoCache
            } else {
                CacheDuration::Default
            };
            return Ok((ResolverResponse::no_link_info(page.status), duration));
        }

        let mime_type = page.mime_type().unwrap_or_default();
        match self.chain.iter().find(|resolver| resolver.matches(&mime_type)) {
            Some(resolver) => {
                debug!(resolver = resolver.name(), url = %page.final_url, mime_type = %mime_type, "content type matched");
                resolver.load(page, request).await
            }
            None => Ok((generic_response(&page, &mime_type), CacheDuration::Default)),
        }
    }
}

/// Tooltip for content no chain entry understands.
fn generic_response(page: &FetchResponse, mime_type: &str) -> ResolverResponse {
    let mut html = format!(
        "<div style=\"text-align: left;\"><b>URL:</b> {}",
        escape_html(page.final_url.as_str())
    );
    if !mime_type.is_empty() {
        html.push_str(&format!("<br><b>Content type:</b> {}", escape_html(mime_type)));
    }
    if let Some(length) = page.content_length {
        html.push_str(&format!("<br><b>Size:</b> {}", humanize::bytes(length)));
    }
    html.push_str("</div>");
    ResolverResponse::tooltip(&html)
}

#[async_trait]
impl Loader for LinkLoader {
    async fn load(&self, identity: &str, request: &RequestContext) -> Result<Loaded> {
        let Ok(url) = Url::parse(identity) else {
            return Ok(Loaded::new(
                ResolverResponse::invalid_url().to_json(),
                CacheDuration::NoCache,
            ));
        };

        let page = self.fetcher.get(&url).await?;
        let final_url = page.final_url.clone();

        // Short links often land on a page a custom resolver understands.
        if final_url != url {
            if let Some((name, Outcome::Handled(response))) =
                self.registry.dispatch(&final_url, request).await
            {
                debug!(resolver = name, from = %url, to = %final_url, "redirect handled by custom resolver");
                // The custom resolver's own cache persists its result.
                return Ok(Loaded::new(response.payload, CacheDuration::NoCache)
                    .with_status(response.status_code)
                    .with_content_type(response.content_type));
            }
        }

        let (mut response, duration) = self.describe(page, request).await?;
        if final_url != url && response.link.is_none() && response.status == 200 {
            response.link = Some(final_url.to_string());
        }
        Ok(Loaded::new(serde_json::to_vec(&response)?, duration))
    }
}
