use super::ContentTypeResolver;
use crate::humanize;
use crate::links::thumbnail_link;
use crate::thumbnail;
use async_trait::async_trait;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::FetchResponse;
use unfurl_core::{CacheDuration, RequestContext, ResolverResponse, Result};
use url::Url;

/// Images, video and audio. Images that the thumbnail pipeline can handle
/// get a thumbnail link.
pub struct MediaResolver {
    base_url: Url,
}

impl MediaResolver {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

#[async_trait]
impl ContentTypeResolver for MediaResolver {
    fn name(&self) -> &str {
        "media"
    }

    fn matches(&self, mime_type: &str) -> bool {
        ["image/", "video/", "audio/"]
            .iter()
            .any(|prefix| mime_type.starts_with(prefix))
    }

    async fn load(
        &self,
        page: FetchResponse,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let mime_type = page.mime_type().unwrap_or_default();

        let mut html = format!(
            "<div style=\"text-align: left;\"><b>Media File</b><br><b>MIME Type:</b> {}",
            escape_html(&mime_type)
        );
        if let Some(length) = page.content_length {
            html.push_str(&format!("<br><b>Size:</b> {}", humanize::bytes(length)));
        }
        html.push_str("</div>");

        let mut response = ResolverResponse::tooltip(&html);
        if thumbnail::is_supported(&mime_type) {
            response = response.with_thumbnail(thumbnail_link(&self.base_url, page.final_url.as_str()));
        }

        Ok((response, CacheDuration::Default))
    }
}
