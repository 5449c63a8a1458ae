use super::ContentTypeResolver;
use crate::humanize;
use async_trait::async_trait;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::FetchResponse;
use unfurl_core::{CacheDuration, RequestContext, ResolverResponse, Result};

/// Describes PDF documents without downloading them.
pub struct PdfResolver;

#[async_trait]
impl ContentTypeResolver for PdfResolver {
    fn name(&self) -> &str {
        "pdf"
    }

    fn matches(&self, mime_type: &str) -> bool {
        mime_type == "application/pdf"
    }

    async fn load(
        &self,
        page: FetchResponse,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let file_name = page
            .final_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("document.pdf");

        let mut html = format!(
            "<div style=\"text-align: left;\"><b>PDF File</b><br><b>Name:</b> {}",
            escape_html(&humanize::title(file_name))
        );
        if let Some(length) = page.content_length {
            html.push_str(&format!("<br><b>Size:</b> {}", humanize::bytes(length)));
        }
        html.push_str("</div>");

        Ok((ResolverResponse::tooltip(&html), CacheDuration::Default))
    }
}
