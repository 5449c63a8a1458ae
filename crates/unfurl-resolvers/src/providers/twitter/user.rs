use crate::humanize;
use crate::providers::{ApiReply, api_status, decode_error, get_json};
use crate::settings::fill;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::{HttpFetcher, ResponseLoader};
use unfurl_core::{CacheDuration, RequestContext, ResolverResponse, Result};

#[derive(Debug, Deserialize)]
struct User {
    name: String,
    screen_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    followers_count: u64,
    #[serde(default)]
    profile_image_url_https: Option<String>,
}

/// Profile images are listed at 48x48; the `_400x400` variant is the
/// largest square one.
fn large_profile_image(url: &str) -> String {
    url.replace("_normal.", "_400x400.")
}

pub(super) struct UserLoader {
    fetcher: Arc<dyn HttpFetcher>,
    bearer: String,
    endpoint: String,
}

impl UserLoader {
    pub(super) fn new(fetcher: Arc<dyn HttpFetcher>, bearer_token: String, endpoint: String) -> Self {
        Self {
            fetcher,
            bearer: format!("Bearer {bearer_token}"),
            endpoint,
        }
    }
}

#[async_trait]
impl ResponseLoader for UserLoader {
    async fn load(
        &self,
        screen_name: &str,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let endpoint = fill(&self.endpoint, &[("id", screen_name)]);
        let headers = [("Authorization", self.bearer.as_str())];

        let user = match get_json::<User>(self.fetcher.as_ref(), &endpoint, &headers).await? {
            ApiReply::Found(user) => user,
            ApiReply::Missing(status) => {
                return Ok(api_status(
                    "Twitter",
                    status,
                    "No Twitter user with this name found",
                ));
            }
            ApiReply::Malformed(reason) => return Ok(decode_error("Twitter", &reason)),
        };

        let tooltip = format!(
            "<div style=\"text-align: left;\">\n<b>{} (@{})</b><br>\n<span style=\"white-space: pre-wrap; word-wrap: break-word;\">{}</span><br>\n<span style=\"color: #808892;\">{} followers</span>\n</div>",
            escape_html(&user.name),
            escape_html(&user.screen_name),
            escape_html(&user.description),
            humanize::number(user.followers_count),
        );

        let mut response = ResolverResponse::tooltip(&tooltip);
        if let Some(image) = user.profile_image_url_https.as_deref() {
            response = response.with_thumbnail(large_profile_image(image));
        }
        Ok((response, CacheDuration::Default))
    }
}
