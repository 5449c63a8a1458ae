//! Outbound HTTP built on a shared reqwest client.

use crate::guard::UrlGuard;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;
use unfurl_core::ports::{FetchBody, FetchResponse, HttpFetcher};
use unfurl_core::{Error, Result};
use url::Url;

pub const USER_AGENT: &str = concat!("unfurl/", env!("CARGO_PKG_VERSION"), " link-resolver");

/// Ask for English pages regardless of where the upstream thinks we are.
pub const ACCEPT_LANGUAGE: &str = "en-US, en;q=0.9, *;q=0.5";

const MAX_REDIRECTS: usize = 10;

/// [`HttpFetcher`] with a fixed per-request timeout. Redirect hops to hosts
/// rejected by the [`UrlGuard`] are not followed.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, guard: UrlGuard) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect_policy(guard))
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

fn redirect_policy(guard: UrlGuard) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !guard.allows(attempt.url()) {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_with_headers(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
    ) -> Result<FetchResponse> {
        debug!(url = %url, "GET");

        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let content_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(FetchResponse {
            status: response.status().as_u16(),
            final_url: response.url().clone(),
            content_length,
            content_type,
            body: Box::new(ReqwestBody(response)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl FetchBody for ReqwestBody {
    async fn read(self: Box<Self>, limit: u64) -> Result<Vec<u8>> {
        let mut response = self.0;
        let mut buf = Vec::new();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
        {
            if (buf.len() + chunk.len()) as u64 > limit {
                return Err(Error::TooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf)
    }
}
