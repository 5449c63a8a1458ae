//! Test helper functions and utilities.

use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use unfurl_api::{AppState, create_router};
use unfurl_resolvers::settings::ProviderEndpoints;
use unfurl_resolvers::{ReqwestFetcher, ResolverSettings, UrlGuard};

use crate::context::TestContext;

/// Provider endpoints pointing at a mock upstream.
pub fn mock_endpoints(upstream: &str) -> ProviderEndpoints {
    ProviderEndpoints {
        frankerfacez_emote: format!("{upstream}/ffz/v1/emote/{{id}}"),
        betterttv_emote: format!("{upstream}/bttv/3/emotes/{{id}}"),
        supinic_track: format!("{upstream}/supinic/api/track/detail/{{id}}"),
        wikipedia_summary: format!("{upstream}/wikipedia/{{locale}}/summary/{{title}}"),
        twitter_tweet: format!("{upstream}/twitter/statuses/show.json?id={{id}}"),
        twitter_user: format!("{upstream}/twitter/users/show.json?screen_name={{id}}"),
    }
}

/// Start a server backed by the context's database and return its address.
pub async fn start_test_server(
    ctx: &TestContext,
    settings: ResolverSettings,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let fetcher = Arc::new(ReqwestFetcher::new(
        settings.request_timeout,
        UrlGuard::new(&settings.ignored_hosts),
    )?);
    let link_resolver = unfurl_resolvers::build(
        &settings,
        ctx.cache_store(),
        ctx.generated_store(),
        fetcher,
    )?;

    let state = Arc::new(AppState::new(
        Arc::new(link_resolver),
        Arc::new(ctx.db.clone()),
    ));
    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "test server stopped");
        }
    });

    Ok((addr, handle))
}

/// Create an HTTP client for testing.
pub fn test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create test client")
}

/// API test client with base URL.
pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: test_client(),
            base_url: format!("http://{}", addr),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).send().await
    }

    /// `GET /link_resolver?url=<target>`.
    pub async fn resolve(&self, target: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(self.url("/link_resolver"))
            .query(&[("url", target)])
            .send()
            .await
    }

    /// Check health endpoint.
    pub async fn health(&self) -> anyhow::Result<bool> {
        let resp = self.get("/health").await?;
        Ok(resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unfurl_resolvers::settings::fill;

    #[test]
    fn test_mock_endpoints_keep_placeholders() {
        let endpoints = mock_endpoints("http://127.0.0.1:9999");
        assert_eq!(
            fill(&endpoints.frankerfacez_emote, &[("id", "297734")]),
            "http://127.0.0.1:9999/ffz/v1/emote/297734"
        );
        assert_eq!(
            fill(
                &endpoints.wikipedia_summary,
                &[("locale", "en"), ("title", "Rust")]
            ),
            "http://127.0.0.1:9999/wikipedia/en/summary/Rust"
        );
    }
}
