//! API route definitions.

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{generated, health, resolve};
use crate::middleware::{cors_layer, request_id};
use crate::state::AppState;

/// Create the main API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/link_resolver", get(resolve::link_resolver))
        .route("/link_resolver/{*url}", get(resolve::legacy_link_resolver))
        .route("/thumbnail", get(resolve::thumbnail))
        .route("/generated/{token}", get(generated::generated))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tower::ServiceExt;
    use unfurl_cache::{DEPENDENT_NAMESPACE, MemoryCacheStore, MemoryGeneratedStore};
    use unfurl_core::ports::{GeneratedStore, HealthCheck};
    use unfurl_core::{Error, GeneratedValue, ResolverResponse, Result};
    use unfurl_resolvers::{ReqwestFetcher, ResolverSettings, UrlGuard, build};

    struct StubStorage(bool);

    #[async_trait]
    impl HealthCheck for StubStorage {
        async fn ping(&self) -> Result<()> {
            if self.0 {
                Ok(())
            } else {
                Err(Error::Database("connection refused".to_string()))
            }
        }
    }

    fn router_with(generated: Arc<MemoryGeneratedStore>, healthy: bool) -> Router {
        let resolver = build(
            &ResolverSettings::default(),
            Arc::new(MemoryCacheStore::new()),
            generated,
            Arc::new(ReqwestFetcher::new(Duration::from_secs(1), UrlGuard::default()).unwrap()),
        )
        .unwrap();
        create_router(Arc::new(AppState::new(
            Arc::new(resolver),
            Arc::new(StubStorage(healthy)),
        )))
    }

    fn router() -> Router {
        router_with(Arc::new(MemoryGeneratedStore::new()), true)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn structured(body: &[u8]) -> ResolverResponse {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = get(router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert!(json["uptime_secs"].is_u64());
        assert_eq!(json["resolver_hits"]["default"], 0);
        assert_eq!(json["resolver_hits"]["wikipedia:article"], 0);
        assert_eq!(json["caches"]["default:link"]["hits"], 0);
        assert_eq!(json["caches"]["default:thumbnail"]["stores"], 0);
    }

    #[tokio::test]
    async fn test_ready_reflects_storage() {
        let (status, _, _) = get(router(), "/ready").await;
        assert_eq!(status, StatusCode::OK);

        let unhealthy = router_with(Arc::new(MemoryGeneratedStore::new()), false);
        let (status, _, _) = get(unhealthy, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_url_is_structured_error() {
        let (status, headers, body) = get(router(), "/link_resolver").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(structured(&body), ResolverResponse::invalid_url());
    }

    #[tokio::test]
    async fn test_forbidden_host() {
        let (_, _, body) = get(
            router(),
            "/link_resolver?url=http%3A%2F%2F127.0.0.1%3A8080%2Fadmin",
        )
        .await;
        assert_eq!(structured(&body), ResolverResponse::forbidden_url());

        let (_, _, body) = get(router(), "/link_resolver?url=http%3A%2F%2Flocalhost%2F").await;
        assert_eq!(structured(&body), ResolverResponse::forbidden_url());
    }

    #[tokio::test]
    async fn test_legacy_path_form() {
        let (_, _, body) = get(router(), "/link_resolver/ftp%3A%2F%2Fexample.com%2Ffile").await;
        assert_eq!(structured(&body), ResolverResponse::invalid_url());

        let (_, _, body) = get(router(), "/link_resolver/http%3A%2F%2F10.0.0.1%2F").await;
        assert_eq!(structured(&body), ResolverResponse::forbidden_url());
    }

    #[tokio::test]
    async fn test_thumbnail_applies_guard() {
        let (_, _, body) = get(router(), "/thumbnail?url=http%3A%2F%2F192.168.1.1%2Fa.png").await;
        assert_eq!(structured(&body), ResolverResponse::forbidden_url());

        let (_, _, body) = get(router(), "/thumbnail").await;
        assert_eq!(structured(&body), ResolverResponse::invalid_url());
    }

    #[tokio::test]
    async fn test_request_id() {
        let (_, headers, _) = get(router(), "/health").await;
        let generated = headers["x-request-id"].to_str().unwrap();
        assert_eq!(generated.len(), 36);

        let response = router()
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_generated_values() {
        let store = Arc::new(MemoryGeneratedStore::new());
        store
            .upsert(&GeneratedValue {
                key: format!("{DEPENDENT_NAMESPACE}:tweet-1"),
                parent_key: "twitter:tweet:1".to_string(),
                payload: vec![0x89, b'P', b'N', b'G'],
                content_type: "image/png".to_string(),
            })
            .await
            .unwrap();
        let router = router_with(store, true);

        let (status, headers, body) = get(router.clone(), "/generated/tweet-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(body, vec![0x89, b'P', b'N', b'G']);

        let (status, _, body) = get(router.clone(), "/generated/tweet-2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());

        let (status, _, body) = get(router, "/generated/bad!token").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.is_empty());
    }
}
