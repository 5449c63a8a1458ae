//! Resolver capability and its type-erased form.

use crate::cache::Response;
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Per-request data available to resolvers and loaders.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
        }
    }
}

/// Result of [`Resolver::run`].
#[derive(Debug)]
pub enum Outcome {
    Handled(Response),
    /// The URL matched but this resolver declines this particular instance.
    NotApplicable,
    Failed(Error),
}

/// Claims a URL pattern and produces a response for it.
///
/// `check` extracts a typed match (usually the identity) which is handed to
/// `run` unchanged.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    type Match: Send + 'static;

    fn name(&self) -> &str;

    fn check(&self, url: &Url) -> Option<Self::Match>;

    async fn run(&self, matched: Self::Match, url: &Url, request: &RequestContext) -> Outcome;
}

/// Object-safe view of a [`Resolver`], used by the dispatch engine.
#[async_trait]
pub trait DynResolver: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the URL does not match, otherwise the outcome of `run`.
    async fn dispatch(&self, url: &Url, request: &RequestContext) -> Option<Outcome>;
}

struct Erased<R>(R);

#[async_trait]
impl<R: Resolver> DynResolver for Erased<R> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn dispatch(&self, url: &Url, request: &RequestContext) -> Option<Outcome> {
        let matched = self.0.check(url)?;
        Some(self.0.run(matched, url, request).await)
    }
}

/// Erase a resolver's match type.
pub fn erase<R: Resolver>(resolver: R) -> Arc<dyn DynResolver> {
    Arc::new(Erased(resolver))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Digits;

    #[async_trait]
    impl Resolver for Digits {
        type Match = u32;

        fn name(&self) -> &str {
            "digits"
        }

        fn check(&self, url: &Url) -> Option<u32> {
            url.path().trim_start_matches('/').parse().ok()
        }

        async fn run(&self, matched: u32, _url: &Url, _request: &RequestContext) -> Outcome {
            Outcome::Handled(Response::json(matched.to_string().into_bytes()))
        }
    }

    #[tokio::test]
    async fn test_erased_resolver_threads_match() {
        let resolver = erase(Digits);
        assert_eq!(resolver.name(), "digits");

        let url = Url::parse("https://example.com/42").unwrap();
        match resolver.dispatch(&url, &RequestContext::default()).await {
            Some(Outcome::Handled(response)) => assert_eq!(response.payload, b"42"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let url = Url::parse("https://example.com/abc").unwrap();
        assert!(resolver.dispatch(&url, &RequestContext::default()).await.is_none());
    }
}
