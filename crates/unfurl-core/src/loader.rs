//! Loader adapters.

use crate::cache::Loaded;
use crate::ports::{Loader, ResponseLoader};
use crate::resolver::RequestContext;
use crate::Result;
use async_trait::async_trait;

/// Serializes the output of a [`ResponseLoader`] to JSON.
pub struct JsonLoader<L> {
    inner: L,
}

impl<L> JsonLoader<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<L: ResponseLoader> Loader for JsonLoader<L> {
    async fn load(&self, identity: &str, request: &RequestContext) -> Result<Loaded> {
        let (response, duration) = self.inner.load(identity, request).await?;
        let payload = serde_json::to_vec(&response)?;
        Ok(Loaded::new(payload, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheDuration, ResolverResponse};

    struct Fixed;

    #[async_trait]
    impl ResponseLoader for Fixed {
        async fn load(
            &self,
            identity: &str,
            _request: &RequestContext,
        ) -> Result<(ResolverResponse, CacheDuration)> {
            Ok((ResolverResponse::not_found(identity), CacheDuration::NoCache))
        }
    }

    #[tokio::test]
    async fn test_json_loader_marshals_response() {
        let loaded = JsonLoader::new(Fixed)
            .load("gone", &RequestContext::default())
            .await
            .unwrap();

        assert_eq!(loaded.payload, br#"{"status":404,"message":"gone"}"#);
        assert_eq!(loaded.duration, CacheDuration::NoCache);
        assert_eq!(loaded.status_code, None);
        assert_eq!(loaded.content_type, None);
    }
}
