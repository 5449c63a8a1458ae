//! Ordered, immutable list of custom resolvers.

use std::sync::Arc;
use tracing::debug;
use unfurl_core::resolver::erase;
use unfurl_core::{DynResolver, Outcome, RequestContext, Resolver};
use url::Url;

/// Resolvers in priority order. Built once at startup.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn DynResolver>>,
}

impl ResolverRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.iter().map(|resolver| resolver.name())
    }

    /// Run the first resolver whose check matches `url`. Later resolvers are
    /// never consulted, whatever the first one's outcome.
    pub async fn dispatch(
        &self,
        url: &Url,
        request: &RequestContext,
    ) -> Option<(&str, Outcome)> {
        for resolver in &self.resolvers {
            if let Some(outcome) = resolver.dispatch(url, request).await {
                debug!(resolver = resolver.name(), url = %url, "custom resolver matched");
                return Some((resolver.name(), outcome));
            }
        }
        None
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    resolvers: Vec<Arc<dyn DynResolver>>,
}

impl RegistryBuilder {
    pub fn register<R: Resolver>(mut self, resolver: R) -> Self {
        self.resolvers.push(erase(resolver));
        self
    }

    pub fn build(self) -> ResolverRegistry {
        ResolverRegistry {
            resolvers: self.resolvers,
        }
    }
}
