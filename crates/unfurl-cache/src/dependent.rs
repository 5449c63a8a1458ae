//! Store for generated artifacts that depend on other cache entries.

use crate::keys::{PrefixKeyProvider, validate_token};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use unfurl_core::ports::{Dependent, GeneratedStore, KeyProvider};
use unfurl_core::{GeneratedValue, Result};

/// Generated values live under this namespace.
pub const DEPENDENT_NAMESPACE: &str = "default:dependent";

/// Holds values produced as a byproduct of another cache's loader, addressed
/// by an opaque token instead of a URL.
///
/// Register it as a dependent of the source cache: when a source entry is
/// reloaded every value derived from it is discarded, and the source loader
/// is expected to regenerate what it still needs.
pub struct DependentCache {
    keys: PrefixKeyProvider,
    store: Arc<dyn GeneratedStore>,
    dependents: Vec<Arc<dyn Dependent>>,
}

impl DependentCache {
    pub fn new(store: Arc<dyn GeneratedStore>) -> Self {
        Self {
            keys: PrefixKeyProvider::new(DEPENDENT_NAMESPACE),
            store,
            dependents: Vec::new(),
        }
    }

    /// Caches derived from this one. No cycle detection is performed.
    pub fn register_dependent(&mut self, dependent: Arc<dyn Dependent>) {
        self.dependents.push(dependent);
    }

    /// Store a generated value for `token`, derived from the entry stored
    /// under `parent_key`.
    pub async fn insert(
        &self,
        parent_key: &str,
        token: &str,
        payload: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        validate_token(token)?;

        let value = GeneratedValue {
            key: self.keys.key(token),
            parent_key: parent_key.to_string(),
            payload,
            content_type: content_type.to_string(),
        };
        self.store.upsert(&value).await?;
        debug!(key = %value.key, parent = %parent_key, "stored generated value");
        Ok(())
    }

    /// `Ok(None)` when the token is valid but nothing has been generated.
    pub async fn get(&self, token: &str) -> Result<Option<GeneratedValue>> {
        validate_token(token)?;
        self.store.get(&self.keys.key(token)).await
    }
}

#[async_trait]
impl Dependent for DependentCache {
    async fn source_invalidated(&self, source_key: &str) -> Result<()> {
        let removed = self.store.remove_by_parent(source_key).await?;
        if !removed.is_empty() {
            debug!(source = %source_key, count = removed.len(), "discarded generated values");
        }

        for key in &removed {
            for dependent in &self.dependents {
                if let Err(e) = dependent.source_invalidated(key).await {
                    warn!(key = %key, error = %e, "dependent invalidation failed");
                }
            }
        }
        Ok(())
    }
}
