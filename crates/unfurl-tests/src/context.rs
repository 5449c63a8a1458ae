//! Test context providing access to the test database.

use crate::containers::PostgresContainer;
use std::sync::Arc;
use unfurl_core::ports::{CacheStore, GeneratedStore};
use unfurl_db::{Database, PgCacheStore, PgGeneratedStore, PoolOptions};

/// A migrated database in a fresh container.
///
/// Drop this to stop the container.
pub struct TestContext {
    pub postgres: PostgresContainer,
    pub db: Database,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        crate::init_test_logging();

        let postgres = PostgresContainer::start().await?;
        let db = Database::connect(postgres.connection_string(), &PoolOptions::default()).await?;
        db.migrate().await?;

        Ok(Self { postgres, db })
    }

    pub fn cache_store(&self) -> Arc<dyn CacheStore> {
        Arc::new(PgCacheStore::new(self.db.pool().clone()))
    }

    pub fn generated_store(&self) -> Arc<dyn GeneratedStore> {
        Arc::new(PgGeneratedStore::new(self.db.pool().clone()))
    }

    /// Get database connection string.
    pub fn db_url(&self) -> &str {
        self.postgres.connection_string()
    }
}
