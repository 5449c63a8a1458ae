//! PostgreSQL implementation of GeneratedStore.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use unfurl_core::ports::GeneratedStore;
use unfurl_core::{Error, GeneratedValue, Result};

pub struct PgGeneratedStore {
    pool: PgPool,
}

impl PgGeneratedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeneratedStore for PgGeneratedStore {
    async fn get(&self, key: &str) -> Result<Option<GeneratedValue>> {
        let row = sqlx::query(
            "SELECT key, parent_key, payload, content_type FROM generated_values WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(row.map(|r| GeneratedValue {
            key: r.get("key"),
            parent_key: r.get("parent_key"),
            payload: r.get("payload"),
            content_type: r.get("content_type"),
        }))
    }

    async fn upsert(&self, value: &GeneratedValue) -> Result<()> {
        sqlx::query("INSERT INTO generated_values (key, parent_key, payload, content_type) VALUES ($1, $2, $3, $4) ON CONFLICT (key) DO UPDATE SET parent_key = EXCLUDED.parent_key, payload = EXCLUDED.payload, content_type = EXCLUDED.content_type, created_at = NOW()")
            .bind(&value.key)
            .bind(&value.parent_key)
            .bind(&value.payload)
            .bind(&value.content_type)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn remove_by_parent(&self, parent_key: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("DELETE FROM generated_values WHERE parent_key = $1 RETURNING key")
            .bind(parent_key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get("key")).collect())
    }
}
