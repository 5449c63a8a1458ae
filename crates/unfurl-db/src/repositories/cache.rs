//! PostgreSQL implementation of CacheStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use unfurl_core::ports::CacheStore;
use unfurl_core::{CacheEntry, Error, Expiry, Result};

pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_entry(r: &sqlx::postgres::PgRow) -> Result<CacheEntry> {
        let status: i32 = r.get("status");
        let status_code = u16::try_from(status)
            .map_err(|_| Error::Database(format!("invalid stored status code {status}")))?;
        Ok(CacheEntry {
            key: r.get("key"),
            payload: r.get("payload"),
            status_code,
            content_type: r.get("content_type"),
            expires: Expiry::from_timestamp(r.get::<Option<DateTime<Utc>>, _>("expires_at")),
        })
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query(
            "SELECT key, payload, status, content_type, expires_at FROM cache WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query("INSERT INTO cache (key, payload, status, content_type, expires_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (key) DO UPDATE SET payload = EXCLUDED.payload, status = EXCLUDED.status, content_type = EXCLUDED.content_type, expires_at = EXCLUDED.expires_at")
            .bind(&entry.key)
            .bind(&entry.payload)
            .bind(i32::from(entry.status_code))
            .bind(&entry.content_type)
            .bind(entry.expires.as_timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "DELETE FROM cache WHERE expires_at IS NOT NULL AND expires_at < $1 RETURNING key",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get("key")).collect())
    }
}
