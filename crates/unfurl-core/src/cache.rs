//! Cache types.

use crate::APPLICATION_JSON;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Response handed back to callers, either materialized from a stored entry
/// or freshly produced by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub payload: Vec<u8>,
    pub status_code: u16,
    pub content_type: String,
}

impl Response {
    pub fn new(payload: Vec<u8>, status_code: u16, content_type: impl Into<String>) -> Self {
        Self {
            payload,
            status_code,
            content_type: content_type.into(),
        }
    }

    /// A 200 `application/json` response.
    pub fn json(payload: Vec<u8>) -> Self {
        Self::new(payload, 200, APPLICATION_JSON)
    }
}

/// How long a loader wants its result kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheDuration {
    /// Use the cache's configured default TTL.
    #[default]
    Default,
    /// Return the result but never write it to storage.
    NoCache,
    /// Keep until explicitly evicted.
    Permanent,
    /// Keep for the given duration. A zero duration is permanent.
    For(Duration),
}

impl CacheDuration {
    /// Resolve to a concrete expiry, or `None` when the result must not be
    /// persisted.
    pub fn expiry(self, default_ttl: Duration, now: DateTime<Utc>) -> Option<Expiry> {
        let ttl = match self {
            CacheDuration::NoCache => return None,
            CacheDuration::Permanent => return Some(Expiry::Never),
            CacheDuration::Default => default_ttl,
            CacheDuration::For(ttl) => ttl,
        };

        if ttl.is_zero() {
            return Some(Expiry::Never);
        }

        Some(
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .map_or(Expiry::Never, Expiry::At),
        )
    }
}

/// Expiry of a stored entry. `Never` is stored as a NULL timestamp, so it
/// cannot be confused with a long TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(DateTime<Utc>),
}

impl Expiry {
    /// Liveness check with second-level granularity.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => true,
            Expiry::At(at) => now.timestamp() < at.timestamp(),
        }
    }

    pub fn from_timestamp(at: Option<DateTime<Utc>>) -> Self {
        at.map_or(Expiry::Never, Expiry::At)
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(*at),
        }
    }
}

/// Persisted cache row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<u8>,
    pub status_code: u16,
    pub content_type: String,
    pub expires: Expiry,
}

impl CacheEntry {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_live(now)
    }

    pub fn to_response(&self) -> Response {
        Response::new(self.payload.clone(), self.status_code, self.content_type.clone())
    }
}

/// Output of a [`Loader`](crate::ports::Loader) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub payload: Vec<u8>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub duration: CacheDuration,
}

impl Loaded {
    pub fn new(payload: Vec<u8>, duration: CacheDuration) -> Self {
        Self {
            payload,
            status_code: None,
            content_type: None,
            duration,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Apply the 200 / `application/json` defaults.
    pub fn to_response(&self) -> Response {
        Response::new(
            self.payload.clone(),
            self.status_code.unwrap_or(200),
            self.content_type
                .clone()
                .unwrap_or_else(|| APPLICATION_JSON.to_string()),
        )
    }
}

/// An artifact produced as a byproduct of another cache's loader, such as a
/// composite image referenced from a tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedValue {
    pub key: String,
    pub parent_key: String,
    pub payload: Vec<u8>,
    pub content_type: String,
}
