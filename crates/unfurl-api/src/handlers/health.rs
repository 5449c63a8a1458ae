//! Health check handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use unfurl_resolvers::{CacheStatsReport, ResolverHitsSnapshot};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Successful resolutions per resolver name since start.
    pub resolver_hits: ResolverHitsSnapshot,
    pub caches: CacheStatsReport,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        resolver_hits: state.link_resolver.hits().snapshot(),
        caches: state.link_resolver.cache_stats(),
    })
}

pub async fn ready(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.storage.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!(error = %e, "storage is not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
