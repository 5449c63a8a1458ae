//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;
use unfurl_core::ports::HealthCheck;
use unfurl_resolvers::LinkResolver;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub link_resolver: Arc<LinkResolver>,
    pub storage: Arc<dyn HealthCheck>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(link_resolver: Arc<LinkResolver>, storage: Arc<dyn HealthCheck>) -> Self {
        Self {
            link_resolver,
            storage,
            started_at: Instant::now(),
        }
    }
}
