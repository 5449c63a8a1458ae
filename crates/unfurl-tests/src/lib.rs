//! Integration test infrastructure for unfurl.
//!
//! This crate provides testcontainers-based infrastructure for running
//! integration tests against a real PostgreSQL instance, with `wiremock`
//! standing in for upstream provider APIs.
//!
//! # Usage
//!
//! ```ignore
//! use unfurl_tests::TestContext;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let ctx = TestContext::new().await.unwrap();
//!     // Use ctx.db, ctx.cache_store(), etc.
//! }
//! ```

pub mod containers;
pub mod context;
pub mod helpers;

pub use context::TestContext;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,unfurl_tests=debug")),
        )
        .with_test_writer()
        .try_init();
}
