//! Link resolvers for unfurl.
//!
//! The [`LinkResolver`] dispatch engine walks an immutable
//! [`ResolverRegistry`] of provider-specific resolvers and falls back to the
//! default content-type chain. The thumbnail pipeline and the generated-value
//! cache are assembled alongside it by [`build`].

pub mod bootstrap;
pub mod default;
pub mod dispatch;
pub mod fetch;
pub mod guard;
pub mod humanize;
pub mod links;
pub mod metrics;
pub mod providers;
pub mod registry;
pub mod settings;
pub mod thumbnail;

pub use bootstrap::build;
pub use dispatch::LinkResolver;
pub use fetch::ReqwestFetcher;
pub use guard::UrlGuard;
pub use metrics::{CacheStatsReport, ResolverHits, ResolverHitsSnapshot};
pub use registry::ResolverRegistry;
pub use settings::ResolverSettings;
