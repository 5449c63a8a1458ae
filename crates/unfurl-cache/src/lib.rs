//! Get-or-load cache engine for unfurl.
//!
//! [`PersistentCache`] wraps a key provider, a loader and a durable store.
//! [`DependentCache`] keeps generated artifacts that are invalidated together
//! with the cache entry they were derived from.

pub mod cache;
pub mod dependent;
pub mod keys;
pub mod memory;
pub mod stats;

pub use cache::PersistentCache;
pub use dependent::{DEPENDENT_NAMESPACE, DependentCache};
pub use keys::{PrefixKeyProvider, validate_token};
pub use memory::{MemoryCacheStore, MemoryGeneratedStore};
pub use stats::{CacheStats, CacheStatsSnapshot};
