//! Per-resolver hit counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use unfurl_cache::CacheStatsSnapshot;

/// Name under which default-resolver hits are counted.
pub const DEFAULT_RESOLVER: &str = "default";

/// Hit counters keyed by resolver name. The set of names is fixed when the
/// registry is built, so lookups need no locking.
#[derive(Debug, Default)]
pub struct ResolverHits {
    counters: BTreeMap<String, AtomicU64>,
}

pub type ResolverHitsSnapshot = BTreeMap<String, u64>;

/// Cache counters keyed by cache namespace.
pub type CacheStatsReport = BTreeMap<String, CacheStatsSnapshot>;

impl ResolverHits {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let counters = names
            .into_iter()
            .chain(std::iter::once(DEFAULT_RESOLVER))
            .map(|name| (name.to_string(), AtomicU64::new(0)))
            .collect();
        Self { counters }
    }

    pub fn record(&self, name: &str) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> ResolverHitsSnapshot {
        self.counters
            .iter()
            .map(|(name, counter)| (name.clone(), counter.load(Ordering::Relaxed)))
            .collect()
    }
}
