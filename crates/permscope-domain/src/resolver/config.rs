//! Configuration for the permission engine.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::PoolCache;

/// Configuration for the permission engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound for a single pool fetch, including its directory join.
    pub fetch_timeout: Duration,
    /// Optional cache of resolved pools.
    ///
    /// Entries are keyed by actor, level and scope ids, so a switch of
    /// organization or project never reuses grants resolved for another
    /// scope.
    pub cache: Option<Arc<PoolCache>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            cache: None,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with caching enabled.
    pub fn with_cache(mut self, cache: Arc<PoolCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Creates a new configuration with the specified fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
