//! Resolved grant pool caching with TTL and scoped invalidation.
//!
//! The cache uses Moka's async Cache for lock-free concurrent reads and
//! TTL-based eviction, with `DashMap` secondary indices for invalidating
//! everything cached for one organization or one actor.
//!
//! # Key Design
//!
//! Keys include `(actor, level, organization_id, project_id)`. The project
//! id is only part of the key for the branch pool, whose membership join
//! depends on it. A key that omitted the scope ids would let grants
//! resolved under one tenant answer a decision made under another.
//!
//! # Cache Safety
//!
//! Caching is **disabled** by default (`enabled: false`): a cached pool can
//! keep serving a revoked grant until its TTL expires unless writers call
//! the invalidation methods. The same holds for directory changes: project
//! and branch pools are cached after the membership join, so deleting a
//! project leaves its grants applying until the organization's entries are
//! invalidated.
//!
//! # Example
//!
//! ```rust,ignore
//! use permscope_domain::cache::{PoolCache, PoolCacheConfig, PoolKey};
//!
//! let cache = PoolCache::new(PoolCacheConfig::default().with_enabled(true));
//! let key = PoolKey::new("alice", Entity::Organization, "org-a", None);
//! cache.insert(key.clone(), vec![]).await;
//! assert!(cache.get(&key).await.is_some());
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;

use crate::model::{Entity, Grant};

/// Configuration for the pool cache.
#[derive(Debug, Clone)]
pub struct PoolCacheConfig {
    /// Whether caching is enabled. Defaults to `false`.
    pub enabled: bool,
    /// Maximum number of cached pools.
    pub max_capacity: u64,
    /// TTL for cached pools.
    pub default_ttl: Duration,
}

impl Default for PoolCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: 10_000,
            default_ttl: Duration::from_secs(30),
        }
    }
}

impl PoolCacheConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Cache key identifying one resolved pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub actor: String,
    pub level: Entity,
    pub organization_id: String,
    /// Set only for the branch pool.
    pub project_id: Option<String>,
}

impl PoolKey {
    pub fn new(
        actor: impl Into<String>,
        level: Entity,
        organization_id: impl Into<String>,
        project_id: Option<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            level,
            organization_id: organization_id.into(),
            project_id,
        }
    }
}

/// TTL cache of filtered grant pools.
pub struct PoolCache {
    cache: Cache<PoolKey, Arc<Vec<Grant>>>,
    config: PoolCacheConfig,
    /// Secondary index: organization_id -> keys cached for it.
    by_organization: DashMap<String, HashSet<PoolKey>>,
    /// Secondary index: actor -> keys cached for them.
    by_actor: DashMap<String, HashSet<PoolKey>>,
}

impl std::fmt::Debug for PoolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .field("organization_index_size", &self.by_organization.len())
            .field("actor_index_size", &self.by_actor.len())
            .finish()
    }
}

impl PoolCache {
    pub fn new(config: PoolCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.default_ttl)
            .build();

        Self {
            cache,
            config,
            by_organization: DashMap::new(),
            by_actor: DashMap::new(),
        }
    }

    pub fn config(&self) -> &PoolCacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Inserts a resolved pool.
    pub async fn insert(&self, key: PoolKey, grants: Vec<Grant>) {
        self.by_organization
            .entry(key.organization_id.clone())
            .or_default()
            .insert(key.clone());
        self.by_actor
            .entry(key.actor.clone())
            .or_default()
            .insert(key.clone());

        self.cache.insert(key, Arc::new(grants)).await;
    }

    /// Retrieves a resolved pool, `None` if absent or expired.
    pub async fn get(&self, key: &PoolKey) -> Option<Arc<Vec<Grant>>> {
        let result = self.cache.get(key).await;
        if result.is_some() {
            metrics::counter!("permscope_pool_cache_hits_total").increment(1);
        } else {
            metrics::counter!("permscope_pool_cache_misses_total").increment(1);
        }
        result
    }

    /// Invalidates a single pool.
    pub async fn invalidate(&self, key: &PoolKey) {
        if let Some(mut keys) = self.by_organization.get_mut(&key.organization_id) {
            keys.remove(key);
        }
        if let Some(mut keys) = self.by_actor.get_mut(&key.actor) {
            keys.remove(key);
        }
        self.cache.invalidate(key).await;
    }

    /// Invalidates every pool cached for an organization.
    pub async fn invalidate_organization(&self, organization_id: &str) {
        // remove() first so a concurrent insert cannot slip in between read and delete
        if let Some((_, keys)) = self.by_organization.remove(organization_id) {
            for key in &keys {
                self.cache.invalidate(key).await;
                if let Some(mut actor_keys) = self.by_actor.get_mut(&key.actor) {
                    actor_keys.remove(key);
                }
            }
        }
    }

    /// Invalidates every pool cached for an actor.
    pub async fn invalidate_actor(&self, actor: &str) {
        if let Some((_, keys)) = self.by_actor.remove(actor) {
            for key in &keys {
                self.cache.invalidate(key).await;
                if let Some(mut org_keys) = self.by_organization.get_mut(&key.organization_id) {
                    org_keys.remove(key);
                }
            }
        }
    }

    /// Invalidates every cached pool.
    pub fn invalidate_all(&self) {
        self.by_organization.clear();
        self.by_actor.clear();
        self.cache.invalidate_all();
    }

    /// Returns the approximate number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance tasks (evictions).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// Registers pool cache metric descriptions with the installed recorder.
pub fn register_pool_cache_metrics() {
    metrics::describe_counter!(
        "permscope_pool_cache_hits_total",
        "Total number of grant pool cache hits"
    );
    metrics::describe_counter!(
        "permscope_pool_cache_misses_total",
        "Total number of grant pool cache misses"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_cache() -> PoolCache {
        PoolCache::new(PoolCacheConfig::default().with_enabled(true))
    }

    fn org_key(actor: &str, org: &str) -> PoolKey {
        PoolKey::new(actor, Entity::Organization, org, None)
    }

    #[test]
    fn test_cache_disabled_by_default() {
        let cache = PoolCache::new(PoolCacheConfig::default());
        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = enabled_cache();
        let key = org_key("alice", "org-a");
        cache
            .insert(key.clone(), vec![Grant::owner("org-a")])
            .await;

        let pool = cache.get(&key).await.unwrap();
        assert_eq!(pool.as_slice(), &[Grant::owner("org-a")]);
    }

    #[tokio::test]
    async fn test_keys_are_isolated_by_scope() {
        let cache = enabled_cache();
        cache
            .insert(org_key("alice", "org-a"), vec![Grant::owner("org-a")])
            .await;

        assert!(cache.get(&org_key("alice", "org-b")).await.is_none());

        let branch_p1 = PoolKey::new("alice", Entity::Branch, "org-a", Some("p1".into()));
        let branch_p2 = PoolKey::new("alice", Entity::Branch, "org-a", Some("p2".into()));
        cache.insert(branch_p1.clone(), vec![]).await;
        assert!(cache.get(&branch_p1).await.is_some());
        assert!(cache.get(&branch_p2).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_single_entry() {
        let cache = enabled_cache();
        let key = org_key("alice", "org-a");
        cache.insert(key.clone(), vec![]).await;
        cache.invalidate(&key).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_organization_leaves_other_organizations() {
        let cache = enabled_cache();
        cache.insert(org_key("alice", "org-a"), vec![]).await;
        cache.insert(org_key("bob", "org-a"), vec![]).await;
        cache.insert(org_key("alice", "org-b"), vec![]).await;

        cache.invalidate_organization("org-a").await;

        assert!(cache.get(&org_key("alice", "org-a")).await.is_none());
        assert!(cache.get(&org_key("bob", "org-a")).await.is_none());
        assert!(cache.get(&org_key("alice", "org-b")).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_actor() {
        let cache = enabled_cache();
        cache.insert(org_key("alice", "org-a"), vec![]).await;
        cache.insert(org_key("alice", "org-b"), vec![]).await;
        cache.insert(org_key("bob", "org-a"), vec![]).await;

        cache.invalidate_actor("alice").await;

        assert!(cache.get(&org_key("alice", "org-a")).await.is_none());
        assert!(cache.get(&org_key("alice", "org-b")).await.is_none());
        assert!(cache.get(&org_key("bob", "org-a")).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = enabled_cache();
        cache.insert(org_key("alice", "org-a"), vec![]).await;
        cache.insert(org_key("bob", "org-b"), vec![]).await;

        cache.invalidate_all();

        assert!(cache.get(&org_key("alice", "org-a")).await.is_none());
        assert!(cache.get(&org_key("bob", "org-b")).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_entry_expires_after_ttl() {
        let cache = PoolCache::new(
            PoolCacheConfig::default()
                .with_enabled(true)
                .with_ttl(Duration::from_millis(50)),
        );
        let key = org_key("alice", "org-a");
        cache.insert(key.clone(), vec![]).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.run_pending_tasks().await;

        assert!(cache.get(&key).await.is_none());
    }
}
