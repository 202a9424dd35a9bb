//! A `PermissionStore` that keeps the engine's pool cache coherent with
//! writes.
//!
//! Every successful write invalidates the cached pools it can affect:
//!
//! | Write                        | Invalidated                     |
//! |------------------------------|---------------------------------|
//! | assign / revoke grants, role | every pool of the actor         |
//! | create / delete project      | every pool of the organization  |
//! | create branch                | every pool                      |
//!
//! Branch writes only carry the project id, so they clear the whole cache.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use permscope_domain::cache::PoolCache;
use permscope_domain::model::{BranchRecord, Grant, ProjectRecord};
use permscope_storage::{GrantFilter, Organization, PermissionStore, StorageResult};

/// Wraps a store and invalidates an optional pool cache after writes.
pub struct CacheInvalidatingStore<S: PermissionStore> {
    inner: Arc<S>,
    cache: Option<Arc<PoolCache>>,
}

impl<S: PermissionStore> CacheInvalidatingStore<S> {
    pub fn new(inner: Arc<S>, cache: Option<Arc<PoolCache>>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    async fn invalidate_actor(&self, actor: &str) {
        if let Some(cache) = &self.cache {
            debug!(actor, "invalidating cached pools for actor");
            cache.invalidate_actor(actor).await;
        }
    }

    async fn invalidate_organization(&self, organization_id: &str) {
        if let Some(cache) = &self.cache {
            debug!(organization_id, "invalidating cached pools for organization");
            cache.invalidate_organization(organization_id).await;
        }
    }

    fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            debug!("invalidating all cached pools");
            cache.invalidate_all();
        }
    }
}

#[async_trait]
impl<S: PermissionStore> PermissionStore for CacheInvalidatingStore<S> {
    async fn create_organization(&self, id: &str, name: &str) -> StorageResult<Organization> {
        self.inner.create_organization(id, name).await
    }

    async fn create_project(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> StorageResult<ProjectRecord> {
        let project = self.inner.create_project(organization_id, project_id).await?;
        self.invalidate_organization(organization_id).await;
        Ok(project)
    }

    async fn delete_project(&self, organization_id: &str, project_id: &str) -> StorageResult<()> {
        self.inner.delete_project(organization_id, project_id).await?;
        self.invalidate_organization(organization_id).await;
        Ok(())
    }

    async fn create_branch(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> StorageResult<BranchRecord> {
        let branch = self.inner.create_branch(project_id, branch_id).await?;
        self.invalidate_all();
        Ok(branch)
    }

    async fn list_projects(&self, organization_id: &str) -> StorageResult<Vec<ProjectRecord>> {
        self.inner.list_projects(organization_id).await
    }

    async fn list_branches(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> StorageResult<Vec<BranchRecord>> {
        self.inner.list_branches(organization_id, project_id).await
    }

    async fn assign_grants(&self, actor: &str, grants: Vec<Grant>) -> StorageResult<()> {
        self.inner.assign_grants(actor, grants).await?;
        self.invalidate_actor(actor).await;
        Ok(())
    }

    async fn revoke_grants(&self, actor: &str, grants: Vec<Grant>) -> StorageResult<()> {
        self.inner.revoke_grants(actor, grants).await?;
        self.invalidate_actor(actor).await;
        Ok(())
    }

    async fn read_grants(&self, filter: &GrantFilter) -> StorageResult<Vec<Grant>> {
        self.inner.read_grants(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{StoreDirectoryReader, StoreGrantReader};
    use permscope_domain::cache::PoolCacheConfig;
    use permscope_domain::model::{Permission, ScopeContext};
    use permscope_domain::resolver::{CheckRequest, EngineConfig, PermissionEngine};
    use permscope_storage::MemoryPermissionStore;

    type Store = CacheInvalidatingStore<MemoryPermissionStore>;
    type CachedEngine = PermissionEngine<StoreGrantReader<Store>, StoreDirectoryReader<Store>>;

    async fn setup() -> (Arc<Store>, Arc<PoolCache>, CachedEngine) {
        let cache = Arc::new(PoolCache::new(PoolCacheConfig::default().with_enabled(true)));
        let store = Arc::new(CacheInvalidatingStore::new(
            MemoryPermissionStore::new_shared(),
            Some(Arc::clone(&cache)),
        ));
        store.create_organization("org-a", "Acme").await.unwrap();
        store.create_project("org-a", "p1").await.unwrap();
        store.create_branch("p1", "b1").await.unwrap();

        let engine = PermissionEngine::with_config(
            Arc::new(StoreGrantReader::new(Arc::clone(&store))),
            Arc::new(StoreDirectoryReader::new(Arc::clone(&store))),
            EngineConfig::default().with_cache(Arc::clone(&cache)),
        );
        (store, cache, engine)
    }

    fn project_request() -> CheckRequest {
        CheckRequest::new(
            "alice",
            Permission::decode("project:settings:read").unwrap(),
            ScopeContext::new("org-a").with_project("p1"),
        )
    }

    #[tokio::test]
    async fn test_deleting_project_drops_cached_project_pool() {
        let (store, _cache, engine) = setup().await;
        store
            .assign_grants(
                "alice",
                vec![Grant::project("org-a", "p1", "settings", "read")],
            )
            .await
            .unwrap();
        let request = project_request();
        assert!(engine.check_permission(&request).await.can);

        store.delete_project("org-a", "p1").await.unwrap();

        let outcome = engine.check_permission(&request).await;
        assert!(!outcome.can);
        assert!(outcome.is_success);
    }

    #[tokio::test]
    async fn test_revoking_grant_drops_cached_pool() {
        let (store, _cache, engine) = setup().await;
        let grant = Grant::project("org-a", "p1", "settings", "read");
        store.assign_grants("alice", vec![grant.clone()]).await.unwrap();
        let request = project_request();
        assert!(engine.check_permission(&request).await.can);

        store.revoke_grants("alice", vec![grant]).await.unwrap();

        assert!(!engine.check_permission(&request).await.can);
    }

    #[tokio::test]
    async fn test_assigning_grant_is_visible_without_waiting_for_ttl() {
        let (store, _cache, engine) = setup().await;
        let request = CheckRequest::new(
            "alice",
            Permission::decode("branch:auth:admin").unwrap(),
            ScopeContext::new("org-a").with_project("p1").with_branch("b1"),
        );
        assert!(!engine.check_permission(&request).await.can);

        store
            .assign_grants("alice", vec![Grant::branch("org-a", "b1", "auth", "admin")])
            .await
            .unwrap();

        assert!(engine.check_permission(&request).await.can);
    }

    #[tokio::test]
    async fn test_creating_branch_clears_cache() {
        let (store, cache, engine) = setup().await;
        store
            .assign_grants("alice", vec![Grant::branch("org-a", "b2", "auth", "admin")])
            .await
            .unwrap();
        let request = CheckRequest::new(
            "alice",
            Permission::decode("branch:auth:admin").unwrap(),
            ScopeContext::new("org-a").with_project("p1").with_branch("b2"),
        );
        assert!(!engine.check_permission(&request).await.can);

        store.create_branch("p1", "b2").await.unwrap();
        cache.run_pending_tasks().await;

        assert!(engine.check_permission(&request).await.can);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_alone() {
        let (store, cache, engine) = setup().await;
        store
            .assign_grants(
                "alice",
                vec![Grant::project("org-a", "p1", "settings", "read")],
            )
            .await
            .unwrap();
        engine.check_permission(&project_request()).await;
        cache.run_pending_tasks().await;
        let cached = cache.entry_count();
        assert!(cached > 0);

        assert!(store.delete_project("org-a", "missing").await.is_err());
        cache.run_pending_tasks().await;

        assert_eq!(cache.entry_count(), cached);
    }

    #[tokio::test]
    async fn test_without_cache_writes_pass_through() {
        let store = CacheInvalidatingStore::new(MemoryPermissionStore::new_shared(), None);
        store.create_organization("org-a", "Acme").await.unwrap();
        store.create_project("org-a", "p1").await.unwrap();

        let projects = store.inner().list_projects("org-a").await.unwrap();
        assert_eq!(projects, vec![ProjectRecord::new("p1", "org-a")]);
    }
}
