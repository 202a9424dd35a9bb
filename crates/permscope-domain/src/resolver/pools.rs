//! Grant pool resolvers, one per scope level.
//!
//! Each pool is fetched independently and filtered to the current scope:
//!
//! | Level        | Requires            | Filter                                        |
//! |--------------|---------------------|-----------------------------------------------|
//! | organization | organization        | same organization                             |
//! | environment  | organization        | environment entity, same organization         |
//! | project      | organization        | project entity, project in org directory      |
//! | branch       | organization, project | branch entity, branch in project directory  |
//!
//! The environment pool is not narrowed by `env_type`: an environment grant
//! applies to every environment of its organization.
//!
//! Fetch errors and timeouts never escape: they resolve to a
//! [`PoolStatus::Failed`](super::PoolStatus) pool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{PoolCache, PoolKey};
use crate::error::{DomainError, DomainResult};
use crate::model::{BranchRecord, Entity, Grant, ProjectRecord, ScopeContext};

use super::config::EngineConfig;
use super::traits::{DirectoryReader, GrantReader};
use super::types::GrantPool;

/// Keeps grants bound to `organization_id`.
pub fn filter_organization_pool(grants: Vec<Grant>, organization_id: &str) -> Vec<Grant> {
    grants
        .into_iter()
        .filter(|g| g.organization_id == organization_id)
        .collect()
}

/// Keeps environment grants bound to `organization_id`, for any environment.
pub fn filter_environment_pool(grants: Vec<Grant>, organization_id: &str) -> Vec<Grant> {
    grants
        .into_iter()
        .filter(|g| g.entity() == Entity::Environment && g.organization_id == organization_id)
        .collect()
}

/// Keeps project grants whose project is listed under `organization_id`.
pub fn filter_project_pool(
    grants: Vec<Grant>,
    organization_id: &str,
    projects: &[ProjectRecord],
) -> Vec<Grant> {
    let members: HashSet<&str> = projects
        .iter()
        .filter(|p| p.organization_id == organization_id)
        .map(|p| p.id.as_str())
        .collect();

    grants
        .into_iter()
        .filter(|g| g.entity() == Entity::Project)
        .filter(|g| g.project_id().is_some_and(|id| members.contains(id)))
        .collect()
}

/// Keeps branch grants whose branch is listed under `project_id`.
pub fn filter_branch_pool(
    grants: Vec<Grant>,
    project_id: &str,
    branches: &[BranchRecord],
) -> Vec<Grant> {
    let members: HashSet<&str> = branches
        .iter()
        .filter(|b| b.project_id == project_id)
        .map(|b| b.id.as_str())
        .collect();

    grants
        .into_iter()
        .filter(|g| g.entity() == Entity::Branch)
        .filter(|g| g.branch_id().is_some_and(|id| members.contains(id)))
        .collect()
}

/// The error reported for a fetch that exceeded `limit`, saturating at
/// `u64::MAX` milliseconds.
fn timeout_error(limit: Duration) -> DomainError {
    DomainError::Timeout {
        duration_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Builds the key identifying a pool, or `None` if the scope lacks the ids
/// the level requires.
pub fn pool_key(actor: &str, level: Entity, scope: &ScopeContext) -> Option<PoolKey> {
    let organization_id = scope.organization()?;
    let project_id = match level {
        Entity::Branch => Some(scope.project()?.to_string()),
        _ => None,
    };
    Some(PoolKey::new(actor, level, organization_id, project_id))
}

/// Resolves grant pools through the grant and directory collaborators.
pub struct PoolResolver<G, D> {
    grants: Arc<G>,
    directory: Arc<D>,
    config: EngineConfig,
}

impl<G, D> PoolResolver<G, D>
where
    G: GrantReader + 'static,
    D: DirectoryReader + 'static,
{
    pub fn new(grants: Arc<G>, directory: Arc<D>, config: EngineConfig) -> Self {
        Self {
            grants,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn cache(&self) -> Option<&PoolCache> {
        self.config
            .cache
            .as_deref()
            .filter(|cache| cache.is_enabled())
    }

    /// Resolves one pool for `actor` under `scope`.
    ///
    /// Returns a blocked pool without fetching when required ids are missing.
    pub async fn resolve(&self, level: Entity, actor: &str, scope: &ScopeContext) -> GrantPool {
        let Some(key) = pool_key(actor, level, scope) else {
            debug!(%level, %scope, "grant pool blocked on missing scope context");
            return GrantPool::blocked(level);
        };

        if let Some(cache) = self.cache() {
            if let Some(grants) = cache.get(&key).await {
                return GrantPool::ready(level, grants.as_ref().clone());
            }
        }

        let pool = match timeout(self.config.fetch_timeout, self.fetch(&key)).await {
            Ok(Ok(grants)) => GrantPool::ready(level, grants),
            Ok(Err(e)) => {
                warn!(%level, %scope, error = %e, "grant pool fetch failed");
                GrantPool::failed(level, e.to_string())
            }
            Err(_) => {
                let e = timeout_error(self.config.fetch_timeout);
                warn!(%level, %scope, error = %e, "grant pool fetch timed out");
                GrantPool::failed(level, e.to_string())
            }
        };

        if pool.is_success() {
            if let Some(cache) = self.cache() {
                cache.insert(key, pool.grants.clone()).await;
            }
        }

        pool
    }

    /// Fetches grants for the key's level and applies the membership join.
    async fn fetch(&self, key: &PoolKey) -> DomainResult<Vec<Grant>> {
        let actor = key.actor.as_str();
        let org = key.organization_id.as_str();

        match key.level {
            Entity::Organization => {
                let grants = self.grants.read_grants(actor, key.level, org).await?;
                Ok(filter_organization_pool(grants, org))
            }
            Entity::Environment => {
                let grants = self.grants.read_grants(actor, key.level, org).await?;
                Ok(filter_environment_pool(grants, org))
            }
            Entity::Project => {
                let (grants, projects) = try_join(
                    self.grants.read_grants(actor, key.level, org),
                    self.directory.list_projects(org),
                )
                .await?;
                Ok(filter_project_pool(grants, org, &projects))
            }
            Entity::Branch => {
                let project_id = key.project_id.as_deref().unwrap_or_default();
                let (grants, branches) = try_join(
                    self.grants.read_grants(actor, key.level, org),
                    self.directory.list_branches(org, project_id),
                )
                .await?;
                Ok(filter_branch_pool(grants, project_id, &branches))
            }
        }
    }
}
