//! Aggregate permission resolver.
//!
//! Combines the independently loaded grant pools relevant to a required
//! permission and applies the decision algorithm.
//!
//! # Pool relevance
//!
//! The organization pool is always consulted, since it carries the superuser
//! grant. Each other entity adds exactly its own pool:
//!
//! | Required entity | Pools                       |
//! |-----------------|-----------------------------|
//! | organization    | organization                |
//! | environment     | organization, environment   |
//! | project         | organization, project       |
//! | branch          | organization, branch        |
//!
//! Relevant pools are resolved concurrently, then reduced by the pure
//! [`reduce_outcome`]: `is_loading` is the OR and `is_success` the AND over
//! those pools. A failed pool contributes no grants, so `can` reflects
//! whatever did load.

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, Stream};
use tracing::{debug, instrument};

use crate::model::{Entity, Permission, ScopeContext};

use super::config::EngineConfig;
use super::decision::has_permission;
use super::pools::PoolResolver;
use super::traits::{DirectoryReader, GrantReader};
use super::types::{CheckOutcome, CheckRequest, GrantPool};

const ORGANIZATION_POOLS: &[Entity] = &[Entity::Organization];
const ENVIRONMENT_POOLS: &[Entity] = &[Entity::Organization, Entity::Environment];
const PROJECT_POOLS: &[Entity] = &[Entity::Organization, Entity::Project];
const BRANCH_POOLS: &[Entity] = &[Entity::Organization, Entity::Branch];

/// The pools consulted for a permission of `entity`.
pub fn relevant_pools(entity: Entity) -> &'static [Entity] {
    match entity {
        Entity::Organization => ORGANIZATION_POOLS,
        Entity::Environment => ENVIRONMENT_POOLS,
        Entity::Project => PROJECT_POOLS,
        Entity::Branch => BRANCH_POOLS,
    }
}

/// Reduces resolved pools into an outcome.
pub fn reduce_outcome(
    required: &Permission,
    organization_id: &str,
    pools: &[GrantPool],
) -> CheckOutcome {
    let grants = pools.iter().flat_map(|pool| pool.grants.iter());
    CheckOutcome {
        can: has_permission(required, organization_id, grants),
        is_loading: pools.iter().any(GrantPool::is_loading),
        is_success: pools.iter().all(GrantPool::is_success),
    }
}

/// What a check needs before it can be answered.
#[derive(Debug, Clone)]
pub enum CheckPlan<'a> {
    /// Answered without touching any pool.
    Settled(CheckOutcome),
    /// Answered once `levels` are resolved for `actor`.
    Resolve {
        actor: &'a str,
        required: &'a Permission,
        levels: &'static [Entity],
    },
}

/// Permission engine over grant and directory collaborators.
pub struct PermissionEngine<G, D> {
    pools: PoolResolver<G, D>,
}

impl<G, D> PermissionEngine<G, D>
where
    G: GrantReader + 'static,
    D: DirectoryReader + 'static,
{
    /// Creates a new engine with default configuration.
    pub fn new(grants: Arc<G>, directory: Arc<D>) -> Self {
        Self::with_config(grants, directory, EngineConfig::default())
    }

    /// Creates a new engine with custom configuration.
    pub fn with_config(grants: Arc<G>, directory: Arc<D>, config: EngineConfig) -> Self {
        Self {
            pools: PoolResolver::new(grants, directory, config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.pools.config()
    }

    /// Decides which pools a request needs, or settles it immediately.
    ///
    /// A request without a permission is allowed outright; an
    /// unauthenticated one is reported as still loading, never as a
    /// definitive denial.
    pub fn plan<'a>(&self, request: &'a CheckRequest) -> CheckPlan<'a> {
        let Some(required) = request.permission.as_ref() else {
            debug!(scope = %request.scope, "no permission required, allowing");
            return CheckPlan::Settled(CheckOutcome::UNRESTRICTED);
        };
        let Some(actor) = request.actor.as_deref() else {
            return CheckPlan::Settled(CheckOutcome::UNAUTHENTICATED);
        };
        CheckPlan::Resolve {
            actor,
            required,
            levels: relevant_pools(required.entity),
        }
    }

    /// Checks whether the request's actor holds its permission.
    #[instrument(
        skip_all,
        fields(
            actor = ?request.actor,
            permission = ?request.permission.as_ref().map(Permission::encode),
            scope = %request.scope,
        )
    )]
    pub async fn check_permission(&self, request: &CheckRequest) -> CheckOutcome {
        match self.plan(request) {
            CheckPlan::Settled(outcome) => outcome,
            CheckPlan::Resolve {
                actor,
                required,
                levels,
            } => {
                let pools = self.resolve_pools(actor, levels, &request.scope).await;
                let outcome = reduce_outcome(required, &request.scope.organization_id, &pools);
                debug!(
                    can = outcome.can,
                    is_loading = outcome.is_loading,
                    is_success = outcome.is_success,
                    "permission checked"
                );
                outcome
            }
        }
    }

    /// Resolves a single pool.
    pub async fn resolve_pool(&self, level: Entity, actor: &str, scope: &ScopeContext) -> GrantPool {
        self.pools.resolve(level, actor, scope).await
    }

    /// Resolves `levels` concurrently, returning pools in the same order.
    pub async fn resolve_pools(
        &self,
        actor: &str,
        levels: &[Entity],
        scope: &ScopeContext,
    ) -> Vec<GrantPool> {
        join_all(
            levels
                .iter()
                .map(|level| self.pools.resolve(*level, actor, scope)),
        )
        .await
    }

    /// Resolves `levels` concurrently, yielding each pool as it completes.
    pub fn resolve_pools_unordered<'a>(
        &'a self,
        actor: &'a str,
        levels: &'a [Entity],
        scope: &'a ScopeContext,
    ) -> impl Stream<Item = GrantPool> + Send + Unpin + 'a {
        levels
            .iter()
            .map(|level| self.pools.resolve(*level, actor, scope))
            .collect::<FuturesUnordered<_>>()
    }
}
