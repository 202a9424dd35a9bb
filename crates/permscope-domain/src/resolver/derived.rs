//! Queries derived from the pool and decision primitives.

use std::collections::HashSet;

use futures::future::join;

use crate::model::{Entity, Grant, Permission, ScopeContext};

use super::decision::{grant_matches, has_permission};
use super::engine::PermissionEngine;
use super::traits::{DirectoryReader, GrantReader};
use super::types::{FilterOutcome, OwnerOutcome};

/// Project ids of project-pool grants that satisfy `permission`.
pub fn permitted_project_ids<'a>(
    permission: &Permission,
    project_pool: &'a [Grant],
) -> HashSet<&'a str> {
    project_pool
        .iter()
        .filter(|g| grant_matches(permission, g))
        .filter_map(Grant::project_id)
        .collect()
}

/// Keeps items whose key is permitted, or every item for an owner.
pub fn filter_items<T, F>(items: Vec<T>, is_owner: bool, permitted: &HashSet<&str>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    if is_owner {
        return items;
    }
    items
        .into_iter()
        .filter(|item| permitted.contains(key(item)))
        .collect()
}

impl<G, D> PermissionEngine<G, D>
where
    G: GrantReader + 'static,
    D: DirectoryReader + 'static,
{
    /// Whether the actor holds the superuser grant for the scope's organization.
    ///
    /// Consults only the organization pool.
    pub async fn is_organization_owner(
        &self,
        actor: Option<&str>,
        scope: &ScopeContext,
    ) -> OwnerOutcome {
        let Some(actor) = actor else {
            return OwnerOutcome {
                is_owner: false,
                is_loading: true,
                is_success: false,
            };
        };

        let pool = self
            .resolve_pool(Entity::Organization, actor, scope)
            .await;
        OwnerOutcome {
            is_owner: has_permission(&Permission::owner(), &scope.organization_id, &pool.grants),
            is_loading: pool.is_loading(),
            is_success: pool.is_success(),
        }
    }

    /// Filters `items` to those the actor may act on with `permission`.
    ///
    /// An item passes if the actor is organization owner, or if its key is
    /// the project id of a matching project-pool grant. Unauthenticated
    /// actors get an empty, still-loading result.
    pub async fn filter_by_permission<T, F>(
        &self,
        actor: Option<&str>,
        scope: &ScopeContext,
        permission: &Permission,
        items: Vec<T>,
        key: F,
    ) -> FilterOutcome<T>
    where
        F: Fn(&T) -> &str,
    {
        let Some(actor) = actor else {
            return FilterOutcome {
                items: Vec::new(),
                is_loading: true,
                is_success: false,
            };
        };

        let (organization_pool, project_pool) = join(
            self.resolve_pool(Entity::Organization, actor, scope),
            self.resolve_pool(Entity::Project, actor, scope),
        )
        .await;

        let is_owner = has_permission(
            &Permission::owner(),
            &scope.organization_id,
            &organization_pool.grants,
        );
        let permitted = permitted_project_ids(permission, &project_pool.grants);

        FilterOutcome {
            items: filter_items(items, is_owner, &permitted, key),
            is_loading: organization_pool.is_loading() || project_pool.is_loading(),
            is_success: organization_pool.is_success() && project_pool.is_success(),
        }
    }
}
