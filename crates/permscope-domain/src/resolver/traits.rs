//! Collaborator traits the resolver fetches grants and directories through.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{BranchRecord, Entity, Grant, ProjectRecord};

/// Source of the actor's grants, queried once per scope level.
#[async_trait]
pub trait GrantReader: Send + Sync {
    /// Reads the grants `actor` holds at `level` within an organization.
    ///
    /// Implementations may return grants of other organizations or levels;
    /// the pool resolvers filter them to the current scope.
    async fn read_grants(
        &self,
        actor: &str,
        level: Entity,
        organization_id: &str,
    ) -> DomainResult<Vec<Grant>>;
}

/// Project and branch directories used for membership joins.
#[async_trait]
pub trait DirectoryReader: Send + Sync {
    /// Lists the projects belonging to an organization.
    async fn list_projects(&self, organization_id: &str) -> DomainResult<Vec<ProjectRecord>>;

    /// Lists the branches belonging to a project.
    async fn list_branches(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> DomainResult<Vec<BranchRecord>>;
}
