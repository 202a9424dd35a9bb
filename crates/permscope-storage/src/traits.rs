//! PermissionStore trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use permscope_domain::model::{BranchRecord, Entity, Grant, ProjectRecord, Role, ScopeBinding};

use crate::error::{StorageError, StorageResult};

/// Maximum length for organization, project, branch and actor ids.
pub const MAX_ID_LENGTH: usize = 128;

/// Filter for reading grants.
#[derive(Debug, Clone, Default)]
pub struct GrantFilter {
    /// Filter by actor.
    pub actor: Option<String>,
    /// Filter by the organization the grant is bound to.
    pub organization_id: Option<String>,
    /// Filter by permission entity.
    pub entity: Option<Entity>,
}

impl GrantFilter {
    pub fn for_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..Default::default()
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Returns true if `grant`, held by `actor`, passes every set field.
    pub fn matches(&self, actor: &str, grant: &Grant) -> bool {
        self.actor.as_deref().map_or(true, |a| a == actor)
            && self
                .organization_id
                .as_deref()
                .map_or(true, |org| org == grant.organization_id)
            && self.entity.map_or(true, |e| e == grant.entity())
    }
}

/// Organization metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Validates an id used as a storage key.
pub fn validate_id(kind: &str, id: &str) -> StorageResult<()> {
    if id.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} id cannot be empty"),
        });
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} id exceeds maximum length of {MAX_ID_LENGTH} characters"),
        });
    }
    if id.contains(char::is_whitespace) || id.contains(':') {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} id '{id}' cannot contain whitespace or ':'"),
        });
    }
    Ok(())
}

/// Abstract storage interface for permission data.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations.
#[async_trait]
pub trait PermissionStore: Send + Sync + 'static {
    // Directory operations

    /// Creates a new organization.
    async fn create_organization(&self, id: &str, name: &str) -> StorageResult<Organization>;

    /// Creates a project inside an existing organization.
    async fn create_project(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> StorageResult<ProjectRecord>;

    /// Deletes a project and its branches. Grants bound to it are kept.
    async fn delete_project(&self, organization_id: &str, project_id: &str) -> StorageResult<()>;

    /// Creates a branch inside an existing project.
    async fn create_branch(&self, project_id: &str, branch_id: &str)
        -> StorageResult<BranchRecord>;

    /// Lists the projects of an organization.
    async fn list_projects(&self, organization_id: &str) -> StorageResult<Vec<ProjectRecord>>;

    /// Lists the branches of a project within an organization.
    async fn list_branches(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> StorageResult<Vec<BranchRecord>>;

    // Grant operations

    /// Assigns grants to an actor. Assigning a held grant is a no-op.
    async fn assign_grants(&self, actor: &str, grants: Vec<Grant>) -> StorageResult<()>;

    /// Revokes grants from an actor. Revoking an absent grant is a no-op.
    async fn revoke_grants(&self, actor: &str, grants: Vec<Grant>) -> StorageResult<()>;

    /// Reads grants matching the filter.
    async fn read_grants(&self, filter: &GrantFilter) -> StorageResult<Vec<Grant>>;

    /// Flattens a role into grants bound to `binding` and assigns them.
    async fn assign_role(
        &self,
        actor: &str,
        organization_id: &str,
        role: &Role,
        binding: &ScopeBinding,
    ) -> StorageResult<()> {
        let grants = role.grants_for(organization_id, binding)?;
        self.assign_grants(actor, grants).await
    }
}
