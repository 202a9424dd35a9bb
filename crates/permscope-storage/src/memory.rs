//! In-memory storage implementation.
//!
//! Grants are kept per actor in a `HashSet<Grant>`, so assigning the same
//! grant twice is idempotent and revocation is O(1) per grant.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use permscope_domain::model::{BranchRecord, Grant, ProjectRecord};

use crate::error::{StorageError, StorageResult};
use crate::traits::{validate_id, GrantFilter, Organization, PermissionStore};

/// In-memory implementation of PermissionStore.
///
/// # Performance Characteristics
///
/// - **Assign/revoke grant**: O(1) average (HashSet insert/remove)
/// - **Read grants**: O(N) over the actor's grants, or all grants when the
///   filter sets no actor
/// - **List projects/branches**: O(P) / O(B) linear scan
///
/// Uses DashMap for thread-safe concurrent access without a global lock.
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    organizations: DashMap<String, Organization>,
    /// Projects keyed by project id; ids are unique across organizations.
    projects: DashMap<String, ProjectRecord>,
    /// Branches keyed by branch id.
    branches: DashMap<String, BranchRecord>,
    /// Grants keyed by actor.
    grants: DashMap<String, HashSet<Grant>>,
}

impl MemoryPermissionStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn require_organization(&self, organization_id: &str) -> StorageResult<()> {
        if self.organizations.contains_key(organization_id) {
            Ok(())
        } else {
            Err(StorageError::OrganizationNotFound {
                organization_id: organization_id.to_string(),
            })
        }
    }

    fn require_project(&self, organization_id: &str, project_id: &str) -> StorageResult<()> {
        match self.projects.get(project_id) {
            Some(project) if project.organization_id == organization_id => Ok(()),
            _ => Err(StorageError::ProjectNotFound {
                project_id: project_id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    #[instrument(skip(self))]
    async fn create_organization(&self, id: &str, name: &str) -> StorageResult<Organization> {
        validate_id("organization", id)?;
        if name.trim().is_empty() {
            return Err(StorageError::InvalidInput {
                message: "organization name cannot be empty".to_string(),
            });
        }

        let organization = Organization {
            id: id.to_string(),
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };

        // Atomic entry API prevents a race between the check and the insert
        match self.organizations.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateOrganization {
                organization_id: id.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(organization.clone());
                Ok(organization)
            }
        }
    }

    #[instrument(skip(self))]
    async fn create_project(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> StorageResult<ProjectRecord> {
        validate_id("project", project_id)?;
        self.require_organization(organization_id)?;

        let project = ProjectRecord::new(project_id, organization_id);
        match self.projects.entry(project_id.to_string()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateProject {
                project_id: project_id.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(project.clone());
                Ok(project)
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_project(&self, organization_id: &str, project_id: &str) -> StorageResult<()> {
        self.require_project(organization_id, project_id)?;
        self.projects.remove(project_id);
        self.branches.retain(|_, branch| branch.project_id != project_id);
        debug!("project deleted, grants bound to it are retained");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_branch(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> StorageResult<BranchRecord> {
        validate_id("branch", branch_id)?;
        if !self.projects.contains_key(project_id) {
            return Err(StorageError::ProjectNotFound {
                project_id: project_id.to_string(),
            });
        }

        let branch = BranchRecord::new(branch_id, project_id);
        match self.branches.entry(branch_id.to_string()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateBranch {
                branch_id: branch_id.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(branch.clone());
                Ok(branch)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_projects(&self, organization_id: &str) -> StorageResult<Vec<ProjectRecord>> {
        self.require_organization(organization_id)?;
        let mut projects: Vec<ProjectRecord> = self
            .projects
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .map(|p| p.value().clone())
            .collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    #[instrument(skip(self))]
    async fn list_branches(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> StorageResult<Vec<BranchRecord>> {
        self.require_project(organization_id, project_id)?;
        let mut branches: Vec<BranchRecord> = self
            .branches
            .iter()
            .filter(|b| b.project_id == project_id)
            .map(|b| b.value().clone())
            .collect();
        branches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(branches)
    }

    #[instrument(skip(self, grants), fields(count = grants.len()))]
    async fn assign_grants(&self, actor: &str, grants: Vec<Grant>) -> StorageResult<()> {
        validate_id("actor", actor)?;
        for grant in &grants {
            self.require_organization(&grant.organization_id)?;
        }

        let mut held = self.grants.entry(actor.to_string()).or_default();
        held.extend(grants);
        Ok(())
    }

    #[instrument(skip(self, grants), fields(count = grants.len()))]
    async fn revoke_grants(&self, actor: &str, grants: Vec<Grant>) -> StorageResult<()> {
        if let Some(mut held) = self.grants.get_mut(actor) {
            for grant in &grants {
                held.remove(grant);
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_grants(&self, filter: &GrantFilter) -> StorageResult<Vec<Grant>> {
        let collect = |actor: &str, held: &HashSet<Grant>| -> Vec<Grant> {
            held.iter()
                .filter(|g| filter.matches(actor, g))
                .cloned()
                .collect()
        };

        let grants = match filter.actor.as_deref() {
            Some(actor) => self
                .grants
                .get(actor)
                .map(|held| collect(actor, held.value()))
                .unwrap_or_default(),
            None => self
                .grants
                .iter()
                .flat_map(|entry| collect(entry.key(), entry.value()))
                .collect(),
        };
        Ok(grants)
    }
}
