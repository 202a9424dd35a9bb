//! Seed data: organizations, directories and grant assignments loaded from
//! JSON into a [`PermissionStore`].
//!
//! ```json
//! {
//!   "organizations": [{ "id": "org-a", "name": "Acme" }],
//!   "projects": [{ "id": "p1", "organization_id": "org-a" }],
//!   "branches": [{ "id": "b1", "project_id": "p1" }],
//!   "assignments": [{
//!     "actor": "alice",
//!     "grants": [{
//!       "organization_id": "org-a",
//!       "branch_id": "b1",
//!       "permission": { "entity": "branch", "resource": "auth", "action": "admin" }
//!     }]
//!   }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use permscope_domain::model::{BranchRecord, Grant, GrantRecord, ProjectRecord, Role, ScopeBinding};

use crate::error::{StorageError, StorageResult};
use crate::traits::PermissionStore;

/// An organization to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOrganization {
    pub id: String,
    pub name: String,
}

/// A role assigned at one scope instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRoleAssignment {
    pub organization_id: String,
    pub binding: ScopeBinding,
    pub role: Role,
}

/// Everything one actor is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAssignment {
    pub actor: String,
    #[serde(default)]
    pub grants: Vec<GrantRecord>,
    #[serde(default)]
    pub roles: Vec<SeedRoleAssignment>,
}

/// A complete seed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub organizations: Vec<SeedOrganization>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub branches: Vec<BranchRecord>,
    #[serde(default)]
    pub assignments: Vec<SeedAssignment>,
}

/// Counts of what a seed run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub organizations: usize,
    pub projects: usize,
    pub branches: usize,
    pub grants: usize,
}

impl SeedData {
    /// Parses a seed document.
    pub fn from_json_str(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json).map_err(|e| StorageError::InvalidSeed {
            message: e.to_string(),
        })
    }

    /// Reads and parses a seed file.
    pub fn from_path(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StorageError::InvalidSeed {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Writes the seed into `store`, directories first, then grants.
    ///
    /// Grant records are validated before anything is assigned to their
    /// actor; an invalid record aborts the run.
    pub async fn apply<S: PermissionStore + ?Sized>(&self, store: &S) -> StorageResult<SeedSummary> {
        let mut summary = SeedSummary::default();

        for org in &self.organizations {
            store.create_organization(&org.id, &org.name).await?;
            summary.organizations += 1;
        }
        for project in &self.projects {
            store
                .create_project(&project.organization_id, &project.id)
                .await?;
            summary.projects += 1;
        }
        for branch in &self.branches {
            store.create_branch(&branch.project_id, &branch.id).await?;
            summary.branches += 1;
        }

        for assignment in &self.assignments {
            let grants = assignment
                .grants
                .iter()
                .cloned()
                .map(Grant::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            summary.grants += grants.len();
            store.assign_grants(&assignment.actor, grants).await?;

            for role in &assignment.roles {
                store
                    .assign_role(
                        &assignment.actor,
                        &role.organization_id,
                        &role.role,
                        &role.binding,
                    )
                    .await?;
                summary.grants += role.role.permissions.len();
            }
        }

        info!(
            organizations = summary.organizations,
            projects = summary.projects,
            branches = summary.branches,
            grants = summary.grants,
            "seed data applied"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::memory::MemoryPermissionStore;
    use crate::traits::GrantFilter;
    use permscope_domain::model::Entity;

    const SEED: &str = r#"{
        "organizations": [{ "id": "org-a", "name": "Acme" }],
        "projects": [{ "id": "p1", "organization_id": "org-a" }],
        "branches": [{ "id": "b1", "project_id": "p1" }],
        "assignments": [
            {
                "actor": "alice",
                "grants": [
                    {
                        "organization_id": "org-a",
                        "permission": { "entity": "organization", "resource": "owner", "action": "admin" }
                    }
                ]
            },
            {
                "actor": "bob",
                "roles": [
                    {
                        "organization_id": "org-a",
                        "binding": { "kind": "branch", "branch_id": "b1" },
                        "role": {
                            "name": "developer",
                            "role_type": "branch",
                            "permissions": [
                                { "entity": "branch", "resource": "auth", "action": "admin" },
                                { "entity": "branch", "resource": "*", "action": "read" }
                            ]
                        }
                    }
                ]
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_apply_seed() {
        let seed = SeedData::from_json_str(SEED).unwrap();
        let store = MemoryPermissionStore::new();

        let summary = seed.apply(&store).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                organizations: 1,
                projects: 1,
                branches: 1,
                grants: 3,
            }
        );

        let alice = store
            .read_grants(&GrantFilter::for_actor("alice"))
            .await
            .unwrap();
        assert_eq!(alice, vec![Grant::owner("org-a")]);

        let bob = store
            .read_grants(&GrantFilter::for_actor("bob").with_entity(Entity::Branch))
            .await
            .unwrap();
        assert_eq!(bob.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_grant_record_aborts() {
        let json = r#"{
            "organizations": [{ "id": "org-a", "name": "Acme" }],
            "assignments": [{
                "actor": "alice",
                "grants": [{
                    "organization_id": "org-a",
                    "permission": { "entity": "branch", "resource": "auth", "action": "admin" }
                }]
            }]
        }"#;
        let seed = SeedData::from_json_str(json).unwrap();
        let store = MemoryPermissionStore::new();

        let result = seed.apply(&store).await;
        assert!(matches!(result, Err(StorageError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_demo_seed_applies() {
        let seed = SeedData::from_json_str(include_str!("../../../demos/seed.json")).unwrap();
        let store = MemoryPermissionStore::new();

        let summary = seed.apply(&store).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                organizations: 2,
                projects: 2,
                branches: 2,
                grants: 5,
            }
        );

        let olivia = store
            .read_grants(&GrantFilter::for_actor("olivia"))
            .await
            .unwrap();
        assert_eq!(olivia, vec![Grant::owner("org-a")]);

        let dev = store.read_grants(&GrantFilter::for_actor("dev")).await.unwrap();
        assert_eq!(dev.len(), 4);

        // The branch-developer role flattens into two grants bound to b1
        let dev_branch = store
            .read_grants(&GrantFilter::for_actor("dev").with_entity(Entity::Branch))
            .await
            .unwrap();
        assert_eq!(dev_branch.len(), 2);
        assert!(dev_branch.iter().all(|g| g.branch_id() == Some("b1")));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            SeedData::from_json_str("{ not json"),
            Err(StorageError::InvalidSeed { .. })
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let seed = SeedData::from_path(file.path()).unwrap();
        assert_eq!(seed.organizations.len(), 1);
        assert_eq!(seed.assignments.len(), 2);

        assert!(SeedData::from_path("/nonexistent/seed.json").is_err());
    }
}
