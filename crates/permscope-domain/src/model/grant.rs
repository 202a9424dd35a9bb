//! Grants (permissions an actor holds) and role bundles.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

use super::permission::{Entity, Permission};

/// The concrete scope instance a grant is bound to.
///
/// Exactly one id is carried, and its kind always matches the grant's
/// permission entity. Organization grants carry none beyond the
/// organization id on the grant itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScopeBinding {
    Organization,
    Environment { env_type: String },
    Project { project_id: String },
    Branch { branch_id: String },
}

impl ScopeBinding {
    /// The entity this binding belongs to.
    pub fn entity(&self) -> Entity {
        match self {
            ScopeBinding::Organization => Entity::Organization,
            ScopeBinding::Environment { .. } => Entity::Environment,
            ScopeBinding::Project { .. } => Entity::Project,
            ScopeBinding::Branch { .. } => Entity::Branch,
        }
    }
}

/// A permission the actor actually holds, bound to a scope instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub organization_id: String,
    pub binding: ScopeBinding,
    pub permission: Permission,
}

impl Grant {
    /// Creates a grant, checking that the binding matches the permission entity.
    pub fn new(
        organization_id: impl Into<String>,
        binding: ScopeBinding,
        permission: Permission,
    ) -> DomainResult<Self> {
        if binding.entity() != permission.entity {
            return Err(DomainError::InvalidGrant {
                message: format!(
                    "{} grant '{}' cannot be bound to a {} scope",
                    permission.entity,
                    permission,
                    binding.entity()
                ),
            });
        }
        Ok(Self {
            organization_id: organization_id.into(),
            binding,
            permission,
        })
    }

    /// An organization-level grant.
    pub fn organization(
        organization_id: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            binding: ScopeBinding::Organization,
            permission: Permission::new(Entity::Organization, resource, action),
        }
    }

    /// The superuser grant for an organization.
    pub fn owner(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            binding: ScopeBinding::Organization,
            permission: Permission::owner(),
        }
    }

    /// An environment-level grant.
    pub fn environment(
        organization_id: impl Into<String>,
        env_type: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            binding: ScopeBinding::Environment {
                env_type: env_type.into(),
            },
            permission: Permission::new(Entity::Environment, resource, action),
        }
    }

    /// A project-level grant.
    pub fn project(
        organization_id: impl Into<String>,
        project_id: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            binding: ScopeBinding::Project {
                project_id: project_id.into(),
            },
            permission: Permission::new(Entity::Project, resource, action),
        }
    }

    /// A branch-level grant.
    pub fn branch(
        organization_id: impl Into<String>,
        branch_id: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            binding: ScopeBinding::Branch {
                branch_id: branch_id.into(),
            },
            permission: Permission::new(Entity::Branch, resource, action),
        }
    }

    pub fn entity(&self) -> Entity {
        self.permission.entity
    }

    /// Returns `true` if this is the superuser grant.
    pub fn is_owner(&self) -> bool {
        self.permission.is_owner()
    }

    pub fn project_id(&self) -> Option<&str> {
        match &self.binding {
            ScopeBinding::Project { project_id } => Some(project_id),
            _ => None,
        }
    }

    pub fn branch_id(&self) -> Option<&str> {
        match &self.binding {
            ScopeBinding::Branch { branch_id } => Some(branch_id),
            _ => None,
        }
    }

    pub fn env_type(&self) -> Option<&str> {
        match &self.binding {
            ScopeBinding::Environment { env_type } => Some(env_type),
            _ => None,
        }
    }

    /// Converts to the wire shape.
    pub fn to_record(&self) -> GrantRecord {
        GrantRecord {
            organization_id: self.organization_id.clone(),
            env_type: self.env_type().map(str::to_string),
            project_id: self.project_id().map(str::to_string),
            branch_id: self.branch_id().map(str::to_string),
            permission: PermissionRecord {
                entity: self.permission.entity.to_string(),
                resource: self.permission.resource.clone(),
                action: self.permission.action.clone(),
            },
        }
    }
}

/// Permission as returned by the remote permissions API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub entity: String,
    pub resource: String,
    pub action: String,
}

/// Grant as returned by the remote permissions API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    pub permission: PermissionRecord,
}

impl TryFrom<GrantRecord> for Grant {
    type Error = DomainError;

    fn try_from(record: GrantRecord) -> Result<Self, Self::Error> {
        let entity: Entity = record.permission.entity.parse()?;
        if record.permission.resource.is_empty() || record.permission.action.is_empty() {
            return Err(DomainError::InvalidGrant {
                message: "permission resource and action cannot be empty".to_string(),
            });
        }
        let permission = Permission::new(
            entity,
            record.permission.resource,
            record.permission.action,
        );

        let binding = match (
            entity,
            record.env_type,
            record.project_id,
            record.branch_id,
        ) {
            (Entity::Organization, None, None, None) => ScopeBinding::Organization,
            (Entity::Environment, Some(env_type), None, None) => {
                ScopeBinding::Environment { env_type }
            }
            (Entity::Project, None, Some(project_id), None) => {
                ScopeBinding::Project { project_id }
            }
            (Entity::Branch, None, None, Some(branch_id)) => ScopeBinding::Branch { branch_id },
            (entity, ..) => {
                return Err(DomainError::InvalidGrant {
                    message: format!(
                        "{entity} grant '{permission}' must carry exactly the {entity} scope id"
                    ),
                })
            }
        };

        if record.organization_id.is_empty() {
            return Err(DomainError::InvalidGrant {
                message: "organization_id cannot be empty".to_string(),
            });
        }

        Ok(Self {
            organization_id: record.organization_id,
            binding,
            permission,
        })
    }
}

/// A named bundle of permissions sharing one entity.
///
/// Roles are flattened into grants on assignment; resolution never sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub role_type: Entity,
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Creates a role, checking that every permission matches `role_type`.
    pub fn new(
        name: impl Into<String>,
        role_type: Entity,
        permissions: Vec<Permission>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if let Some(p) = permissions.iter().find(|p| p.entity != role_type) {
            return Err(DomainError::InvalidRole {
                message: format!("role '{name}' of type {role_type} cannot include '{p}'"),
            });
        }
        Ok(Self {
            name,
            role_type,
            permissions,
        })
    }

    /// Flattens the role into grants bound to one scope instance.
    pub fn grants_for(
        &self,
        organization_id: &str,
        binding: &ScopeBinding,
    ) -> DomainResult<Vec<Grant>> {
        self.permissions
            .iter()
            .map(|p| Grant::new(organization_id, binding.clone(), p.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entity: &str) -> GrantRecord {
        GrantRecord {
            organization_id: "org-a".to_string(),
            env_type: None,
            project_id: None,
            branch_id: None,
            permission: PermissionRecord {
                entity: entity.to_string(),
                resource: "settings".to_string(),
                action: "read".to_string(),
            },
        }
    }

    #[test]
    fn test_organization_record_converts() {
        let grant = Grant::try_from(record("organization")).unwrap();
        assert_eq!(grant.binding, ScopeBinding::Organization);
        assert_eq!(grant.entity(), Entity::Organization);
    }

    #[test]
    fn test_branch_record_requires_branch_id() {
        assert!(Grant::try_from(record("branch")).is_err());

        let mut rec = record("branch");
        rec.branch_id = Some("b1".to_string());
        let grant = Grant::try_from(rec).unwrap();
        assert_eq!(grant.branch_id(), Some("b1"));
    }

    #[test]
    fn test_record_with_mismatched_scope_id_is_rejected() {
        let mut rec = record("project");
        rec.branch_id = Some("b1".to_string());
        let err = Grant::try_from(rec).unwrap_err();
        assert!(matches!(err, DomainError::InvalidGrant { .. }));

        let mut rec = record("organization");
        rec.env_type = Some("production".to_string());
        assert!(Grant::try_from(rec).is_err());
    }

    #[test]
    fn test_record_with_two_scope_ids_is_rejected() {
        let mut rec = record("project");
        rec.project_id = Some("p1".to_string());
        rec.branch_id = Some("b1".to_string());
        assert!(Grant::try_from(rec).is_err());
    }

    #[test]
    fn test_record_with_unknown_entity_is_rejected() {
        let err = Grant::try_from(record("team")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidEntity { .. }));
    }

    #[test]
    fn test_to_record_inverts_conversion() {
        let grant = Grant::environment("org-a", "production", "backups", "*");
        let back = Grant::try_from(grant.to_record()).unwrap();
        assert_eq!(back, grant);
    }

    #[test]
    fn test_record_deserializes_from_wire_json() {
        let json = r#"{
            "organization_id": "org-a",
            "project_id": "p1",
            "permission": {"entity": "project", "resource": "settings", "action": "read"}
        }"#;
        let rec: GrantRecord = serde_json::from_str(json).unwrap();
        let grant = Grant::try_from(rec).unwrap();
        assert_eq!(grant.project_id(), Some("p1"));
    }

    #[test]
    fn test_grant_new_rejects_mismatched_binding() {
        let err = Grant::new(
            "org-a",
            ScopeBinding::Project {
                project_id: "p1".to_string(),
            },
            Permission::new(Entity::Branch, "auth", "admin"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be bound"));
    }

    #[test]
    fn test_role_flattens_into_grants() {
        let role = Role::new(
            "branch-admin",
            Entity::Branch,
            vec![
                Permission::new(Entity::Branch, "auth", "admin"),
                Permission::new(Entity::Branch, "rls", "*"),
            ],
        )
        .unwrap();
        let grants = role
            .grants_for(
                "org-a",
                &ScopeBinding::Branch {
                    branch_id: "b1".to_string(),
                },
            )
            .unwrap();
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|g| g.branch_id() == Some("b1")));
    }

    #[test]
    fn test_role_rejects_foreign_entity_permission() {
        let err = Role::new(
            "mixed",
            Entity::Project,
            vec![Permission::new(Entity::Branch, "auth", "admin")],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRole { .. }));
    }
}
