//! Permission tuples and their canonical `entity:resource:action` form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Wildcard value matching any resource or action.
pub const WILDCARD: &str = "*";

/// Resource name of the superuser permission.
pub const OWNER_RESOURCE: &str = "owner";

/// Action name of the superuser permission.
pub const OWNER_ACTION: &str = "admin";

/// The scope level a permission applies to.
///
/// Levels form the hierarchy organization → environment → project → branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Organization,
    Environment,
    Project,
    Branch,
}

impl Entity {
    /// All entities in hierarchy order.
    pub const ALL: [Entity; 4] = [
        Entity::Organization,
        Entity::Environment,
        Entity::Project,
        Entity::Branch,
    ];

    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Organization => "organization",
            Entity::Environment => "environment",
            Entity::Project => "project",
            Entity::Branch => "branch",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" | "org" => Ok(Entity::Organization),
            "environment" => Ok(Entity::Environment),
            "project" => Ok(Entity::Project),
            "branch" => Ok(Entity::Branch),
            _ => Err(DomainError::InvalidEntity {
                value: s.to_string(),
            }),
        }
    }
}

/// A capability: `(entity, resource, action)`.
///
/// `resource` and `action` may be the wildcard `"*"`. The entity never is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub entity: Entity,
    pub resource: String,
    pub action: String,
}

impl Permission {
    /// Creates a new permission.
    pub fn new(entity: Entity, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            entity,
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// The superuser permission `organization:owner:admin`.
    pub fn owner() -> Self {
        Self::new(Entity::Organization, OWNER_RESOURCE, OWNER_ACTION)
    }

    /// Returns `true` if this is the superuser permission.
    pub fn is_owner(&self) -> bool {
        self.entity == Entity::Organization
            && self.resource == OWNER_RESOURCE
            && self.action == OWNER_ACTION
    }

    /// Encodes to the canonical `entity:resource:action` string.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes a canonical `entity:resource:action` string.
    ///
    /// Exactly three non-empty segments are required. No escaping exists,
    /// so a colon inside a resource or action cannot be represented.
    ///
    /// The entity segment also accepts the alias `org`, which encodes back
    /// as `organization`. Only canonical strings round-trip unchanged.
    pub fn decode(value: &str) -> DomainResult<Self> {
        let invalid = |reason: &str| DomainError::InvalidPermission {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = value.split(':').collect();
        let [entity, resource, action] = segments.as_slice() else {
            return Err(invalid(&format!(
                "expected 3 segments 'entity:resource:action', got {}",
                segments.len()
            )));
        };

        let entity: Entity = entity
            .parse()
            .map_err(|_| invalid(&format!("unknown entity '{entity}'")))?;
        if resource.is_empty() {
            return Err(invalid("resource cannot be empty"));
        }
        if action.is_empty() {
            return Err(invalid("action cannot be empty"));
        }

        Ok(Self::new(entity, *resource, *action))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.entity, self.resource, self.action)
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
