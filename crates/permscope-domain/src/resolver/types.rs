//! Types for the permission resolver.

use std::fmt;

use crate::model::{Entity, Grant, Permission, ScopeContext};

/// Request for a permission check.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// The authenticated actor, `None` when not signed in.
    pub actor: Option<String>,
    /// The required permission, `None` when the caller requires nothing.
    pub permission: Option<Permission>,
    /// The scope the decision is evaluated under.
    pub scope: ScopeContext,
}

impl CheckRequest {
    /// Creates a check for an authenticated actor and a required permission.
    pub fn new(actor: impl Into<String>, permission: Permission, scope: ScopeContext) -> Self {
        Self {
            actor: Some(actor.into()),
            permission: Some(permission),
            scope,
        }
    }

    /// Creates a check from optional parts, as supplied by UI callers.
    pub fn from_parts(
        actor: Option<String>,
        permission: Option<Permission>,
        scope: ScopeContext,
    ) -> Self {
        Self {
            actor,
            permission,
            scope,
        }
    }
}

/// Result of a permission check.
///
/// Callers must gate on `is_success` before trusting `can` for
/// security-sensitive decisions: a failed pool contributes no grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub can: bool,
    pub is_loading: bool,
    pub is_success: bool,
}

impl CheckOutcome {
    /// Outcome for a caller that required no permission.
    pub const UNRESTRICTED: CheckOutcome = CheckOutcome {
        can: true,
        is_loading: false,
        is_success: false,
    };

    /// Outcome for an unauthenticated actor (modeled as still loading).
    pub const UNAUTHENTICATED: CheckOutcome = CheckOutcome {
        can: false,
        is_loading: true,
        is_success: false,
    };
}

/// Result of the organization-owner query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerOutcome {
    pub is_owner: bool,
    pub is_loading: bool,
    pub is_success: bool,
}

/// Result of filtering a resource list by permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome<T> {
    pub items: Vec<T>,
    pub is_loading: bool,
    pub is_success: bool,
}

/// Resolution state of a single grant pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolStatus {
    /// Required scope ids are missing; the fetch never starts.
    Blocked,
    /// The fetch is in flight.
    Loading,
    /// The fetch and any directory join completed.
    Ready,
    /// The fetch or directory join failed or timed out.
    Failed { message: String },
}

/// Grants of one scope level, filtered to the current scope context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPool {
    pub level: Entity,
    pub status: PoolStatus,
    pub grants: Vec<Grant>,
}

impl GrantPool {
    pub fn ready(level: Entity, grants: Vec<Grant>) -> Self {
        Self {
            level,
            status: PoolStatus::Ready,
            grants,
        }
    }

    pub fn loading(level: Entity) -> Self {
        Self {
            level,
            status: PoolStatus::Loading,
            grants: Vec::new(),
        }
    }

    pub fn blocked(level: Entity) -> Self {
        Self {
            level,
            status: PoolStatus::Blocked,
            grants: Vec::new(),
        }
    }

    pub fn failed(level: Entity, message: impl Into<String>) -> Self {
        Self {
            level,
            status: PoolStatus::Failed {
                message: message.into(),
            },
            grants: Vec::new(),
        }
    }

    /// A blocked pool never loads, so it reports loading indefinitely.
    pub fn is_loading(&self) -> bool {
        matches!(self.status, PoolStatus::Blocked | PoolStatus::Loading)
    }

    pub fn is_success(&self) -> bool {
        self.status == PoolStatus::Ready
    }

    pub fn is_blocked(&self) -> bool {
        self.status == PoolStatus::Blocked
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolStatus::Blocked => f.write_str("blocked"),
            PoolStatus::Loading => f.write_str("loading"),
            PoolStatus::Ready => f.write_str("ready"),
            PoolStatus::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_pool_reports_loading_but_not_success() {
        let pool = GrantPool::blocked(Entity::Branch);
        assert!(pool.is_loading());
        assert!(!pool.is_success());
        assert!(pool.is_blocked());
    }

    #[test]
    fn test_failed_pool_is_neither_loading_nor_success() {
        let pool = GrantPool::failed(Entity::Project, "boom");
        assert!(!pool.is_loading());
        assert!(!pool.is_success());
        assert_eq!(pool.status.to_string(), "failed: boom");
    }

    #[test]
    fn test_ready_pool_is_success() {
        let pool = GrantPool::ready(Entity::Organization, vec![]);
        assert!(!pool.is_loading());
        assert!(pool.is_success());
    }
}
