//! Permission model types.
//!
//! This module contains:
//! - Entities, permissions and the `entity:resource:action` codec
//! - Grants with their scope bindings, wire records and roles
//! - Scope context and directory records

mod grant;
mod permission;
mod scope;
#[cfg(test)]
mod types_proptest;

pub use grant::{Grant, GrantRecord, PermissionRecord, Role, ScopeBinding};
pub use permission::{Entity, Permission, OWNER_ACTION, OWNER_RESOURCE, WILDCARD};
pub use scope::{BranchRecord, ProjectRecord, ScopeContext};
