//! Permission resolver.
//!
//! Resolves whether an actor holds an `entity:resource:action` permission
//! under an organization / project / branch scope context.
//!
//! # Architecture Decisions
//!
//! - **Independent pools**: Each scope level is fetched on its own and
//!   filtered to the current scope, so one slow or failed level never blocks
//!   the others. A failed pool degrades to zero grants instead of an error.
//!
//! - **Pure decision**: [`has_permission`] and [`reduce_outcome`] are pure
//!   functions over already-filtered grants. All I/O lives in
//!   [`PoolResolver`].
//!
//! - **Scope-keyed state**: Cache keys and [`ScopeSession`] generations carry
//!   the scope ids, so grants resolved for one organization or project are
//!   never merged into a decision for another.

mod config;
mod decision;
mod derived;
mod engine;
mod pools;
mod session;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::EngineConfig;
pub use decision::{grant_matches, has_permission};
pub use derived::{filter_items, permitted_project_ids};
pub use engine::{reduce_outcome, relevant_pools, CheckPlan, PermissionEngine};
pub use pools::{
    filter_branch_pool, filter_environment_pool, filter_organization_pool, filter_project_pool,
    pool_key, PoolResolver,
};
pub use session::{ScopeSession, ScopeSnapshot, ScopedOutcome};
pub use traits::{DirectoryReader, GrantReader};
pub use types::{CheckOutcome, CheckRequest, FilterOutcome, GrantPool, OwnerOutcome, PoolStatus};
