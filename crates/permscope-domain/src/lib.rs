//! permscope-domain: Scoped permission resolution
//!
//! This crate contains the core permission logic including:
//! - The `entity:resource:action` permission codec and grant model
//! - Per-level grant pool resolvers with directory membership joins
//! - The decision algorithm with wildcard matching and owner bypass
//! - Aggregate, owner and filter queries, plus scope-aware sessions
//! - Resolved pool caching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              permscope-domain               │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Permissions, grants, scopes  │
//! │  resolver/   - Pools, decision, engine      │
//! │  cache/      - Resolved pool caching        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod model;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use cache::{PoolCache, PoolCacheConfig, PoolKey};
pub use error::{DomainError, DomainResult};
