//! permscope-storage: Grant and directory storage
//!
//! This crate provides the storage layer for permscope, including:
//! - PermissionStore trait for organizations, projects, branches and grants
//! - In-memory implementation
//! - JSON seed data loading
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              permscope-storage              │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs - PermissionStore definition     │
//! │  memory.rs - In-memory implementation       │
//! │  seed.rs   - JSON seed data                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod seed;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryPermissionStore;
pub use seed::{SeedData, SeedSummary};
pub use traits::{GrantFilter, Organization, PermissionStore};
