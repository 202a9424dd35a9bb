//! permscope-server: Wiring, batch checks and configuration
//!
//! This crate connects the storage layer to the permission engine and
//! provides:
//! - Adapters implementing the domain reader traits over a PermissionStore
//! - A store wrapper that invalidates cached pools after writes
//! - Batch check handler with deduplication
//! - Configuration management
//! - Logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              permscope-server               │
//! ├─────────────────────────────────────────────┤
//! │  adapters.rs    - Storage -> domain readers │
//! │  config.rs      - Configuration management  │
//! │  handlers/      - Request handlers          │
//! │    batch/         - Batch checks            │
//! │  observability/ - Logging                   │
//! │  store.rs       - Cache-invalidating writes │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod store;

// Re-exports for convenience
pub use adapters::{StoreDirectoryReader, StoreGrantReader};
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::batch::BatchCheckHandler;
pub use store::CacheInvalidatingStore;
