//! Domain error types for permission resolution.

use thiserror::Error;

/// Domain-specific errors for permission resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A permission string could not be decoded.
    #[error("invalid permission '{value}': {reason}")]
    InvalidPermission { value: String, reason: String },

    /// Unknown scope entity name.
    #[error("invalid entity: {value}")]
    InvalidEntity { value: String },

    /// A grant record violates the scope binding invariant.
    #[error("invalid grant: {message}")]
    InvalidGrant { message: String },

    /// A role bundles permissions of a different entity than its type.
    #[error("invalid role: {message}")]
    InvalidRole { message: String },

    /// A collaborator fetch (grants or directory) failed.
    #[error("fetch error: {message}")]
    FetchError { message: String },

    /// A collaborator fetch did not complete in time.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
