//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Organization not found.
    #[error("organization not found: {organization_id}")]
    OrganizationNotFound { organization_id: String },

    /// Organization already exists.
    #[error("organization already exists: {organization_id}")]
    DuplicateOrganization { organization_id: String },

    /// Project not found, or not part of the given organization.
    #[error("project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    /// Project already exists.
    #[error("project already exists: {project_id}")]
    DuplicateProject { project_id: String },

    /// Branch already exists.
    #[error("branch already exists: {branch_id}")]
    DuplicateBranch { branch_id: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A grant or role assignment violates the scope binding rules.
    #[error("invalid grant: {message}")]
    InvalidGrant { message: String },

    /// Seed data could not be read or parsed.
    #[error("invalid seed data: {message}")]
    InvalidSeed { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    Internal { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<permscope_domain::DomainError> for StorageError {
    fn from(err: permscope_domain::DomainError) -> Self {
        StorageError::InvalidGrant {
            message: err.to_string(),
        }
    }
}
