//! Data types for batch check operations.

use permscope_domain::model::ScopeContext;
use permscope_domain::resolver::CheckOutcome;

/// Default cap on permissions per batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Request to evaluate many permissions for one actor under one scope.
#[derive(Debug, Clone)]
pub struct BatchCheckRequest {
    /// The authenticated actor, `None` when not signed in.
    pub actor: Option<String>,
    /// The scope all checks are evaluated under.
    pub scope: ScopeContext,
    /// Encoded `entity:resource:action` permissions.
    pub permissions: Vec<String>,
}

impl BatchCheckRequest {
    pub fn new(
        actor: Option<String>,
        scope: ScopeContext,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            actor,
            scope,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a single check within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCheckItemResult {
    /// The permission string as submitted.
    pub permission: String,
    /// The outcome, absent when the permission string could not be decoded.
    pub outcome: Option<CheckOutcome>,
    /// Decode error for this item.
    pub error: Option<String>,
}

impl BatchCheckItemResult {
    /// Whether the item was decoded and allowed.
    pub fn allowed(&self) -> bool {
        self.outcome.is_some_and(|o| o.can)
    }
}

/// Response from a batch check, in request order.
#[derive(Debug, Clone)]
pub struct BatchCheckResponse {
    pub results: Vec<BatchCheckItemResult>,
}

/// Errors that reject a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchCheckError {
    #[error("batch request cannot be empty")]
    EmptyBatch,

    #[error("batch size {size} exceeds maximum allowed {max}")]
    TooManyItems { size: usize, max: usize },
}

/// Result type for batch check operations.
pub type BatchCheckResult<T> = Result<T, BatchCheckError>;
