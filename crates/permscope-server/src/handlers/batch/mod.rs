//! Batch check handler with two-stage deduplication.
//!
//! A dashboard page gates many controls at once, so checks arrive as a list
//! of permission strings for one actor and scope. The handler:
//!
//! 1. **Decodes each item independently**: a malformed permission string
//!    yields an error for that item only.
//! 2. **Deduplicates within the batch**: permissions that decode to the same
//!    value (`org:role:read` and `organization:role:read`) execute once.
//! 3. **Singleflight**: concurrent batches asking the same question for the
//!    same actor and scope share one evaluation.

mod handler;
mod singleflight;
mod types;

pub use handler::BatchCheckHandler;
pub use types::{
    BatchCheckError, BatchCheckItemResult, BatchCheckRequest, BatchCheckResponse,
    BatchCheckResult, DEFAULT_MAX_BATCH_SIZE,
};
