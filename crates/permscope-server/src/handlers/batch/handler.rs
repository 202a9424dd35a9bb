//! Batch check handler implementation.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument};

use permscope_domain::model::{Permission, ScopeContext};
use permscope_domain::resolver::{
    CheckOutcome, CheckRequest, DirectoryReader, GrantReader, PermissionEngine,
};

use super::singleflight::{Singleflight, SingleflightGuard, SingleflightSlot};
use super::types::{
    BatchCheckError, BatchCheckItemResult, BatchCheckRequest, BatchCheckResponse,
    BatchCheckResult, DEFAULT_MAX_BATCH_SIZE,
};

/// Key identifying one evaluation (used for deduplication).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CheckKey {
    pub actor: Option<String>,
    pub scope: ScopeContext,
    pub permission: Permission,
}

/// Handler for batch permission checks.
///
/// Processes checks concurrently with two-stage deduplication:
/// 1. Intra-batch: permissions decoding to the same value execute once
/// 2. Singleflight: concurrent batches share in-flight evaluations
pub struct BatchCheckHandler<G, D>
where
    G: GrantReader,
    D: DirectoryReader,
{
    engine: Arc<PermissionEngine<G, D>>,
    singleflight: Arc<Singleflight<CheckKey, CheckOutcome>>,
    max_items: usize,
}

impl<G, D> BatchCheckHandler<G, D>
where
    G: GrantReader + 'static,
    D: DirectoryReader + 'static,
{
    /// Creates a new batch check handler.
    pub fn new(engine: Arc<PermissionEngine<G, D>>) -> Self {
        Self {
            engine,
            singleflight: Arc::new(Singleflight::new()),
            max_items: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Sets the maximum number of permissions per batch.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Validates a batch check request.
    pub fn validate(&self, request: &BatchCheckRequest) -> BatchCheckResult<()> {
        if request.permissions.is_empty() {
            return Err(BatchCheckError::EmptyBatch);
        }
        if request.permissions.len() > self.max_items {
            return Err(BatchCheckError::TooManyItems {
                size: request.permissions.len(),
                max: self.max_items,
            });
        }
        Ok(())
    }

    /// Executes a batch check request.
    ///
    /// The results are returned in the same order as the input permissions.
    #[instrument(skip_all, fields(actor = ?request.actor, scope = %request.scope, size = request.permissions.len()))]
    pub async fn check(&self, request: BatchCheckRequest) -> BatchCheckResult<BatchCheckResponse> {
        self.validate(&request)?;

        // Stage 1: decode and deduplicate within the batch
        let mut unique: Vec<Permission> = Vec::new();
        let mut key_to_index: HashMap<Permission, usize> = HashMap::new();
        let mut positions: Vec<Result<usize, String>> = Vec::with_capacity(request.permissions.len());

        for raw in &request.permissions {
            match Permission::decode(raw) {
                Ok(permission) => {
                    let index = *key_to_index.entry(permission.clone()).or_insert_with(|| {
                        unique.push(permission);
                        unique.len() - 1
                    });
                    positions.push(Ok(index));
                }
                Err(e) => positions.push(Err(e.to_string())),
            }
        }

        debug!(
            total = request.permissions.len(),
            unique = unique.len(),
            "batch deduplicated"
        );

        // Stage 2: evaluate unique permissions with singleflight
        let outcomes: Vec<CheckOutcome> = join_all(unique.iter().map(|permission| {
            self.execute_with_singleflight(CheckKey {
                actor: request.actor.clone(),
                scope: request.scope.clone(),
                permission: permission.clone(),
            })
        }))
        .await;

        let results = request
            .permissions
            .iter()
            .zip(positions)
            .map(|(raw, position)| match position {
                Ok(index) => BatchCheckItemResult {
                    permission: raw.clone(),
                    outcome: Some(outcomes[index]),
                    error: None,
                },
                Err(error) => BatchCheckItemResult {
                    permission: raw.clone(),
                    outcome: None,
                    error: Some(error),
                },
            })
            .collect();

        Ok(BatchCheckResponse { results })
    }

    /// Evaluates one check, sharing the result with concurrent callers.
    async fn execute_with_singleflight(&self, key: CheckKey) -> CheckOutcome {
        match self.singleflight.acquire(key.clone()) {
            SingleflightSlot::Follower(mut receiver) => match receiver.recv().await {
                Ok(outcome) => outcome,
                // Leader went away without a result; its guard cleaned up, so retry
                Err(_) => Box::pin(self.execute_with_singleflight(key)).await,
            },
            SingleflightSlot::Leader(sender) => {
                let guard = SingleflightGuard::new(&self.singleflight, key.clone());

                let request = CheckRequest::from_parts(key.actor, Some(key.permission), key.scope);
                let outcome = self.engine.check_permission(&request).await;

                // No receivers is fine
                let _ = sender.send(outcome);
                guard.complete();
                outcome
            }
        }
    }

    /// Returns (total, decodable unique) permission counts for a request.
    pub fn dedup_stats(&self, request: &BatchCheckRequest) -> (usize, usize) {
        let unique: std::collections::HashSet<Permission> = request
            .permissions
            .iter()
            .filter_map(|raw| Permission::decode(raw).ok())
            .collect();
        (request.permissions.len(), unique.len())
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.singleflight.in_flight()
    }
}
