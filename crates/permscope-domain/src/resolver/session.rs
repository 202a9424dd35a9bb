//! Scope-aware checks that never merge results computed for a stale scope.
//!
//! A [`ScopeSession`] tracks the active scope context for one actor. Every
//! scope switch bumps a generation counter. A check that is in flight when
//! the scope changes is dropped and re-run under the new scope, so a
//! decision is always tagged with the scope and generation it was computed
//! for.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;

use crate::model::{Permission, ScopeContext};

use super::engine::{reduce_outcome, CheckPlan, PermissionEngine};
use super::traits::{DirectoryReader, GrantReader};
use super::types::{CheckOutcome, CheckRequest, GrantPool};

/// A scope context together with the generation it was installed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSnapshot {
    pub generation: u64,
    pub scope: ScopeContext,
}

/// An outcome tagged with the scope it was computed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedOutcome {
    pub outcome: CheckOutcome,
    pub scope: ScopeContext,
    pub generation: u64,
}

/// Tracks the active scope for an actor and evaluates checks against it.
pub struct ScopeSession<G, D> {
    engine: Arc<PermissionEngine<G, D>>,
    actor: Option<String>,
    scope_tx: watch::Sender<ScopeSnapshot>,
}

impl<G, D> ScopeSession<G, D>
where
    G: GrantReader + 'static,
    D: DirectoryReader + 'static,
{
    pub fn new(
        engine: Arc<PermissionEngine<G, D>>,
        actor: Option<String>,
        scope: ScopeContext,
    ) -> Self {
        let (scope_tx, _) = watch::channel(ScopeSnapshot {
            generation: 0,
            scope,
        });
        Self {
            engine,
            actor,
            scope_tx,
        }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// The currently active scope.
    pub fn snapshot(&self) -> ScopeSnapshot {
        self.scope_tx.borrow().clone()
    }

    /// Switches to `scope`, returning the active generation.
    ///
    /// Setting the scope that is already active is a no-op and does not
    /// restart in-flight checks.
    pub fn set_scope(&self, scope: ScopeContext) -> u64 {
        self.scope_tx.send_if_modified(|current| {
            if current.scope == scope {
                return false;
            }
            current.generation += 1;
            current.scope = scope;
            true
        });
        self.scope_tx.borrow().generation
    }

    /// Checks `permission` under the active scope.
    ///
    /// If the scope changes before the check completes, the partial result
    /// is discarded and the check restarts under the new scope.
    pub async fn check(&self, permission: Option<Permission>) -> ScopedOutcome {
        let mut scope_rx = self.scope_tx.subscribe();
        loop {
            let snapshot = scope_rx.borrow_and_update().clone();
            let request =
                CheckRequest::from_parts(self.actor.clone(), permission.clone(), snapshot.scope);

            let check = self.engine.check_permission(&request);
            tokio::pin!(check);

            tokio::select! {
                outcome = &mut check => {
                    return ScopedOutcome {
                        outcome,
                        scope: request.scope.clone(),
                        generation: snapshot.generation,
                    };
                }
                Ok(()) = scope_rx.changed() => {
                    debug!(
                        stale_generation = snapshot.generation,
                        "scope changed during check, discarding in-flight result"
                    );
                }
            }
        }
    }

    /// Subscribes to progressive outcomes for `permission`.
    ///
    /// The receiver first sees a loading outcome, then an update as each
    /// relevant pool completes. A scope switch restarts resolution; pools
    /// resolved for the previous scope are never merged. The background task
    /// exits once every receiver is dropped or the session is dropped.
    pub fn subscribe(&self, permission: Option<Permission>) -> watch::Receiver<ScopedOutcome> {
        let snapshot = self.snapshot();
        let (tx, rx) = watch::channel(ScopedOutcome {
            outcome: CheckOutcome {
                can: false,
                is_loading: true,
                is_success: false,
            },
            scope: snapshot.scope,
            generation: snapshot.generation,
        });

        tokio::spawn(run_subscription(
            Arc::clone(&self.engine),
            self.actor.clone(),
            permission,
            self.scope_tx.subscribe(),
            tx,
        ));

        rx
    }
}

async fn run_subscription<G, D>(
    engine: Arc<PermissionEngine<G, D>>,
    actor: Option<String>,
    permission: Option<Permission>,
    mut scope_rx: watch::Receiver<ScopeSnapshot>,
    tx: watch::Sender<ScopedOutcome>,
) where
    G: GrantReader + 'static,
    D: DirectoryReader + 'static,
{
    loop {
        let snapshot = scope_rx.borrow_and_update().clone();
        let request = CheckRequest::from_parts(actor.clone(), permission.clone(), snapshot.scope);

        let publish = |outcome: CheckOutcome| {
            tx.send_replace(ScopedOutcome {
                outcome,
                scope: request.scope.clone(),
                generation: snapshot.generation,
            });
        };

        let resolve = async {
            match engine.plan(&request) {
                CheckPlan::Settled(outcome) => publish(outcome),
                CheckPlan::Resolve {
                    actor,
                    required,
                    levels,
                } => {
                    let org = request.scope.organization_id.as_str();
                    let mut pools: Vec<GrantPool> =
                        levels.iter().map(|level| GrantPool::loading(*level)).collect();
                    publish(reduce_outcome(required, org, &pools));

                    let mut pending = engine.resolve_pools_unordered(actor, levels, &request.scope);
                    while let Some(pool) = pending.next().await {
                        if let Some(slot) = pools.iter_mut().find(|p| p.level == pool.level) {
                            *slot = pool;
                        }
                        publish(reduce_outcome(required, org, &pools));
                    }
                }
            }
            // Settled: hold until the scope changes or subscribers leave.
            std::future::pending::<()>().await;
        };

        tokio::select! {
            _ = resolve => {}
            changed = scope_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                debug!(
                    stale_generation = snapshot.generation,
                    "scope changed, restarting subscription"
                );
            }
            _ = tx.closed() => return,
        }
    }
}
