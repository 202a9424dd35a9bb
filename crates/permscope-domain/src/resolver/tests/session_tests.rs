//! Scope session tests: stale results are discarded on scope switches.

use std::sync::Arc;
use std::time::Duration;

use super::mocks::create_engine;
use crate::model::{Entity, Grant, Permission, ScopeContext};
use crate::resolver::{CheckOutcome, ScopeSession};

fn perm(value: &str) -> Permission {
    Permission::decode(value).unwrap()
}

#[tokio::test]
async fn test_set_scope_bumps_generation_only_on_change() {
    let (_grants, _directory, engine) = create_engine();
    let session = ScopeSession::new(
        Arc::new(engine),
        Some("alice".to_string()),
        ScopeContext::new("org-a"),
    );

    assert_eq!(session.snapshot().generation, 0);
    assert_eq!(session.set_scope(ScopeContext::new("org-a")), 0);
    assert_eq!(session.set_scope(ScopeContext::new("org-b")), 1);
    assert_eq!(
        session.set_scope(ScopeContext::new("org-b").with_project("p1")),
        2
    );
    assert_eq!(session.snapshot().scope.project(), Some("p1"));
}

#[tokio::test]
async fn test_check_is_tagged_with_its_scope() {
    let (grants, _directory, engine) = create_engine();
    grants.add_grant("alice", Grant::owner("org-a")).await;
    let session = ScopeSession::new(
        Arc::new(engine),
        Some("alice".to_string()),
        ScopeContext::new("org-a"),
    );

    let result = session.check(Some(perm("organization:role:read"))).await;
    assert!(result.outcome.can);
    assert_eq!(result.scope, ScopeContext::new("org-a"));
    assert_eq!(result.generation, 0);
}

#[tokio::test(start_paused = true)]
async fn test_check_in_flight_restarts_under_new_scope() {
    let (grants, _directory, engine) = create_engine();
    grants.add_grant("alice", Grant::owner("org-a")).await;
    grants
        .delay_level(Entity::Organization, Duration::from_secs(1))
        .await;
    let session = ScopeSession::new(
        Arc::new(engine),
        Some("alice".to_string()),
        ScopeContext::new("org-a"),
    );

    let (result, _) = tokio::join!(session.check(Some(perm("organization:role:read"))), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.set_scope(ScopeContext::new("org-b"))
    });

    // The org-a owner grant must not leak into the org-b decision.
    assert!(!result.outcome.can);
    assert!(result.outcome.is_success);
    assert_eq!(result.scope, ScopeContext::new("org-b"));
    assert_eq!(result.generation, 1);
}

#[tokio::test]
async fn test_subscribe_settles_and_follows_scope_switch() {
    let (grants, _directory, engine) = create_engine();
    grants.add_grant("alice", Grant::owner("org-a")).await;
    let session = ScopeSession::new(
        Arc::new(engine),
        Some("alice".to_string()),
        ScopeContext::new("org-a"),
    );

    let mut rx = session.subscribe(Some(perm("organization:role:read")));
    let settled = rx
        .wait_for(|o| !o.outcome.is_loading)
        .await
        .unwrap()
        .clone();
    assert!(settled.outcome.can);
    assert_eq!(settled.generation, 0);

    session.set_scope(ScopeContext::new("org-b"));
    let switched = rx
        .wait_for(|o| o.generation == 1 && !o.outcome.is_loading)
        .await
        .unwrap()
        .clone();
    assert!(!switched.outcome.can);
    assert!(switched.outcome.is_success);
    assert_eq!(switched.scope, ScopeContext::new("org-b"));
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_publishes_progressively() {
    let (grants, directory, engine) = create_engine();
    grants.add_grant("alice", Grant::owner("org-a")).await;
    directory.add_project("org-a", "p1").await;
    grants
        .delay_level(Entity::Project, Duration::from_secs(1))
        .await;
    let session = ScopeSession::new(
        Arc::new(engine),
        Some("alice".to_string()),
        ScopeContext::new("org-a").with_project("p1"),
    );

    let mut rx = session.subscribe(Some(perm("project:settings:read")));

    let partial = rx.wait_for(|o| o.outcome.can).await.unwrap().clone();
    assert!(partial.outcome.is_loading, "project pool is still in flight");

    let settled = rx
        .wait_for(|o| !o.outcome.is_loading)
        .await
        .unwrap()
        .clone();
    assert!(settled.outcome.can);
    assert!(settled.outcome.is_success);
}

#[tokio::test]
async fn test_subscribe_without_permission_is_unrestricted() {
    let (_grants, _directory, engine) = create_engine();
    let session = ScopeSession::new(Arc::new(engine), None, ScopeContext::new("org-a"));

    let mut rx = session.subscribe(None);
    let outcome = rx.wait_for(|o| o.outcome.can).await.unwrap().clone();
    assert_eq!(outcome.outcome, CheckOutcome::UNRESTRICTED);
}
