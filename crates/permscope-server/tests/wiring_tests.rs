//! Integration tests for wiring the engine through the crate's public API,
//! the same way the `permscope` binary does.
//!
//! # Test Categories
//!
//! 1. Demo seed - batch and owner checks over `demos/seed.json`
//! 2. Cache coherence - writes through the store wrapper are visible
//!    immediately with caching enabled

use std::sync::Arc;

use permscope_domain::model::{Grant, ScopeContext};
use permscope_domain::resolver::PermissionEngine;
use permscope_server::handlers::batch::BatchCheckRequest;
use permscope_server::{
    BatchCheckHandler, CacheInvalidatingStore, ServerConfig, StoreDirectoryReader, StoreGrantReader,
};
use permscope_storage::{MemoryPermissionStore, PermissionStore, SeedData};

type Store = CacheInvalidatingStore<MemoryPermissionStore>;
type Engine = PermissionEngine<StoreGrantReader<Store>, StoreDirectoryReader<Store>>;

async fn seeded(config: &ServerConfig) -> (Arc<Store>, Arc<Engine>) {
    let engine_config = config.engine_config();
    let store = Arc::new(CacheInvalidatingStore::new(
        MemoryPermissionStore::new_shared(),
        engine_config.cache.clone(),
    ));
    SeedData::from_json_str(include_str!("../../../demos/seed.json"))
        .unwrap()
        .apply(store.as_ref())
        .await
        .unwrap();

    let engine = Arc::new(PermissionEngine::with_config(
        Arc::new(StoreGrantReader::new(Arc::clone(&store))),
        Arc::new(StoreDirectoryReader::new(Arc::clone(&store))),
        engine_config,
    ));
    (store, engine)
}

fn cached_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.cache.enabled = true;
    config
}

// ============================================================
// Section 1: Demo seed
// ============================================================

#[tokio::test]
async fn test_batch_check_over_demo_seed() {
    let config = ServerConfig::default();
    let (_store, engine) = seeded(&config).await;
    let handler = BatchCheckHandler::new(engine).with_max_items(config.batch.max_items);

    let request = BatchCheckRequest::new(
        Some("dev".to_string()),
        ScopeContext::new("org-a").with_project("p1").with_branch("b1"),
        [
            "branch:auth:admin",
            "branch:rls:read",
            "project:settings:read",
            "project:settings:write",
            "environment:backups:read",
            "not-a-permission",
        ],
    );
    let response = handler.check(request).await.unwrap();

    let allowed: Vec<bool> = response.results.iter().map(|r| r.allowed()).collect();
    assert_eq!(allowed, vec![true, true, true, false, true, false]);
    assert!(response.results[5].error.is_some());
}

#[tokio::test]
async fn test_owner_query_over_demo_seed() {
    let (_store, engine) = seeded(&ServerConfig::default()).await;
    let scope = ScopeContext::new("org-a");

    let owner = engine.is_organization_owner(Some("olivia"), &scope).await;
    assert!(owner.is_owner);
    assert!(owner.is_success);

    let not_owner = engine.is_organization_owner(Some("dev"), &scope).await;
    assert!(!not_owner.is_owner);
    assert!(not_owner.is_success);
}

// ============================================================
// Section 2: Cache coherence
// ============================================================

#[tokio::test]
async fn test_project_removal_is_visible_with_cache_enabled() {
    let config = cached_config();
    let (store, engine) = seeded(&config).await;
    let handler = BatchCheckHandler::new(engine);
    let request = || {
        BatchCheckRequest::new(
            Some("dev".to_string()),
            ScopeContext::new("org-a").with_project("p1"),
            ["project:settings:read"],
        )
    };

    let before = handler.check(request()).await.unwrap();
    assert!(before.results[0].allowed());

    store.delete_project("org-a", "p1").await.unwrap();

    let after = handler.check(request()).await.unwrap();
    let outcome = after.results[0].outcome.unwrap();
    assert!(!outcome.can);
    assert!(outcome.is_success);
}

#[tokio::test]
async fn test_grant_revocation_is_visible_with_cache_enabled() {
    let config = cached_config();
    let (store, engine) = seeded(&config).await;
    let scope = ScopeContext::new("org-a");
    assert!(engine.is_organization_owner(Some("olivia"), &scope).await.is_owner);

    store
        .revoke_grants("olivia", vec![Grant::owner("org-a")])
        .await
        .unwrap();

    assert!(!engine.is_organization_owner(Some("olivia"), &scope).await.is_owner);
}
