//! Adapters that bridge the storage layer to the domain layer.
//!
//! The domain layer (permscope-domain) defines abstract traits for data access:
//! - `GrantReader`: Read an actor's grants for one scope level
//! - `DirectoryReader`: List projects and branches for membership joins
//!
//! The storage layer (permscope-storage) implements `PermissionStore`. The
//! adapters here implement the domain traits on top of it. Storage errors
//! become `DomainError::FetchError`, which the engine folds into a failed
//! pool.

use std::sync::Arc;

use async_trait::async_trait;

use permscope_domain::error::{DomainError, DomainResult};
use permscope_domain::model::{BranchRecord, Entity, Grant, ProjectRecord};
use permscope_domain::resolver::{DirectoryReader, GrantReader};
use permscope_storage::{GrantFilter, PermissionStore, StorageError};

fn fetch_error(err: StorageError) -> DomainError {
    DomainError::FetchError {
        message: format!("storage error: {err}"),
    }
}

/// Adapter that implements `GrantReader` using a `PermissionStore`.
pub struct StoreGrantReader<S: PermissionStore> {
    storage: Arc<S>,
}

impl<S: PermissionStore> StoreGrantReader<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: PermissionStore> GrantReader for StoreGrantReader<S> {
    async fn read_grants(
        &self,
        actor: &str,
        level: Entity,
        organization_id: &str,
    ) -> DomainResult<Vec<Grant>> {
        let filter = GrantFilter::for_actor(actor)
            .with_organization(organization_id)
            .with_entity(level);
        self.storage.read_grants(&filter).await.map_err(fetch_error)
    }
}

/// Adapter that implements `DirectoryReader` using a `PermissionStore`.
pub struct StoreDirectoryReader<S: PermissionStore> {
    storage: Arc<S>,
}

impl<S: PermissionStore> StoreDirectoryReader<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: PermissionStore> DirectoryReader for StoreDirectoryReader<S> {
    async fn list_projects(&self, organization_id: &str) -> DomainResult<Vec<ProjectRecord>> {
        self.storage
            .list_projects(organization_id)
            .await
            .map_err(fetch_error)
    }

    async fn list_branches(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> DomainResult<Vec<BranchRecord>> {
        self.storage
            .list_branches(organization_id, project_id)
            .await
            .map_err(fetch_error)
    }
}
