//! Sprint store.

use super::engine::{ResourceSpec, ResourceStore, ScopeRule};
use super::error::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tempo_core::{ProjectId, ResourceKind, Sprint, SprintId, Transport};

pub struct SprintStore {
    store: ResourceStore<Sprint>,
}

impl SprintStore {
    pub const SPEC: ResourceSpec =
        ResourceSpec::new(ResourceKind::Sprint, ScopeRule::ParentPath, true);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            store: ResourceStore::new(transport, Self::SPEC),
        }
    }

    pub fn resources(&self) -> &ResourceStore<Sprint> {
        &self.store
    }

    pub async fn fetch_sprints(&self, project: ProjectId) -> Result<Vec<Sprint>, StoreError> {
        self.store.fetch_all(Some(project)).await
    }

    /// Fetch one sprint and make it the current sprint.
    pub async fn fetch_sprint(&self, id: SprintId) -> Result<Sprint, StoreError> {
        self.store.fetch_one(id).await
    }

    pub async fn create_sprint<P>(&self, payload: &P) -> Result<Sprint, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.create(payload).await
    }

    pub async fn update_sprint<P>(&self, id: SprintId, payload: &P) -> Result<Sprint, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.update(id, payload).await
    }

    pub async fn delete_sprint(&self, id: SprintId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    pub fn sprints(&self) -> Vec<Sprint> {
        self.store.items()
    }

    pub fn current_sprint(&self) -> Option<Sprint> {
        self.store.selection()
    }

    pub fn reset(&self) {
        self.store.reset();
    }
}
