//! Task store, scoped to the currently selected project.

use super::engine::{ResourceSpec, ResourceStore, ScopeRule};
use super::error::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tempo_core::{EntityIdType, ProjectId, ResourceKind, SprintId, Task, TaskId, Transport};

pub struct TaskStore {
    store: ResourceStore<Task>,
}

impl TaskStore {
    pub const SPEC: ResourceSpec =
        ResourceSpec::new(ResourceKind::Task, ScopeRule::ParentQuery, false);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            store: ResourceStore::new(transport, Self::SPEC),
        }
    }

    pub fn resources(&self) -> &ResourceStore<Task> {
        &self.store
    }

    /// List the tasks of `project` and select it. `None` deselects the
    /// project and empties the cache without a request.
    pub async fn fetch_tasks(&self, project: Option<ProjectId>) -> Result<Vec<Task>, StoreError> {
        self.store.fetch_all(project).await
    }

    pub async fn fetch_task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.store.fetch_one(id).await
    }

    /// Create a task in the selected project.
    pub async fn create_task<P>(&self, payload: &P) -> Result<Task, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.create(payload).await
    }

    pub async fn update_task<P>(&self, id: TaskId, payload: &P) -> Result<Task, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.update(id, payload).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    /// Tasks planned into a sprint. Read-only, the cache is not touched.
    pub async fn fetch_sprint_tasks(&self, sprint: SprintId) -> Result<Vec<Task>, StoreError> {
        if !sprint.is_valid() {
            return Err(self
                .store
                .reject("A sprint id is required to fetch its tasks".to_string()));
        }
        let path = format!("tasks/sprint/{}", sprint);
        self.store
            .fetch_related(&path, &[], "Failed to fetch sprint tasks")
            .await
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.items()
    }

    pub fn current_project(&self) -> Option<ProjectId> {
        self.store.scope()
    }

    pub fn reset(&self) {
        self.store.reset();
    }
}
