//! Cost record store, with per-project cost totals.

use super::aggregate::{fetch_aggregate, SlotFence};
use super::engine::{ResourceSpec, ResourceStore, ScopeRule};
use super::error::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tempo_core::{CostId, CostRecord, CostStats, EntityIdType, ProjectId, ResourceKind, Transport};
use tokio::sync::watch;

pub struct CostStore {
    store: ResourceStore<CostRecord>,
    cost_stats: watch::Sender<CostStats>,
    stats_fence: SlotFence,
}

impl CostStore {
    pub const SPEC: ResourceSpec =
        ResourceSpec::new(ResourceKind::Cost, ScopeRule::ParentPath, false);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            store: ResourceStore::new(transport, Self::SPEC),
            cost_stats: watch::Sender::new(CostStats::default()),
            stats_fence: SlotFence::default(),
        }
    }

    pub fn resources(&self) -> &ResourceStore<CostRecord> {
        &self.store
    }

    pub async fn fetch_costs(&self, project: ProjectId) -> Result<Vec<CostRecord>, StoreError> {
        self.store.fetch_all(Some(project)).await
    }

    pub async fn create_cost<P>(&self, payload: &P) -> Result<CostRecord, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.create(payload).await
    }

    pub async fn update_cost<P>(&self, id: CostId, payload: &P) -> Result<CostRecord, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.update(id, payload).await
    }

    pub async fn delete_cost(&self, id: CostId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    pub fn costs(&self) -> Vec<CostRecord> {
        self.store.items()
    }

    pub fn cost_stats(&self) -> CostStats {
        *self.cost_stats.borrow()
    }

    pub fn subscribe_cost_stats(&self) -> watch::Receiver<CostStats> {
        self.cost_stats.subscribe()
    }

    /// Fixed, human and other cost totals of a project.
    ///
    /// On failure the totals fall back to zero.
    pub async fn fetch_cost_stats(&self, project: ProjectId) -> Result<CostStats, StoreError> {
        if !project.is_valid() {
            return Err(self
                .store
                .reject("A project id is required to fetch cost statistics".to_string()));
        }
        let seq = self.stats_fence.issue();
        let generation = self.store.generation();
        let path = format!("costs/project/{}/stats", project);
        let missing = format!("No cost statistics found for project {}", project);
        let result = self
            .store
            .track(fetch_aggregate::<CostStats>(
                self.store.transport().as_ref(),
                &path,
                "Failed to fetch cost statistics",
                &missing,
            ))
            .await;

        if self.stats_fence.is_latest(seq) && self.store.is_current(generation) {
            self.cost_stats
                .send_replace(result.as_ref().copied().unwrap_or_default());
        }
        result
    }

    /// Cost records of one calendar month. Read-only, the cache is not touched.
    pub async fn fetch_monthly_costs(
        &self,
        project: ProjectId,
        year: i32,
        month: u32,
    ) -> Result<Vec<CostRecord>, StoreError> {
        if !project.is_valid() {
            return Err(self
                .store
                .reject("A project id is required to fetch monthly costs".to_string()));
        }
        if !(1..=12).contains(&month) {
            return Err(self
                .store
                .reject(format!("Month must be between 1 and 12, got {}", month)));
        }
        let path = format!("costs/project/{}/monthly", project);
        let query = vec![
            ("year".to_string(), year.to_string()),
            ("month".to_string(), month.to_string()),
        ];
        self.store
            .fetch_related(&path, &query, "Failed to fetch monthly costs")
            .await
    }

    pub fn reset(&self) {
        self.store.reset();
        self.stats_fence.issue();
        self.cost_stats.send_replace(CostStats::default());
    }
}
