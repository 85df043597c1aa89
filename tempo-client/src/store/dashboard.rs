//! Workspace-wide statistics shown on the dashboard.

use super::aggregate::{AggregateState, AggregateStore};
use super::error::StoreError;
use std::sync::Arc;
use tempo_core::{DashboardStatistics, Transport};
use tokio::sync::watch;

pub struct DashboardStore {
    statistics: AggregateStore<DashboardStatistics>,
}

impl DashboardStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            statistics: AggregateStore::new(transport, "statistics", "statistics"),
        }
    }

    pub async fn fetch_statistics(&self) -> Result<DashboardStatistics, StoreError> {
        self.statistics.fetch().await
    }

    pub fn statistics(&self) -> DashboardStatistics {
        self.statistics.value()
    }

    pub fn snapshot(&self) -> AggregateState<DashboardStatistics> {
        self.statistics.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AggregateState<DashboardStatistics>> {
        self.statistics.subscribe()
    }

    pub fn reset(&self) {
        self.statistics.reset();
    }
}
