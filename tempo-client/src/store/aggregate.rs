//! Read-only aggregate fetchers.
//!
//! Unlike list fetches, an aggregate is never tolerated as absent: a `null`
//! response is `NotFound` and anything that is not an object is malformed.

use super::error::StoreError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempo_core::{Aggregate, AggregateError, Transport};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Fetch and merge an aggregate record.
pub(crate) async fn fetch_aggregate<A: Aggregate>(
    transport: &dyn Transport,
    path: &str,
    fallback: &str,
    missing: &str,
) -> Result<A, StoreError> {
    let value = transport
        .get(path, &[])
        .await
        .map_err(|err| StoreError::from_transport(err, fallback))?;
    A::from_response(value).map_err(|err| match err {
        AggregateError::Missing => StoreError::not_found(missing),
        other => StoreError::malformed(format!("{}: {}", fallback, other)),
    })
}

/// Sequence counter for a derived slot. Only the newest request may write
/// the slot it guards.
#[derive(Debug, Default)]
pub(crate) struct SlotFence(AtomicU64);

impl SlotFence {
    pub(crate) fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_latest(&self, seq: u64) -> bool {
        self.0.load(Ordering::SeqCst) == seq
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateState<A> {
    pub value: A,
    pub loading: bool,
    pub error: Option<String>,
}

impl<A: Default> Default for AggregateState<A> {
    fn default() -> Self {
        Self {
            value: A::default(),
            loading: false,
            error: None,
        }
    }
}

/// A store holding one aggregate record with its own request state.
pub struct AggregateStore<A: Aggregate> {
    transport: Arc<dyn Transport>,
    path: &'static str,
    label: &'static str,
    state: watch::Sender<AggregateState<A>>,
    ops: AtomicU64,
    generation: AtomicU64,
}

impl<A: Aggregate> AggregateStore<A> {
    /// `label` names the record in messages, e.g. `"statistics"`.
    pub fn new(transport: Arc<dyn Transport>, path: &'static str, label: &'static str) -> Self {
        Self {
            transport,
            path,
            label,
            state: watch::Sender::new(AggregateState::default()),
            ops: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AggregateState<A>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AggregateState<A> {
        self.state.borrow().clone()
    }

    pub fn value(&self) -> A {
        self.state.borrow().value.clone()
    }

    /// Fetch the record. On failure the value falls back to zero.
    pub async fn fetch(&self) -> Result<A, StoreError> {
        let seq = self.ops.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.load(Ordering::SeqCst);
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let fallback = format!("Failed to fetch {}", self.label);
        let missing = format!("No {} available", self.label);
        let result =
            fetch_aggregate::<A>(self.transport.as_ref(), self.path, &fallback, &missing).await;

        self.state.send_modify(|state| {
            let latest = self.ops.load(Ordering::SeqCst) == seq;
            if latest && self.generation.load(Ordering::SeqCst) == generation {
                match &result {
                    Ok(value) => state.value = value.clone(),
                    Err(err) => {
                        state.value = A::default();
                        state.error = Some(err.to_string());
                    }
                }
            }
            if latest {
                state.loading = false;
            }
        });

        match &result {
            Ok(_) => debug!(path = self.path, "aggregate fetched"),
            Err(err) => warn!(path = self.path, error = %err, "aggregate fetch failed"),
        }
        result
    }

    pub fn reset(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(AggregateState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempo_core::{CostStats, Method};
    use tempo_test_utils::MockTransport;

    fn store(mock: &Arc<MockTransport>) -> AggregateStore<CostStats> {
        AggregateStore::new(mock.clone(), "costs/project/1/stats", "cost statistics")
    }

    #[tokio::test]
    async fn test_partial_response_is_zero_defaulted() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "costs/project/1/stats", json!({"fixed": 10.0}));
        let store = store(&mock);

        let stats = store.fetch().await.unwrap();
        assert_eq!(stats.fixed, 10.0);
        assert_eq!(stats.human, 0.0);
        assert_eq!(stats.other, 0.0);
        assert!(!store.snapshot().loading);
    }

    #[tokio::test]
    async fn test_null_response_is_not_found_and_zeroes_value() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "costs/project/1/stats", json!({"fixed": 10.0}))
            .respond_json(Method::Get, "costs/project/1/stats", serde_json::Value::Null);
        let store = store(&mock);
        store.fetch().await.unwrap();

        let err = store.fetch().await.unwrap_err();
        assert!(err.is_not_found());
        let state = store.snapshot();
        assert_eq!(state.value, CostStats::default());
        assert_eq!(state.error.as_deref(), Some("No cost statistics available"));
    }

    #[tokio::test]
    async fn test_list_response_is_malformed() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "costs/project/1/stats", json!([1, 2]));
        let err = store(&mock).fetch().await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_reset_restores_zero_value() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "costs/project/1/stats", json!({"human": 3.0}));
        let store = store(&mock);
        store.fetch().await.unwrap();
        store.reset();
        assert_eq!(store.snapshot(), AggregateState::default());
    }
}
