//! Resource stores.
//!
//! Every store keeps a local cache of one backend collection in sync with
//! CRUD calls, and publishes `{items, loading, error, selection}` snapshots
//! for views to render.

pub mod aggregate;
pub mod cost;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod project;
pub mod sprint;
pub mod task;
pub mod team_member;

pub use aggregate::{AggregateState, AggregateStore};
pub use cost::CostStore;
pub use dashboard::DashboardStore;
pub use engine::{ResourceSpec, ResourceStore, ScopeRule, StoreState};
pub use error::StoreError;
pub use project::ProjectStore;
pub use sprint::SprintStore;
pub use task::TaskStore;
pub use team_member::TeamMemberStore;
