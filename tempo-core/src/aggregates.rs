//! Fixed-shape aggregate records.
//!
//! The backend omits or nulls sub-fields freely. Every field here decodes a
//! missing or `null` value as zero, so downstream code never sees a hole.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why an aggregate response could not be turned into a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("response was empty")]
    Missing,

    #[error("expected an object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("invalid field value: {reason}")]
    InvalidField { reason: String },
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A record assembled from an aggregate endpoint.
pub trait Aggregate: Default + Clone + DeserializeOwned + Send + Sync + 'static {
    /// Merge a raw response into the fixed shape, zero-defaulting absent fields.
    fn from_response(value: Value) -> Result<Self, AggregateError> {
        match &value {
            Value::Null => Err(AggregateError::Missing),
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| AggregateError::InvalidField { reason: e.to_string() }),
            other => Err(AggregateError::NotAnObject {
                found: json_type_name(other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub in_progress: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub completed: u64,
}

impl TaskStats {
    /// Share of completed tasks in percent, 0 when there are no tasks.
    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeStats {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub estimated: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub actual: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fixed: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub human: f64,
}

/// Per-project statistics from `projects/{id}/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub task_stats: TaskStats,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub time_stats: TimeStats,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub cost_stats: CostBreakdown,
}

impl Aggregate for ProjectStats {}

/// Per-project cost totals from `costs/project/{id}/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fixed: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub human: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub other: f64,
}

impl CostStats {
    pub fn total(&self) -> f64 {
        self.fixed + self.human + self.other
    }
}

impl Aggregate for CostStats {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusShare {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub status: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub count: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub percentage: f64,
}

/// Workspace-wide dashboard figures from `statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatistics {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub project_count: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub active_project_count: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_tasks: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub completed_tasks: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub in_progress_tasks: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_estimated_hours: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_actual_hours: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub status_distribution: Vec<StatusShare>,
}

impl Aggregate for DashboardStatistics {}
