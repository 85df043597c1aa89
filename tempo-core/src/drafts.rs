//! Request payloads for create and update calls.
//!
//! Stores accept any `Serialize` payload; these types just spell out what the
//! backend validates.

use crate::{ProjectId, ProjectStatus, SprintId, TaskPriority, TaskStatus, TeamMemberId, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-side rejection of a draft, mirroring the backend validators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },
    #[error("{end} must not be before {start}")]
    Inverted {
        start: &'static str,
        end: &'static str,
    },
}

fn require_text(field: &'static str, value: &str) -> Result<(), DraftError> {
    if value.trim().is_empty() {
        return Err(DraftError::Empty { field });
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), DraftError> {
    if value < 0.0 {
        return Err(DraftError::Negative { field });
    }
    Ok(())
}

fn require_order(
    start: (&'static str, Timestamp),
    end: (&'static str, Timestamp),
) -> Result<(), DraftError> {
    if end.1 < start.1 {
        return Err(DraftError::Inverted {
            start: start.0,
            end: end.0,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: ProjectStatus,
    pub fixed_cost_monthly: f64,
}

impl ProjectDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        require_text("name", &self.name)?;
        require_non_negative("fixed_cost_monthly", self.fixed_cost_monthly)?;
        require_order(("start_date", self.start_date), ("end_date", self.end_date))
    }
}

/// Task payload. `project_id` is filled in by the task store from the
/// currently selected project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: TeamMemberId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<SprintId>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, assignee_id: TeamMemberId) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            assignee_id,
            sprint_id: None,
            estimated_hours: 0.0,
            actual_hours: 0.0,
            due_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintDraft {
    pub project_id: ProjectId,
    pub name: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

impl SprintDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        require_text("name", &self.name)?;
        require_order(("start_date", self.start_date), ("end_date", self.end_date))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDraft {
    pub project_id: ProjectId,
    pub record_date: Timestamp,
    pub cost_type: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CostDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        require_text("cost_type", &self.cost_type)?;
        require_non_negative("amount", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberDraft {
    pub name: String,
    pub role: String,
    pub monthly_salary: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_date: Option<Timestamp>,
}

impl TeamMemberDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        require_text("name", &self.name)?;
        require_text("role", &self.role)?;
        require_non_negative("monthly_salary", self.monthly_salary)?;
        match (self.join_date, self.leave_date) {
            (Some(joined), Some(left)) => require_order(("join_date", joined), ("leave_date", left)),
            _ => Ok(()),
        }
    }
}

/// Partial team member update; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_salary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_date: Option<Timestamp>,
}
