//! Core entity structures

use crate::{
    ActivityId, CostId, EntityIdType, ProjectId, ProjectMemberId, ProjectStatus, SprintId,
    TaskId, TaskPriority, TaskStatus, TeamMemberId, Timestamp, UserId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Backend collections that have a resource store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Project,
    Task,
    Sprint,
    Cost,
    TeamMember,
}

impl ResourceKind {
    /// Path prefix of the collection, relative to the API root.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::Task => "tasks",
            ResourceKind::Sprint => "sprints",
            ResourceKind::Cost => "costs",
            ResourceKind::TeamMember => "team-members",
        }
    }

    /// Human-readable singular noun.
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::Task => "task",
            ResourceKind::Sprint => "sprint",
            ResourceKind::Cost => "cost record",
            ResourceKind::TeamMember => "team member",
        }
    }

    /// Human-readable plural noun.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::Task => "tasks",
            ResourceKind::Sprint => "sprints",
            ResourceKind::Cost => "cost records",
            ResourceKind::TeamMember => "team members",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// An entity kept in a resource store.
///
/// The store engine only ever looks at [`Resource::id`]; every other field is
/// opaque to it.
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: EntityIdType;

    const KIND: ResourceKind;

    fn id(&self) -> Self::Id;
}

/// Project - top-level container for tasks, sprints and costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub fixed_cost_monthly: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<Timestamp>,
    /// Fields this client does not model, kept so they round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Project {
    type Id = ProjectId;
    const KIND: ResourceKind = ResourceKind::Project;

    fn id(&self) -> ProjectId {
        self.id
    }
}

/// Compact project reference embedded in task responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: ProjectId,
    pub name: String,
}

/// Compact member reference embedded in task responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: TeamMemberId,
    pub name: String,
}

/// Task - unit of work inside a project, optionally planned into a sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "lenient")]
    pub project_id: Option<ProjectId>,
    #[serde(default, deserialize_with = "lenient")]
    pub assignee_id: Option<TeamMemberId>,
    #[serde(default, deserialize_with = "lenient")]
    pub sprint_id: Option<SprintId>,
    #[serde(default, deserialize_with = "lenient")]
    pub estimated_hours: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub actual_hours: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub due_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub project: Option<ProjectRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub assignee: Option<MemberRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Task {
    type Id = TaskId;
    const KIND: ResourceKind = ResourceKind::Task;

    fn id(&self) -> TaskId {
        self.id
    }
}

/// Sprint - time-boxed iteration of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    #[serde(default, deserialize_with = "lenient")]
    pub project_id: Option<ProjectId>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub start_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient")]
    pub velocity: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Sprint {
    type Id = SprintId;
    const KIND: ResourceKind = ResourceKind::Sprint;

    fn id(&self) -> SprintId {
        self.id
    }
}

/// Cost record booked against a project.
///
/// `cost_type` is free-form on the backend; `"fixed"` and `"human"` are
/// aggregated separately, everything else counts as other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub id: CostId,
    #[serde(default, deserialize_with = "lenient")]
    pub project_id: Option<ProjectId>,
    #[serde(default, deserialize_with = "lenient")]
    pub record_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub cost_type: String,
    #[serde(default, deserialize_with = "lenient")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for CostRecord {
    type Id = CostId;
    const KIND: ResourceKind = ResourceKind::Cost;

    fn id(&self) -> CostId {
        self.id
    }
}

/// Team member on the payroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient")]
    pub monthly_salary: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub join_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub leave_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeamMember {
    /// Whether the member is still with the team at `at`.
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        self.leave_date.map_or(true, |left| left > at)
    }
}

impl Resource for TeamMember {
    type Id = TeamMemberId;
    const KIND: ResourceKind = ResourceKind::TeamMember;

    fn id(&self) -> TeamMemberId {
        self.id
    }
}

/// Decode a field the store does not interpret. A missing, `null` or
/// mistyped value falls back to the default instead of failing the record.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Allocation of a team member to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: ProjectMemberId,
    pub project_id: ProjectId,
    pub member_id: TeamMemberId,
    pub allocation_percentage: f64,
    pub start_date: Timestamp,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
}

/// Entry of a project's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub user_id: UserId,
    pub created_at: Timestamp,
}

/// Authenticated user account, as returned by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_task_decodes_backend_shape() {
        let task: Task = serde_json::from_value(json!({
            "id": 3,
            "title": "Write docs",
            "description": null,
            "status": "IN_PROGRESS",
            "priority": "HIGH",
            "project_id": 1,
            "assignee_id": 2,
            "sprint_id": null,
            "estimated_hours": 4.0,
            "actual_hours": 1.5,
            "due_date": null,
            "created_at": "2024-03-01T09:00:00",
            "updated_at": "2024-03-02T10:30:00.123456",
            "project": {"id": 1, "name": "Apollo"},
            "assignee": {"id": 2, "name": "Ada"}
        }))
        .unwrap();

        assert_eq!(task.id(), TaskId::new(3));
        assert_eq!(task.status, Some(TaskStatus::InProgress));
        assert_eq!(task.project.map(|p| p.name), Some("Apollo".to_string()));
    }

    #[test]
    fn test_partial_record_keeps_id_and_defaults_the_rest() {
        let member: TeamMember =
            serde_json::from_value(json!({"id": 2, "name": "B2"})).unwrap();
        assert_eq!(member.id(), TeamMemberId::new(2));
        assert_eq!(member.name, "B2");
        assert_eq!(member.role, "");
        assert_eq!(member.created_at, None);
    }

    #[test]
    fn test_mistyped_field_does_not_reject_record() {
        let project: Project = serde_json::from_value(json!({
            "id": 4,
            "name": "Apollo",
            "status": "ARCHIVED",
            "start_date": "not a date",
            "fixed_cost_monthly": null
        }))
        .unwrap();
        assert_eq!(project.status, None);
        assert_eq!(project.start_date, None);
        assert_eq!(project.fixed_cost_monthly, 0.0);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = json!({"id": 7, "title": "t", "labels": ["a", "b"]});
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.extra.get("labels"), Some(&json!(["a", "b"])));
        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["labels"], json!(["a", "b"]));
        assert_eq!(back["id"], json!(7));
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        assert!(serde_json::from_value::<Sprint>(json!({"name": "s"})).is_err());
    }

    #[test]
    fn test_activity_type_field_is_renamed() {
        let activity: Activity = serde_json::from_value(json!({
            "id": 1,
            "type": "task_created",
            "content": "Apollo: created task",
            "user_id": 9,
            "created_at": "2024-03-01T09:00:00"
        }))
        .unwrap();
        assert_eq!(activity.kind, "task_created");
    }

    #[test]
    fn test_user_tolerates_missing_flags() {
        let user: User = serde_json::from_value(json!({"id": 1, "username": "admin"})).unwrap();
        assert!(user.is_active);
        assert!(!user.is_superuser);
    }

    #[test]
    fn test_resource_kind_paths() {
        assert_eq!(ResourceKind::TeamMember.path(), "team-members");
        assert_eq!(Project::KIND.path(), "projects");
        assert_eq!(CostRecord::KIND.noun(), "cost record");
    }

    fn arb_json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 :-]{0,16}".prop_map(Value::String),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Whatever the other fields hold, a record with an id decodes and
        /// keeps that id.
        #[test]
        fn prop_any_field_values_decode_with_id(
            id in 1i64..1_000_000,
            fields in prop::collection::vec(arb_json_scalar(), 6),
        ) {
            let raw = json!({
                "id": id,
                "name": fields[0],
                "role": fields[1],
                "monthly_salary": fields[2],
                "join_date": fields[3],
                "leave_date": fields[4],
                "created_at": fields[5],
            });
            let member: TeamMember = serde_json::from_value(raw).unwrap();
            prop_assert_eq!(member.id(), TeamMemberId::new(id));
            prop_assert!(member.extra.is_empty());
        }

        /// Fields outside the modelled shape survive a decode/encode cycle.
        #[test]
        fn prop_unknown_fields_survive(
            id in 1i64..1_000_000,
            extra in prop::collection::btree_map("x_[a-z]{1,8}", arb_json_scalar(), 0..5),
        ) {
            let mut raw = json!({"id": id, "cost_type": "fixed", "amount": 12.5});
            for (key, value) in &extra {
                raw[key.as_str()] = value.clone();
            }
            let record: CostRecord = serde_json::from_value(raw).unwrap();
            prop_assert_eq!(record.extra.len(), extra.len());
            let back = serde_json::to_value(&record).unwrap();
            for (key, value) in &extra {
                prop_assert_eq!(&back[key.as_str()], value);
            }
        }
    }
}
