//! Tempo Test Utilities
//!
//! Shared test infrastructure for the Tempo workspace:
//! - A scripted in-memory [`MockTransport`]
//! - JSON fixtures shaped like real backend responses
//! - Proptest generators for the entity types

pub use tempo_core::{
    Method, Project, ProjectId, RequestBody, Task, TaskId, TeamMember, TeamMemberId, Transport,
    TransportError, TransportResult,
};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RecordedCall {
    /// JSON body of a POST or PUT, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Value of a query or form field.
    pub fn param(&self, name: &str) -> Option<&str> {
        let form = match &self.body {
            Some(RequestBody::Form(fields)) => fields.as_slice(),
            _ => &[],
        };
        self.query
            .iter()
            .chain(form.iter())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

enum Reply {
    Ready(TransportResult<Value>),
    Held(oneshot::Receiver<TransportResult<Value>>),
}

/// Scripted transport for store tests.
///
/// Replies are queued per `(method, path)` and consumed in FIFO order. A call
/// with nothing queued fails with [`TransportError::NoResponse`], which keeps
/// accidental requests visible in assertions.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next matching call.
    pub fn respond(
        &self,
        method: Method,
        path: impl Into<String>,
        reply: TransportResult<Value>,
    ) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.into()))
            .or_default()
            .push_back(Reply::Ready(reply));
        self
    }

    pub fn respond_json(&self, method: Method, path: impl Into<String>, value: Value) -> &Self {
        self.respond(method, path, Ok(value))
    }

    /// Queue a failure response with the given status and JSON body.
    pub fn respond_status(
        &self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        body: Value,
    ) -> &Self {
        self.respond(
            method,
            path,
            Err(TransportError::Status {
                status,
                body: Some(body),
            }),
        )
    }

    /// Queue a reply that stays pending until the returned sender fires.
    ///
    /// Dropping the sender resolves the call with a network failure.
    pub fn hold(
        &self,
        method: Method,
        path: impl Into<String>,
    ) -> oneshot::Sender<TransportResult<Value>> {
        let (tx, rx) = oneshot::channel();
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.into()))
            .or_default()
            .push_back(Reply::Held(rx));
        tx
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .cloned()
            .collect()
    }

    /// Number of queued replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        self.routes.lock().unwrap().values().map(VecDeque::len).sum()
    }

    async fn dispatch(&self, call: RecordedCall) -> TransportResult<Value> {
        let key = (call.method, call.path.clone());
        self.calls.lock().unwrap().push(call);
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Held(rx)) => rx.await.unwrap_or_else(|_| {
                Err(TransportError::NoResponse {
                    reason: "held reply dropped".to_string(),
                })
            }),
            None => Err(TransportError::NoResponse {
                reason: format!("no mock reply for {} {}", key.0, key.1),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> TransportResult<Value> {
        self.dispatch(RecordedCall {
            method: Method::Get,
            path: path.to_string(),
            query: query.to_vec(),
            body: None,
        })
        .await
    }

    async fn post(&self, path: &str, body: RequestBody) -> TransportResult<Value> {
        self.dispatch(RecordedCall {
            method: Method::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body),
        })
        .await
    }

    async fn put(&self, path: &str, body: Value) -> TransportResult<Value> {
        self.dispatch(RecordedCall {
            method: Method::Put,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(RequestBody::Json(body)),
        })
        .await
    }

    async fn delete(&self, path: &str, query: &[(String, String)]) -> TransportResult<Value> {
        self.dispatch(RecordedCall {
            method: Method::Delete,
            path: path.to_string(),
            query: query.to_vec(),
            body: None,
        })
        .await
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! JSON payloads in the exact shape the backend returns.

    use serde_json::{json, Value};

    pub const CREATED_AT: &str = "2024-03-01T09:00:00";
    pub const UPDATED_AT: &str = "2024-03-02T10:30:00";

    pub fn project_json(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": format!("{} description", name),
            "start_date": "2024-01-01T00:00:00",
            "end_date": "2024-12-31T00:00:00",
            "status": "IN_PROGRESS",
            "fixed_cost_monthly": 1200.0,
            "created_at": CREATED_AT,
            "updated_at": UPDATED_AT
        })
    }

    pub fn task_json(id: i64, project_id: i64, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "description": null,
            "status": "TODO",
            "priority": "MEDIUM",
            "project_id": project_id,
            "assignee_id": 1,
            "sprint_id": null,
            "estimated_hours": 2.0,
            "actual_hours": 0.0,
            "due_date": null,
            "created_at": CREATED_AT,
            "updated_at": UPDATED_AT,
            "project": {"id": project_id, "name": "Project"},
            "assignee": {"id": 1, "name": "Ada"}
        })
    }

    pub fn sprint_json(id: i64, project_id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "project_id": project_id,
            "name": name,
            "start_date": "2024-02-01T00:00:00",
            "end_date": "2024-02-14T00:00:00",
            "status": "active",
            "velocity": null,
            "created_at": CREATED_AT
        })
    }

    pub fn cost_json(id: i64, project_id: i64, cost_type: &str, amount: f64) -> Value {
        json!({
            "id": id,
            "project_id": project_id,
            "record_date": "2024-02-01T00:00:00",
            "cost_type": cost_type,
            "amount": amount,
            "description": null,
            "created_at": CREATED_AT
        })
    }

    pub fn team_member_json(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "role": "Engineer",
            "monthly_salary": 8000.0,
            "join_date": "2023-06-01T00:00:00",
            "leave_date": null,
            "created_at": CREATED_AT
        })
    }

    pub fn project_member_json(id: i64, project_id: i64, member_id: i64) -> Value {
        json!({
            "id": id,
            "project_id": project_id,
            "member_id": member_id,
            "allocation_percentage": 50.0,
            "start_date": "2024-01-01T00:00:00",
            "end_date": null
        })
    }

    pub fn activity_json(id: i64, content: &str) -> Value {
        json!({
            "id": id,
            "type": "task_updated",
            "content": content,
            "user_id": 1,
            "created_at": CREATED_AT
        })
    }

    pub fn user_json(id: i64, username: &str) -> Value {
        json!({
            "id": id,
            "username": username,
            "email": format!("{}@example.com", username),
            "is_active": true,
            "is_superuser": false,
            "created_at": CREATED_AT,
            "updated_at": UPDATED_AT
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Tempo entities.

    use chrono::{DateTime, NaiveDateTime};
    use proptest::prelude::*;
    use serde_json::Map;
    use tempo_core::{
        EntityIdType, Project, ProjectId, ProjectStatus, Task, TaskId, TaskPriority, TaskStatus,
        TeamMember, TeamMemberId,
    };

    pub fn arb_timestamp() -> impl Strategy<Value = NaiveDateTime> {
        // 2020-01-01 .. 2030-01-01
        (1_577_836_800i64..1_893_456_000i64).prop_map(|secs| {
            DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .unwrap_or_default()
        })
    }

    pub fn arb_project_id() -> impl Strategy<Value = ProjectId> {
        (1i64..64).prop_map(ProjectId::new)
    }

    pub fn arb_project_status() -> impl Strategy<Value = ProjectStatus> {
        prop_oneof![
            Just(ProjectStatus::Planning),
            Just(ProjectStatus::InProgress),
            Just(ProjectStatus::Completed),
            Just(ProjectStatus::OnHold),
        ]
    }

    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Todo),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Review),
            Just(TaskStatus::Done),
        ]
    }

    pub fn arb_task_priority() -> impl Strategy<Value = TaskPriority> {
        prop_oneof![
            Just(TaskPriority::Low),
            Just(TaskPriority::Medium),
            Just(TaskPriority::High),
            Just(TaskPriority::Urgent),
        ]
    }

    pub fn arb_project() -> impl Strategy<Value = Project> {
        (
            arb_project_id(),
            "[A-Za-z][A-Za-z0-9 ]{0,15}",
            arb_timestamp(),
            arb_project_status(),
            0.0f64..50_000.0,
        )
            .prop_map(|(id, name, start, status, fixed_cost_monthly)| Project {
                id,
                name,
                description: None,
                start_date: Some(start),
                end_date: Some(start),
                status: Some(status),
                fixed_cost_monthly,
                created_at: Some(start),
                updated_at: Some(start),
                extra: Map::new(),
            })
    }

    pub fn arb_task(project_id: ProjectId) -> impl Strategy<Value = Task> {
        (
            (1i64..64).prop_map(TaskId::new),
            "[a-z]{1,12}",
            arb_task_status(),
            arb_task_priority(),
            arb_timestamp(),
        )
            .prop_map(move |(id, title, status, priority, at)| Task {
                id,
                title,
                description: None,
                status: Some(status),
                priority: Some(priority),
                project_id: Some(project_id),
                assignee_id: Some(TeamMemberId::new(1)),
                sprint_id: None,
                estimated_hours: 0.0,
                actual_hours: 0.0,
                due_date: None,
                created_at: Some(at),
                updated_at: Some(at),
                project: None,
                assignee: None,
                extra: Map::new(),
            })
    }

    pub fn arb_team_member() -> impl Strategy<Value = TeamMember> {
        (
            (1i64..64).prop_map(TeamMemberId::new),
            "[A-Z][a-z]{1,10}",
            arb_timestamp(),
        )
            .prop_map(|(id, name, at)| TeamMember {
                id,
                name,
                role: "Engineer".to_string(),
                monthly_salary: 5000.0,
                join_date: Some(at),
                leave_date: None,
                created_at: Some(at),
                extra: Map::new(),
            })
    }
}
