//! Project store, with the per-project statistics and activity feed.

use super::aggregate::{fetch_aggregate, SlotFence};
use super::engine::{decode_list, ResourceSpec, ResourceStore, ScopeRule};
use super::error::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tempo_core::{
    Activity, EntityIdType, Project, ProjectId, ProjectStats, ResourceKind, Transport,
};
use tokio::sync::watch;

pub struct ProjectStore {
    store: ResourceStore<Project>,
    stats: watch::Sender<ProjectStats>,
    activities: watch::Sender<Vec<Activity>>,
    stats_fence: SlotFence,
    activities_fence: SlotFence,
}

impl ProjectStore {
    pub const SPEC: ResourceSpec =
        ResourceSpec::new(ResourceKind::Project, ScopeRule::Unscoped, true);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            store: ResourceStore::new(transport, Self::SPEC),
            stats: watch::Sender::new(ProjectStats::default()),
            activities: watch::Sender::new(Vec::new()),
            stats_fence: SlotFence::default(),
            activities_fence: SlotFence::default(),
        }
    }

    /// Collection, selection and request state.
    pub fn resources(&self) -> &ResourceStore<Project> {
        &self.store
    }

    pub async fn fetch_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.store.fetch_all(None).await
    }

    /// Fetch one project and make it the current project.
    pub async fn fetch_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.store.fetch_one(id).await
    }

    pub async fn create_project<P>(&self, payload: &P) -> Result<Project, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.create(payload).await
    }

    pub async fn update_project<P>(&self, id: ProjectId, payload: &P) -> Result<Project, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.update(id, payload).await
    }

    /// Delete a project. Tasks, sprints and costs cached elsewhere are left
    /// alone; see `Stores::delete_project_cascade`.
    pub async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    pub fn projects(&self) -> Vec<Project> {
        self.store.items()
    }

    pub fn current_project(&self) -> Option<Project> {
        self.store.selection()
    }

    pub fn stats(&self) -> ProjectStats {
        *self.stats.borrow()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<ProjectStats> {
        self.stats.subscribe()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.activities.borrow().clone()
    }

    pub fn subscribe_activities(&self) -> watch::Receiver<Vec<Activity>> {
        self.activities.subscribe()
    }

    /// Fetch `projects/{id}/stats`, zero-defaulting absent figures.
    pub async fn fetch_stats(&self, id: ProjectId) -> Result<ProjectStats, StoreError> {
        if !id.is_valid() {
            return Err(self
                .store
                .reject("A project id is required to fetch statistics".to_string()));
        }
        let seq = self.stats_fence.issue();
        let generation = self.store.generation();
        let path = format!("projects/{}/stats", id);
        let missing = format!("No statistics found for project {}", id);
        let result = self
            .store
            .track(fetch_aggregate::<ProjectStats>(
                self.store.transport().as_ref(),
                &path,
                "Failed to fetch project statistics",
                &missing,
            ))
            .await;

        if self.stats_fence.is_latest(seq) && self.store.is_current(generation) {
            self.stats
                .send_replace(result.as_ref().copied().unwrap_or_default());
        }
        result
    }

    /// Fetch `projects/{id}/activities`, most recent first.
    pub async fn fetch_activities(&self, id: ProjectId) -> Result<Vec<Activity>, StoreError> {
        if !id.is_valid() {
            return Err(self
                .store
                .reject("A project id is required to fetch activities".to_string()));
        }
        let seq = self.activities_fence.issue();
        let generation = self.store.generation();
        let path = format!("projects/{}/activities", id);
        let fallback = "Failed to fetch project activities";
        let result = self
            .store
            .track(async {
                let value = self
                    .store
                    .transport()
                    .get(&path, &[])
                    .await
                    .map_err(|err| StoreError::from_transport(err, fallback))?;
                if value.is_null() {
                    return Err(StoreError::not_found(format!(
                        "No activity found for project {}",
                        id
                    )));
                }
                decode_list::<Activity>(value, fallback)
            })
            .await;

        if self.activities_fence.is_latest(seq) && self.store.is_current(generation) {
            let activities = result.as_ref().cloned().unwrap_or_default();
            self.activities.send_replace(activities);
        }
        result
    }

    pub fn reset(&self) {
        self.store.reset();
        self.stats_fence.issue();
        self.activities_fence.issue();
        self.stats.send_replace(ProjectStats::default());
        self.activities.send_replace(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempo_core::{Method, ProjectDraft, ProjectStatus, Timestamp};
    use tempo_test_utils::fixtures::{activity_json, project_json};
    use tempo_test_utils::MockTransport;

    fn store(mock: &Arc<MockTransport>) -> ProjectStore {
        ProjectStore::new(mock.clone())
    }

    #[tokio::test]
    async fn test_partial_stats_are_zero_defaulted() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            Method::Get,
            "projects/1/stats",
            json!({"taskStats": {"total": 5}}),
        );
        let store = store(&mock);

        let stats = store.fetch_stats(ProjectId::new(1)).await.unwrap();
        assert_eq!(stats.task_stats.total, 5);
        assert_eq!(stats.task_stats.in_progress, 0);
        assert_eq!(stats.task_stats.completed, 0);
        assert_eq!(stats.time_stats.estimated, 0.0);
        assert_eq!(stats.cost_stats.human, 0.0);
        assert_eq!(store.stats(), stats);
        assert!(!store.resources().loading());
    }

    #[tokio::test]
    async fn test_missing_stats_are_not_found() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "projects/1/stats", Value::Null);
        let store = store(&mock);

        let err = store.fetch_stats(ProjectId::new(1)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            store.resources().error().as_deref(),
            Some("No statistics found for project 1")
        );
        assert_eq!(store.stats(), ProjectStats::default());
    }

    #[tokio::test]
    async fn test_stats_without_project_is_precondition() {
        let mock = Arc::new(MockTransport::new());
        let err = store(&mock)
            .fetch_stats(ProjectId::new(0))
            .await
            .unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_stats_keep_newest_request() {
        let mock = Arc::new(MockTransport::new());
        let first = mock.hold(Method::Get, "projects/1/stats");
        let second = mock.hold(Method::Get, "projects/2/stats");
        let store = store(&mock);

        let (older, newer) = tokio::join!(store.fetch_stats(ProjectId::new(1)), async {
            tokio::task::yield_now().await;
            let fetch = store.fetch_stats(ProjectId::new(2));
            tokio::pin!(fetch);
            let _ = second.send(Ok(json!({"taskStats": {"total": 2}})));
            let result = (&mut fetch).await;
            let _ = first.send(Ok(json!({"taskStats": {"total": 1}})));
            result
        });

        assert_eq!(older.unwrap().task_stats.total, 1);
        assert_eq!(newer.unwrap().task_stats.total, 2);
        assert_eq!(store.stats().task_stats.total, 2);
        assert!(!store.resources().loading());
    }

    #[tokio::test]
    async fn test_overlapping_activities_keep_newest_request() {
        let mock = Arc::new(MockTransport::new());
        let first = mock.hold(Method::Get, "projects/1/activities");
        let second = mock.hold(Method::Get, "projects/2/activities");
        let store = store(&mock);

        let (older, newer) = tokio::join!(store.fetch_activities(ProjectId::new(1)), async {
            tokio::task::yield_now().await;
            let fetch = store.fetch_activities(ProjectId::new(2));
            tokio::pin!(fetch);
            let _ = second.send(Ok(json!([activity_json(2, "second")])));
            let result = (&mut fetch).await;
            let _ = first.send(Ok(json!([activity_json(1, "first")])));
            result
        });

        assert!(older.is_ok());
        assert!(newer.is_ok());
        let activities = store.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].content, "second");
    }

    #[tokio::test]
    async fn test_activities_fetch() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            Method::Get,
            "projects/1/activities",
            json!([activity_json(1, "created"), activity_json(2, "updated")]),
        )
        .respond_json(Method::Get, "projects/1/activities", json!({"unexpected": true}))
        .respond_json(Method::Get, "projects/1/activities", Value::Null);
        let store = store(&mock);

        let activities = store.fetch_activities(ProjectId::new(1)).await.unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(store.activities()[1].content, "updated");

        let activities = store.fetch_activities(ProjectId::new(1)).await.unwrap();
        assert!(activities.is_empty());

        let err = store.fetch_activities(ProjectId::new(1)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.activities().is_empty());
    }

    #[tokio::test]
    async fn test_create_from_draft() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Post, "projects", project_json(5, "Apollo"));
        let store = store(&mock);
        let draft = ProjectDraft {
            name: "Apollo".to_string(),
            description: "Moonshot".to_string(),
            start_date: "2024-01-01T00:00:00".parse::<Timestamp>().unwrap(),
            end_date: "2024-12-31T00:00:00".parse::<Timestamp>().unwrap(),
            status: ProjectStatus::Planning,
            fixed_cost_monthly: 1200.0,
        };
        draft.validate().unwrap();

        let project = store.create_project(&draft).await.unwrap();
        assert_eq!(project.status, Some(ProjectStatus::InProgress));
        assert_eq!(store.projects().len(), 1);
        let body = mock.calls_to(Method::Post, "projects")[0]
            .json_body()
            .cloned()
            .unwrap();
        assert_eq!(body["status"], json!("PLANNING"));
        assert_eq!(body["name"], json!("Apollo"));
    }

    #[tokio::test]
    async fn test_update_refreshes_current_project() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "projects", json!([project_json(1, "A")]))
            .respond_json(Method::Get, "projects/1", project_json(1, "A"))
            .respond_json(Method::Put, "projects/1", project_json(1, "A2"));
        let store = store(&mock);

        store.fetch_projects().await.unwrap();
        store.fetch_project(ProjectId::new(1)).await.unwrap();
        store
            .update_project(ProjectId::new(1), &json!({"name": "A2"}))
            .await
            .unwrap();

        assert_eq!(store.projects()[0].name, "A2");
        assert_eq!(store.current_project().map(|p| p.name).as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_delete_clears_current_project() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "projects/1", project_json(1, "A"))
            .respond_json(Method::Delete, "projects/1", Value::Null);
        let store = store(&mock);

        store.fetch_project(ProjectId::new(1)).await.unwrap();
        store.delete_project(ProjectId::new(1)).await.unwrap();
        assert_eq!(store.current_project(), None);
    }

    #[tokio::test]
    async fn test_failed_fetch_project_clears_selection() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(Method::Get, "projects/1", project_json(1, "A"))
            .respond_status(Method::Get, "projects/2", 404, json!({"detail": "Project not found"}));
        let store = store(&mock);

        store.fetch_project(ProjectId::new(1)).await.unwrap();
        let err = store.fetch_project(ProjectId::new(2)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.current_project(), None);
    }

    #[tokio::test]
    async fn test_reset_clears_aggregates() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            Method::Get,
            "projects/1/stats",
            json!({"taskStats": {"total": 5, "completed": 2}}),
        );
        let store = store(&mock);
        store.fetch_stats(ProjectId::new(1)).await.unwrap();
        store.reset();
        assert_eq!(store.stats(), ProjectStats::default());
        assert!(store.activities().is_empty());
        assert!(store.projects().is_empty());
    }
}
