//! Bundle of every store over one transport.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::nav::{LayoutState, Section};
use crate::persistence::{FileTokenStorage, TokenStorage};
use crate::session::SessionStore;
use crate::store::{
    CostStore, DashboardStore, ProjectStore, SprintStore, StoreError, TaskStore, TeamMemberStore,
};
use crate::transport::{CredentialSlot, HttpTransport};
use std::sync::Arc;
use tempo_core::{ProjectId, Transport};
use tokio::sync::watch;
use tracing::info;

pub struct Stores {
    pub session: SessionStore,
    pub projects: ProjectStore,
    pub tasks: TaskStore,
    pub sprints: SprintStore,
    pub costs: CostStore,
    pub team_members: TeamMemberStore,
    pub dashboard: DashboardStore,
    layout: watch::Sender<LayoutState>,
}

impl Stores {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStorage>,
        credential: CredentialSlot,
    ) -> Self {
        Self {
            session: SessionStore::new(transport.clone(), storage, credential),
            projects: ProjectStore::new(transport.clone()),
            tasks: TaskStore::new(transport.clone()),
            sprints: SprintStore::new(transport.clone()),
            costs: CostStore::new(transport.clone()),
            team_members: TeamMemberStore::new(transport.clone()),
            dashboard: DashboardStore::new(transport),
            layout: watch::Sender::new(LayoutState::default()),
        }
    }

    /// HTTP transport and file-backed session, as configured.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let credential = CredentialSlot::new();
        let transport = HttpTransport::new(config, credential.clone())?;
        let storage = FileTokenStorage::new(config.session_path.clone());
        Ok(Self::new(Arc::new(transport), Arc::new(storage), credential))
    }

    pub fn layout(&self) -> LayoutState {
        self.layout.borrow().clone()
    }

    pub fn subscribe_layout(&self) -> watch::Receiver<LayoutState> {
        self.layout.subscribe()
    }

    pub fn toggle_sidebar(&self) {
        self.layout.send_modify(LayoutState::toggle_collapse);
    }

    pub fn navigate(&self, section: Section) {
        self.layout
            .send_modify(|layout| layout.update_breadcrumbs(section));
    }

    /// Reset every resource store. The session is left alone.
    pub fn reset_all(&self) {
        self.projects.reset();
        self.tasks.reset();
        self.sprints.reset();
        self.costs.reset();
        self.team_members.reset();
        self.dashboard.reset();
    }

    /// Log out and drop every cached collection.
    pub fn logout(&self) {
        self.session.logout();
        self.reset_all();
    }

    /// Delete a project, then reset the task, sprint and cost stores that
    /// hold its children.
    ///
    /// Stores scoped to another project are kept. Nothing is reset when the
    /// delete fails.
    pub async fn delete_project_cascade(&self, id: ProjectId) -> Result<(), StoreError> {
        self.projects.delete_project(id).await?;

        let mut cleared = Vec::new();
        if self.tasks.current_project() == Some(id) {
            self.tasks.reset();
            cleared.push("tasks");
        }
        if self.sprints.resources().scope() == Some(id) {
            self.sprints.reset();
            cleared.push("sprints");
        }
        if self.costs.resources().scope() == Some(id) {
            self.costs.reset();
            cleared.push("costs");
        }
        info!(project_id = %id, cleared = ?cleared, "project deleted with dependents");
        Ok(())
    }
}
