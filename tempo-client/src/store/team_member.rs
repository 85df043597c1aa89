//! Team member store.

use super::engine::{ResourceSpec, ResourceStore, ScopeRule};
use super::error::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tempo_core::{
    EntityIdType, ProjectId, ProjectMember, ResourceKind, TeamMember, TeamMemberId, Transport,
};

pub struct TeamMemberStore {
    store: ResourceStore<TeamMember>,
}

impl TeamMemberStore {
    pub const SPEC: ResourceSpec =
        ResourceSpec::new(ResourceKind::TeamMember, ScopeRule::Unscoped, false);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            store: ResourceStore::new(transport, Self::SPEC),
        }
    }

    pub fn resources(&self) -> &ResourceStore<TeamMember> {
        &self.store
    }

    pub async fn fetch_team_members(&self) -> Result<Vec<TeamMember>, StoreError> {
        self.store.fetch_all(None).await
    }

    pub async fn fetch_team_member(&self, id: TeamMemberId) -> Result<TeamMember, StoreError> {
        self.store.fetch_one(id).await
    }

    pub async fn create_team_member<P>(&self, payload: &P) -> Result<TeamMember, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.create(payload).await
    }

    pub async fn update_team_member<P>(
        &self,
        id: TeamMemberId,
        payload: &P,
    ) -> Result<TeamMember, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.store.update(id, payload).await
    }

    pub async fn delete_team_member(&self, id: TeamMemberId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    /// Allocations of members to a project.
    pub async fn fetch_project_members(
        &self,
        project: ProjectId,
    ) -> Result<Vec<ProjectMember>, StoreError> {
        if !project.is_valid() {
            return Err(self
                .store
                .reject("A project id is required to fetch project members".to_string()));
        }
        let path = format!("team-members/project-members/{}", project);
        self.store
            .fetch_related(&path, &[], "Failed to fetch project members")
            .await
    }

    pub fn team_members(&self) -> Vec<TeamMember> {
        self.store.items()
    }

    pub fn reset(&self) {
        self.store.reset();
    }
}
