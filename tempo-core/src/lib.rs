//! Tempo Core - Entity Types
//!
//! Data types shared by every Tempo crate, plus the transport contract the
//! client stores are written against. No store logic lives here.

pub mod aggregates;
pub mod drafts;
pub mod entities;
pub mod enums;
pub mod identity;
pub mod transport;

pub use aggregates::{
    Aggregate, AggregateError, CostBreakdown, CostStats, DashboardStatistics, ProjectStats,
    StatusShare, TaskStats, TimeStats,
};
pub use drafts::{
    CostDraft, DraftError, ProjectDraft, SprintDraft, TaskDraft, TeamMemberDraft,
    TeamMemberPatch,
};
pub use entities::{
    Activity, CostRecord, MemberRef, Project, ProjectMember, ProjectRef, Resource, ResourceKind,
    Sprint, Task, TeamMember, User,
};
pub use enums::{ProjectStatus, TaskPriority, TaskStatus};
pub use identity::{
    ActivityId, CostId, EntityIdType, ProjectId, ProjectMemberId, SprintId, TaskId,
    TeamMemberId, Timestamp, UserId,
};
pub use transport::{
    Method, QueryParams, RequestBody, Transport, TransportError, TransportResult,
};
