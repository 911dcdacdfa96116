//! Collaborator seams: where membership and ownership facts come from.
//!
//! Both traits are implemented by the persistence layer. The engine never
//! caches their answers; membership may change between two requests of the
//! same session.

use crate::error::Result;
use crate::role::MemberRole;
use crate::types::{EntityRef, ProjectId, UserId};
use async_trait::async_trait;

/// Answers "what role, if any, does this user hold in this project?".
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn membership_role(&self, project: ProjectId, user: UserId)
        -> Result<Option<MemberRole>>;
}

/// What the resource graph knows about an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedResource {
    pub project: ProjectId,

    /// The user who recorded the entity, for kinds that track one.
    pub recorded_by: Option<UserId>,
}

/// Read-only traversal from any entity up to its owning project.
#[async_trait]
pub trait ResourceGraph: Send + Sync {
    /// Resolve an entity. Must return `AuthzError::ResourceNotFound` when the
    /// entity does not exist.
    async fn resolve(&self, entity: &EntityRef) -> Result<ResolvedResource>;

    async fn owning_project(&self, entity: &EntityRef) -> Result<ProjectId> {
        Ok(self.resolve(entity).await?.project)
    }
}
