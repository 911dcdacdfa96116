//! The database as the policy engine's collaborator.

use crate::Database;
use async_trait::async_trait;
use authz::{
    AuthzError, EntityRef, MemberRole, MembershipStore, ProjectId, ResolvedResource,
    ResourceGraph, ResourceKind, UserId,
};
use tracing::debug;

fn store_error(err: sqlx::Error) -> AuthzError {
    AuthzError::Store(err.to_string())
}

#[async_trait]
impl MembershipStore for Database {
    async fn membership_role(
        &self,
        project: ProjectId,
        user: UserId,
    ) -> authz::Result<Option<MemberRole>> {
        let role: Option<(String,)> = sqlx::query_as(
            "SELECT role_in_project FROM project_members WHERE project_id = ? AND user_id = ?",
        )
        .bind(project.0)
        .bind(user.0)
        .fetch_optional(self.pool())
        .await
        .map_err(store_error)?;

        debug!(
            "Membership of user {} in project {}: {:?}",
            user, project, role
        );

        Ok(role.map(|(raw,)| MemberRole::from(raw.as_str())))
    }
}

#[async_trait]
impl ResourceGraph for Database {
    async fn resolve(&self, entity: &EntityRef) -> authz::Result<ResolvedResource> {
        // Time logs reach their project through the task they were logged on
        let sql = match entity.kind {
            ResourceKind::Project => "SELECT id, NULL FROM projects WHERE id = ?",
            ResourceKind::ProjectMember => {
                "SELECT project_id, NULL FROM project_members WHERE id = ?"
            }
            ResourceKind::Sprint => "SELECT project_id, NULL FROM sprints WHERE id = ?",
            ResourceKind::Task => "SELECT project_id, NULL FROM tasks WHERE id = ?",
            ResourceKind::TimeLog => {
                "SELECT t.project_id, l.user_id FROM time_logs l \
                 JOIN tasks t ON t.id = l.task_id WHERE l.id = ?"
            }
            ResourceKind::Attachment => "SELECT project_id, NULL FROM attachments WHERE id = ?",
        };

        let row: Option<(i64, Option<i64>)> = sqlx::query_as(sql)
            .bind(entity.id)
            .fetch_optional(self.pool())
            .await
            .map_err(store_error)?;

        match row {
            Some((project, recorded_by)) => Ok(ResolvedResource {
                project: ProjectId(project),
                recorded_by: recorded_by.map(UserId),
            }),
            None => Err(AuthzError::ResourceNotFound {
                kind: entity.kind,
                id: entity.id,
            }),
        }
    }
}
