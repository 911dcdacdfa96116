use super::notifications::{insert_notification, NewNotification};
use super::Service;
use crate::models::ProjectMember;
use crate::{DatabaseError, Result};
use authz::{Action, Actor, ProjectId, ProjectRole, ResourceKind, Target};
use tracing::info;

/// Matches rows that are NOT the last project manager of their project.
const NOT_LAST_MANAGER: &str = "NOT (role_in_project = 'project_manager' AND \
     (SELECT COUNT(*) FROM project_members pm \
      WHERE pm.project_id = project_members.project_id \
      AND pm.role_in_project = 'project_manager') <= 1)";

impl Service {
    /// Add `user_id` to a project with `role`.
    ///
    /// A user can hold at most one membership per project; a second add is
    /// a `Conflict`, use [`update_member_role`](Self::update_member_role).
    pub async fn add_member(
        &self,
        actor: &Actor,
        project_id: i64,
        user_id: i64,
        role: ProjectRole,
    ) -> Result<ProjectMember> {
        self.ensure(
            actor,
            Action::Create,
            Target::new_in(ResourceKind::ProjectMember, ProjectId(project_id)),
        )
        .await?;
        let user = self.get_user(user_id).await?;

        // The membership and its notification commit together
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role_in_project) VALUES (?, ?, ?)",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) => {
                let err = DatabaseError::from(e);
                return Err(if err.is_unique_violation() {
                    DatabaseError::Conflict(format!(
                        "user {} is already a member of project {}",
                        user_id, project_id
                    ))
                } else {
                    err
                });
            }
        };

        insert_notification(
            &mut tx,
            user.id,
            &NewNotification {
                kind: "project_member_added".into(),
                title: "Added to project".into(),
                message: format!("You were added to project #{} as {}", project_id, role),
                sent_via_email: false,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "User {} added user {} to project {} as {}",
            actor.id, user_id, project_id, role
        );

        self.fetch("project_members", id).await
    }

    /// Change a member's role. Demoting the last project manager is refused.
    pub async fn update_member_role(
        &self,
        actor: &Actor,
        member_id: i64,
        role: ProjectRole,
    ) -> Result<ProjectMember> {
        self.ensure(
            actor,
            Action::Update,
            Target::existing(ResourceKind::ProjectMember, member_id),
        )
        .await?;

        let sql = if role == ProjectRole::ProjectManager {
            "UPDATE project_members SET role_in_project = ? WHERE id = ?".to_string()
        } else {
            format!(
                "UPDATE project_members SET role_in_project = ? WHERE id = ? AND {}",
                NOT_LAST_MANAGER
            )
        };

        let updated = sqlx::query(&sql)
            .bind(role.as_str())
            .bind(member_id)
            .execute(self.db.pool())
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(DatabaseError::Validation(
                "a project must keep at least one project_manager".into(),
            ));
        }

        self.fetch("project_members", member_id).await
    }

    /// Remove a membership. Removing the last project manager is refused.
    pub async fn remove_member(&self, actor: &Actor, member_id: i64) -> Result<()> {
        self.ensure(
            actor,
            Action::Delete,
            Target::existing(ResourceKind::ProjectMember, member_id),
        )
        .await?;

        let sql = format!(
            "DELETE FROM project_members WHERE id = ? AND {}",
            NOT_LAST_MANAGER
        );
        let deleted = sqlx::query(&sql)
            .bind(member_id)
            .execute(self.db.pool())
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(DatabaseError::Validation(
                "a project must keep at least one project_manager".into(),
            ));
        }

        info!("User {} removed membership {}", actor.id, member_id);
        Ok(())
    }

    pub async fn list_members(&self, actor: &Actor, project_id: i64) -> Result<Vec<ProjectMember>> {
        self.ensure(
            actor,
            Action::View,
            Target::existing(ResourceKind::Project, project_id),
        )
        .await?;

        let members = sqlx::query_as::<_, ProjectMember>(
            "SELECT * FROM project_members WHERE project_id = ? ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(members)
    }
}
