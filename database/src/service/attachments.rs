use super::{require_text, Service};
use crate::models::Attachment;
use crate::{DatabaseError, Result};
use authz::{Action, Actor, ProjectId, ResourceKind, Target};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metadata for an uploaded file. The bytes are stored elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
    pub task_id: Option<i64>,
    pub file_path: String,
    pub file_name: String,
    pub file_type: Option<String>,
}

impl Service {
    /// Record an uploaded file. Attachments are immutable once created.
    pub async fn add_attachment(
        &self,
        actor: &Actor,
        project_id: i64,
        input: NewAttachment,
    ) -> Result<Attachment> {
        self.ensure(
            actor,
            Action::Create,
            Target::new_in(ResourceKind::Attachment, ProjectId(project_id)),
        )
        .await?;
        require_text("file_name", &input.file_name)?;
        if input.file_path.trim().is_empty() {
            return Err(DatabaseError::Validation("file_path is required".into()));
        }

        if let Some(task_id) = input.task_id {
            let task_project: Option<(i64,)> =
                sqlx::query_as("SELECT project_id FROM tasks WHERE id = ?")
                    .bind(task_id)
                    .fetch_optional(self.db.pool())
                    .await?;
            match task_project {
                None => return Err(DatabaseError::EntityNotFound(format!("task {}", task_id))),
                Some((owner,)) if owner != project_id => {
                    return Err(DatabaseError::Validation(format!(
                        "task {} belongs to another project",
                        task_id
                    )))
                }
                Some(_) => {}
            }
        }

        let id = sqlx::query(
            "INSERT INTO attachments (project_id, task_id, uploaded_by, file_path, file_name, file_type) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(input.task_id)
        .bind(actor.id.0)
        .bind(&input.file_path)
        .bind(&input.file_name)
        .bind(&input.file_type)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        info!("User {} attached {} to project {}", actor.id, input.file_name, project_id);
        self.fetch("attachments", id).await
    }

    pub async fn get_attachment(&self, actor: &Actor, id: i64) -> Result<Attachment> {
        self.ensure(actor, Action::View, Target::existing(ResourceKind::Attachment, id))
            .await?;
        self.fetch("attachments", id).await
    }

    pub async fn list_attachments(&self, actor: &Actor, project_id: i64) -> Result<Vec<Attachment>> {
        self.ensure(
            actor,
            Action::View,
            Target::existing(ResourceKind::Project, project_id),
        )
        .await?;

        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE project_id = ? ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(attachments)
    }

    /// Delete the attachment record and return it, so the caller can remove
    /// the stored file at `file_path`.
    pub async fn delete_attachment(&self, actor: &Actor, id: i64) -> Result<Attachment> {
        self.ensure(
            actor,
            Action::Delete,
            Target::existing(ResourceKind::Attachment, id),
        )
        .await?;
        let attachment: Attachment = self.fetch("attachments", id).await?;

        sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        info!("User {} deleted attachment {}", actor.id, id);
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::World;
    use authz::ProjectRole;

    fn upload(name: &str) -> NewAttachment {
        NewAttachment {
            task_id: None,
            file_path: format!("attachments/{}", name),
            file_name: name.into(),
            file_type: Some("application/pdf".into()),
        }
    }

    #[tokio::test]
    async fn test_any_member_uploads_only_pm_deletes() {
        let world = World::new().await;
        let uiux = world.member("Uma", ProjectRole::Uiux).await;

        let attachment = world
            .service
            .add_attachment(&uiux.actor(), world.project.id, upload("mockup.pdf"))
            .await
            .unwrap();
        assert_eq!(attachment.uploaded_by, uiux.id);

        // Not even the uploader may delete it
        assert!(matches!(
            world.service.delete_attachment(&uiux.actor(), attachment.id).await,
            Err(DatabaseError::Forbidden(_))
        ));

        let removed = world
            .service
            .delete_attachment(&world.pm.actor(), attachment.id)
            .await
            .unwrap();
        assert_eq!(removed.file_path, "attachments/mockup.pdf");
        assert!(world
            .service
            .list_attachments(&uiux.actor(), world.project.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_attachment_update_never_allowed() {
        let world = World::new().await;
        let attachment = world
            .service
            .add_attachment(&world.pm.actor(), world.project.id, upload("brief.pdf"))
            .await
            .unwrap();
        let target = Target::existing(ResourceKind::Attachment, attachment.id);

        for action in [Action::Update, Action::Restore, Action::ForceDelete] {
            assert!(!world
                .service
                .engine()
                .authorize(&world.pm.actor(), action, &target)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_outsider_cannot_view_attachment() {
        let world = World::new().await;
        let attachment = world
            .service
            .add_attachment(&world.pm.actor(), world.project.id, upload("budget.pdf"))
            .await
            .unwrap();
        let eve = world.outsider("Eve").await;

        assert!(matches!(
            world.service.get_attachment(&eve.actor(), attachment.id).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world
                .service
                .add_attachment(&eve.actor(), world.project.id, upload("x.pdf"))
                .await,
            Err(DatabaseError::Forbidden(_))
        ));
    }
}
