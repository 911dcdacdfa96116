use super::{check_date_range, require_text, Service};
use crate::models::{Sprint, SprintStatus};
use crate::Result;
use authz::{Action, Actor, ProjectId, ResourceKind, Target};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSprint {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SprintStatus,
}

impl NewSprint {
    fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        check_date_range(Some(self.start_date), Some(self.end_date))
    }

    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self {
            name: "Sprint 1".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            status: SprintStatus::Planned,
        }
    }
}

impl Service {
    pub async fn create_sprint(
        &self,
        actor: &Actor,
        project_id: i64,
        input: NewSprint,
    ) -> Result<Sprint> {
        self.ensure(
            actor,
            Action::Create,
            Target::new_in(ResourceKind::Sprint, ProjectId(project_id)),
        )
        .await?;
        input.validate()?;

        let id = sqlx::query(
            "INSERT INTO sprints (project_id, name, description, start_date, end_date, status) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.status)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        self.fetch("sprints", id).await
    }

    pub async fn get_sprint(&self, actor: &Actor, id: i64) -> Result<Sprint> {
        self.ensure(actor, Action::View, Target::existing(ResourceKind::Sprint, id))
            .await?;
        self.fetch("sprints", id).await
    }

    pub async fn list_sprints(&self, actor: &Actor, project_id: i64) -> Result<Vec<Sprint>> {
        self.ensure(
            actor,
            Action::View,
            Target::existing(ResourceKind::Project, project_id),
        )
        .await?;

        let sprints = sqlx::query_as::<_, Sprint>(
            "SELECT * FROM sprints WHERE project_id = ? ORDER BY start_date, id",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(sprints)
    }

    pub async fn update_sprint(&self, actor: &Actor, id: i64, input: NewSprint) -> Result<Sprint> {
        self.ensure(actor, Action::Update, Target::existing(ResourceKind::Sprint, id))
            .await?;
        input.validate()?;

        sqlx::query(
            "UPDATE sprints SET name = ?, description = ?, start_date = ?, end_date = ?, \
             status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.status)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        self.fetch("sprints", id).await
    }

    /// Delete a sprint and the tasks planned into it.
    pub async fn delete_sprint(&self, actor: &Actor, id: i64) -> Result<()> {
        self.ensure(actor, Action::Delete, Target::existing(ResourceKind::Sprint, id))
            .await?;

        sqlx::query("DELETE FROM sprints WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
