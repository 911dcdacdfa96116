use super::{check_date_range, require_text, Service};
use crate::models::{Project, ProjectStatus};
use crate::Result;
use authz::{Action, Actor, ProjectRole, ResourceKind, Target};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Editable project fields. Used for both creation and full updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub budget: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        if let Some(client) = &self.client {
            require_text("client", client)?;
        }
        check_date_range(self.start_date, self.end_date)
    }
}

impl Service {
    /// Create a project and make the creator its project manager.
    ///
    /// Both rows are written in one transaction, so a project never exists
    /// without a `project_manager` member.
    pub async fn create_project(&self, actor: &Actor, input: NewProject) -> Result<Project> {
        self.ensure(actor, Action::Create, Target::new_project())
            .await?;
        input.validate()?;

        let mut tx = self.db.pool().begin().await?;

        let project_id = sqlx::query(
            "INSERT INTO projects (name, client, description, budget, start_date, end_date, status, created_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.client)
        .bind(&input.description)
        .bind(&input.budget)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(ProjectStatus::Planning)
        .bind(actor.id.0)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role_in_project) VALUES (?, ?, ?)",
        )
        .bind(project_id)
        .bind(actor.id.0)
        .bind(ProjectRole::ProjectManager.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("User {} created project {}", actor.id, project_id);
        self.fetch("projects", project_id).await
    }

    pub async fn get_project(&self, actor: &Actor, id: i64) -> Result<Project> {
        self.ensure(actor, Action::View, Target::existing(ResourceKind::Project, id))
            .await?;
        self.fetch("projects", id).await
    }

    /// Projects the actor is a member of, newest first.
    ///
    /// Listing is scoped by membership rather than a blanket `viewAny`.
    pub async fn list_projects(&self, actor: &Actor) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT p.* FROM projects p \
             JOIN project_members m ON m.project_id = p.id \
             WHERE m.user_id = ? \
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .bind(actor.id.0)
        .fetch_all(self.db.pool())
        .await?;
        Ok(projects)
    }

    pub async fn update_project(&self, actor: &Actor, id: i64, input: NewProject) -> Result<Project> {
        self.ensure(actor, Action::Update, Target::existing(ResourceKind::Project, id))
            .await?;
        input.validate()?;

        sqlx::query(
            "UPDATE projects SET name = ?, client = ?, description = ?, budget = ?, \
             start_date = ?, end_date = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.client)
        .bind(&input.description)
        .bind(&input.budget)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        self.fetch("projects", id).await
    }

    pub async fn set_project_status(
        &self,
        actor: &Actor,
        id: i64,
        status: ProjectStatus,
    ) -> Result<Project> {
        self.ensure(actor, Action::Update, Target::existing(ResourceKind::Project, id))
            .await?;

        sqlx::query("UPDATE projects SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        self.fetch("projects", id).await
    }

    /// Delete a project together with everything it owns.
    pub async fn delete_project(&self, actor: &Actor, id: i64) -> Result<()> {
        self.ensure(actor, Action::Delete, Target::existing(ResourceKind::Project, id))
            .await?;

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        info!("User {} deleted project {}", actor.id, id);
        Ok(())
    }
}
