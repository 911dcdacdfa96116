use super::notifications::{insert_notification, NewNotification};
use super::{require_text, Service};
use crate::models::{ModuleType, Task, TaskPriority, TaskStatus};
use crate::{DatabaseError, Result};
use authz::{Action, Actor, ProjectId, ResourceKind, Target};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub sprint_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub module_type: ModuleType,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            sprint_id: None,
            assigned_to: None,
            title: title.into(),
            description: None,
            module_type: ModuleType::Backend,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            due_date: None,
        }
    }
}

/// A full task update. Progress is only settable here; new tasks start at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(flatten)]
    pub fields: NewTask,
    pub progress_percentage: i64,
}

impl From<Task> for TaskUpdate {
    fn from(task: Task) -> Self {
        Self {
            fields: NewTask {
                sprint_id: task.sprint_id,
                assigned_to: task.assigned_to,
                title: task.title,
                description: task.description,
                module_type: task.module_type,
                priority: task.priority,
                status: task.status,
                due_date: task.due_date,
            },
            progress_percentage: task.progress_percentage,
        }
    }
}

impl Service {
    pub async fn create_task(&self, actor: &Actor, project_id: i64, input: NewTask) -> Result<Task> {
        self.ensure(
            actor,
            Action::Create,
            Target::new_in(ResourceKind::Task, ProjectId(project_id)),
        )
        .await?;
        self.validate_task(project_id, &input).await?;

        let mut tx = self.db.pool().begin().await?;
        let id = sqlx::query(
            "INSERT INTO tasks (project_id, sprint_id, assigned_to, created_by, title, description, \
             module_type, priority, status, progress_percentage, due_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(project_id)
        .bind(input.sprint_id)
        .bind(input.assigned_to)
        .bind(actor.id.0)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.module_type)
        .bind(input.priority)
        .bind(input.status)
        .bind(input.due_date)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if let Some(assignee) = input.assigned_to {
            notify_assignment(&mut tx, assignee, id, &input.title).await?;
        }
        tx.commit().await?;

        info!("User {} created task {} in project {}", actor.id, id, project_id);
        self.fetch("tasks", id).await
    }

    pub async fn get_task(&self, actor: &Actor, id: i64) -> Result<Task> {
        self.ensure(actor, Action::View, Target::existing(ResourceKind::Task, id))
            .await?;
        self.fetch("tasks", id).await
    }

    /// Tasks of a project, newest first, optionally limited to one sprint.
    pub async fn list_tasks(
        &self,
        actor: &Actor,
        project_id: i64,
        sprint_id: Option<i64>,
    ) -> Result<Vec<Task>> {
        self.ensure(
            actor,
            Action::View,
            Target::existing(ResourceKind::Project, project_id),
        )
        .await?;

        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE project_id = ? AND (? IS NULL OR sprint_id = ?) \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(project_id)
        .bind(sprint_id)
        .bind(sprint_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(tasks)
    }

    pub async fn update_task(&self, actor: &Actor, id: i64, input: TaskUpdate) -> Result<Task> {
        self.ensure(actor, Action::Update, Target::existing(ResourceKind::Task, id))
            .await?;
        let before: Task = self.fetch("tasks", id).await?;
        self.validate_task(before.project_id, &input.fields).await?;
        if !(0..=100).contains(&input.progress_percentage) {
            return Err(DatabaseError::Validation(
                "progress_percentage must be between 0 and 100".into(),
            ));
        }

        let fields = &input.fields;
        let mut tx = self.db.pool().begin().await?;
        sqlx::query(
            "UPDATE tasks SET sprint_id = ?, assigned_to = ?, title = ?, description = ?, \
             module_type = ?, priority = ?, status = ?, progress_percentage = ?, due_date = ?, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(fields.sprint_id)
        .bind(fields.assigned_to)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.module_type)
        .bind(fields.priority)
        .bind(fields.status)
        .bind(input.progress_percentage)
        .bind(fields.due_date)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // Only a newly assigned user hears about it
        if let Some(assignee) = fields.assigned_to.filter(|a| Some(*a) != before.assigned_to) {
            notify_assignment(&mut tx, assignee, id, &fields.title).await?;
        }
        tx.commit().await?;

        self.fetch("tasks", id).await
    }

    pub async fn delete_task(&self, actor: &Actor, id: i64) -> Result<()> {
        self.ensure(actor, Action::Delete, Target::existing(ResourceKind::Task, id))
            .await?;

        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        info!("User {} deleted task {}", actor.id, id);
        Ok(())
    }

    async fn validate_task(&self, project_id: i64, input: &NewTask) -> Result<()> {
        require_text("title", &input.title)?;

        if let Some(sprint_id) = input.sprint_id {
            let sprint_project: Option<(i64,)> =
                sqlx::query_as("SELECT project_id FROM sprints WHERE id = ?")
                    .bind(sprint_id)
                    .fetch_optional(self.db.pool())
                    .await?;
            match sprint_project {
                None => return Err(DatabaseError::EntityNotFound(format!("sprint {}", sprint_id))),
                Some((owner,)) if owner != project_id => {
                    return Err(DatabaseError::Validation(format!(
                        "sprint {} belongs to another project",
                        sprint_id
                    )))
                }
                Some(_) => {}
            }
        }

        if let Some(assignee) = input.assigned_to {
            self.get_user(assignee).await?;
        }

        Ok(())
    }
}

async fn notify_assignment(
    conn: &mut SqliteConnection,
    assignee: i64,
    task_id: i64,
    title: &str,
) -> Result<()> {
    insert_notification(
        conn,
        assignee,
        &NewNotification {
            kind: "task_assigned".into(),
            title: "Task assigned".into(),
            message: format!("You were assigned task #{}: {}", task_id, title),
            sent_via_email: false,
        },
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::World;
    use crate::service::NewSprint;
    use authz::ProjectRole;

    #[tokio::test]
    async fn test_backend_member_creates_but_cannot_delete() {
        let world = World::new().await;
        let carol = world.member("Carol", ProjectRole::Backend).await;

        let task = world
            .service
            .create_task(&carol.actor(), world.project.id, NewTask::titled("Login API"))
            .await
            .unwrap();
        assert_eq!(task.created_by, carol.id);
        assert_eq!(task.progress_percentage, 0);

        assert!(matches!(
            world.service.delete_task(&carol.actor(), task.id).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world
                .service
                .create_sprint(&carol.actor(), world.project.id, NewSprint::sample())
                .await,
            Err(DatabaseError::Forbidden(_))
        ));

        // A project manager deletes tasks they did not create
        world
            .service
            .delete_task(&world.pm.actor(), task.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_every_role_may_update_tasks() {
        let world = World::new().await;
        let task = world
            .service
            .create_task(&world.pm.actor(), world.project.id, NewTask::titled("Landing page"))
            .await
            .unwrap();

        for (i, role) in ProjectRole::ALL.into_iter().enumerate().skip(1) {
            let member = world.member(&format!("Member{}", i), role).await;
            let mut update = TaskUpdate::from(task.clone());
            update.progress_percentage = (i * 10) as i64;
            let updated = world
                .service
                .update_task(&member.actor(), task.id, update)
                .await
                .unwrap();
            assert_eq!(updated.progress_percentage, (i * 10) as i64);
        }
    }

    #[tokio::test]
    async fn test_task_validation() {
        let world = World::new().await;
        let other = world
            .service
            .create_project(&world.pm.actor(), crate::service::NewProject::named("Other"))
            .await
            .unwrap();
        let foreign_sprint = world
            .service
            .create_sprint(&world.pm.actor(), other.id, NewSprint::sample())
            .await
            .unwrap();

        let input = NewTask {
            sprint_id: Some(foreign_sprint.id),
            ..NewTask::titled("Misfiled")
        };
        assert!(matches!(
            world
                .service
                .create_task(&world.pm.actor(), world.project.id, input)
                .await,
            Err(DatabaseError::Validation(_))
        ));

        let task = world
            .service
            .create_task(&world.pm.actor(), world.project.id, NewTask::titled("Ok"))
            .await
            .unwrap();
        let mut update = TaskUpdate::from(task.clone());
        update.progress_percentage = 101;
        assert!(matches!(
            world.service.update_task(&world.pm.actor(), task.id, update).await,
            Err(DatabaseError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_tasks_by_sprint() {
        let world = World::new().await;
        let sprint = world
            .service
            .create_sprint(&world.pm.actor(), world.project.id, NewSprint::sample())
            .await
            .unwrap();
        world
            .service
            .create_task(
                &world.pm.actor(),
                world.project.id,
                NewTask {
                    sprint_id: Some(sprint.id),
                    ..NewTask::titled("Planned")
                },
            )
            .await
            .unwrap();
        world
            .service
            .create_task(&world.pm.actor(), world.project.id, NewTask::titled("Backlog"))
            .await
            .unwrap();

        let all = world
            .service
            .list_tasks(&world.pm.actor(), world.project.id, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let planned = world
            .service
            .list_tasks(&world.pm.actor(), world.project.id, Some(sprint.id))
            .await
            .unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].title, "Planned");
    }

    #[tokio::test]
    async fn test_creating_in_missing_project_is_not_found() {
        let world = World::new().await;

        let err = world
            .service
            .create_task(&world.pm.actor(), 999, NewTask::titled("Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::EntityNotFound(ref msg) if msg.contains("999")));

        let err = world
            .service
            .create_sprint(&world.pm.actor(), 999, NewSprint::sample())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn test_assignee_is_notified() {
        let world = World::new().await;
        let carol = world.member("Carol", ProjectRole::Frontend).await;
        let input = NewTask {
            assigned_to: Some(carol.id),
            module_type: ModuleType::Frontend,
            ..NewTask::titled("Navbar")
        };
        world
            .service
            .create_task(&world.pm.actor(), world.project.id, input)
            .await
            .unwrap();

        let inbox = world.service.list_notifications(&carol.actor()).await.unwrap();
        assert!(inbox.iter().any(|n| n.kind == "task_assigned"));
    }
}
