use super::Service;
use crate::models::TimeLog;
use crate::{DatabaseError, Result};
use authz::{Action, Actor, EntityRef, ResourceGraph, ResourceKind, Target};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Smallest loggable amount of work, in hours.
const MIN_HOURS: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeLog {
    pub date: NaiveDate,
    pub hours: f64,
    pub note: Option<String>,
}

impl NewTimeLog {
    fn validate(&self) -> Result<()> {
        if !self.hours.is_finite() || self.hours < MIN_HOURS {
            return Err(DatabaseError::Validation(format!(
                "hours must be at least {}",
                MIN_HOURS
            )));
        }
        Ok(())
    }
}

impl Service {
    /// Record time on a task. The actor becomes the log's recorder.
    pub async fn log_time(&self, actor: &Actor, task_id: i64, input: NewTimeLog) -> Result<TimeLog> {
        let project = self
            .db
            .owning_project(&EntityRef::new(ResourceKind::Task, task_id))
            .await?;
        self.ensure(
            actor,
            Action::Create,
            Target::new_in(ResourceKind::TimeLog, project),
        )
        .await?;
        input.validate()?;

        let id = sqlx::query(
            "INSERT INTO time_logs (task_id, user_id, date, hours, note) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(actor.id.0)
        .bind(input.date)
        .bind(input.hours)
        .bind(&input.note)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        self.fetch("time_logs", id).await
    }

    pub async fn get_time_log(&self, actor: &Actor, id: i64) -> Result<TimeLog> {
        self.ensure(actor, Action::View, Target::existing(ResourceKind::TimeLog, id))
            .await?;
        self.fetch("time_logs", id).await
    }

    pub async fn list_time_logs(&self, actor: &Actor, task_id: i64) -> Result<Vec<TimeLog>> {
        self.ensure(actor, Action::View, Target::existing(ResourceKind::Task, task_id))
            .await?;

        let logs = sqlx::query_as::<_, TimeLog>(
            "SELECT * FROM time_logs WHERE task_id = ? ORDER BY date, id",
        )
        .bind(task_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(logs)
    }

    pub async fn update_time_log(
        &self,
        actor: &Actor,
        id: i64,
        input: NewTimeLog,
    ) -> Result<TimeLog> {
        self.ensure(actor, Action::Update, Target::existing(ResourceKind::TimeLog, id))
            .await?;
        input.validate()?;

        sqlx::query(
            "UPDATE time_logs SET date = ?, hours = ?, note = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?",
        )
        .bind(input.date)
        .bind(input.hours)
        .bind(&input.note)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        self.fetch("time_logs", id).await
    }

    pub async fn delete_time_log(&self, actor: &Actor, id: i64) -> Result<()> {
        self.ensure(actor, Action::Delete, Target::existing(ResourceKind::TimeLog, id))
            .await?;

        sqlx::query("DELETE FROM time_logs WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::World;
    use crate::service::NewTask;
    use authz::ProjectRole;

    fn hours(h: f64) -> NewTimeLog {
        NewTimeLog {
            date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            hours: h,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_recorder_or_project_manager_edits_logs() {
        let world = World::new().await;
        let dana = world.member("Dana", ProjectRole::Marketing).await;
        let carol = world.member("Carol", ProjectRole::Backend).await;
        let task = world
            .service
            .create_task(&world.pm.actor(), world.project.id, NewTask::titled("Campaign"))
            .await
            .unwrap();

        let own = world
            .service
            .log_time(&dana.actor(), task.id, hours(2.0))
            .await
            .unwrap();
        assert_eq!(own.recorded_by(), dana.actor().id);
        let others = world
            .service
            .log_time(&carol.actor(), task.id, hours(1.5))
            .await
            .unwrap();

        // A marketing member edits their own log but not a colleague's
        let edited = world
            .service
            .update_time_log(&dana.actor(), own.id, hours(2.5))
            .await
            .unwrap();
        assert_eq!(edited.hours, 2.5);
        assert!(matches!(
            world
                .service
                .update_time_log(&dana.actor(), others.id, hours(3.0))
                .await,
            Err(DatabaseError::Forbidden(_))
        ));

        // The project manager edits anyone's
        world
            .service
            .update_time_log(&world.pm.actor(), others.id, hours(1.0))
            .await
            .unwrap();
        world
            .service
            .delete_time_log(&world.pm.actor(), own.id)
            .await
            .unwrap();

        let remaining = world
            .service
            .list_time_logs(&carol.actor(), task.id)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, others.id);
    }

    #[tokio::test]
    async fn test_outsider_cannot_log_time() {
        let world = World::new().await;
        let task = world
            .service
            .create_task(&world.pm.actor(), world.project.id, NewTask::titled("Docs"))
            .await
            .unwrap();
        let eve = world.outsider("Eve").await;

        assert!(matches!(
            world.service.log_time(&eve.actor(), task.id, hours(1.0)).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world.service.log_time(&eve.actor(), 999, hours(1.0)).await,
            Err(DatabaseError::EntityNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_hours_must_be_positive() {
        let world = World::new().await;
        let task = world
            .service
            .create_task(&world.pm.actor(), world.project.id, NewTask::titled("Docs"))
            .await
            .unwrap();

        for bad in [0.0, 0.05, -1.0, f64::NAN] {
            assert!(matches!(
                world.service.log_time(&world.pm.actor(), task.id, hours(bad)).await,
                Err(DatabaseError::Validation(_))
            ));
        }
    }
}
