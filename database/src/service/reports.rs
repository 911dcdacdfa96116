use super::Service;
use crate::models::Report;
use crate::Result;
use authz::{Action, Actor, ResourceKind, Target};
use tracing::info;

/// Share of `completed` in `total` as a percentage rounded to two decimals.
/// A project without tasks is at 0.
fn progress(total: i64, completed: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 10_000.0).round() / 100.0
}

impl Service {
    /// Snapshot task completion for a project. Any member may generate one.
    pub async fn generate_report(
        &self,
        actor: &Actor,
        project_id: i64,
        summary: Option<String>,
    ) -> Result<Report> {
        self.ensure(
            actor,
            Action::View,
            Target::existing(ResourceKind::Project, project_id),
        )
        .await?;

        // Count and insert see the same task set
        let mut tx = self.db.pool().begin().await?;

        let (total, completed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(status = 'done'), 0) FROM tasks WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_one(&mut *tx)
        .await?;

        let id = sqlx::query(
            "INSERT INTO reports (project_id, generated_by, summary, total_tasks, completed_tasks, progress) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(actor.id.0)
        .bind(&summary)
        .bind(total)
        .bind(completed)
        .bind(progress(total, completed))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(
            "User {} generated report {} for project {}: {}/{} tasks done",
            actor.id, id, project_id, completed, total
        );
        self.fetch("reports", id).await
    }

    /// Reports of a project, newest first.
    pub async fn list_reports(&self, actor: &Actor, project_id: i64) -> Result<Vec<Report>> {
        self.ensure(
            actor,
            Action::View,
            Target::existing(ResourceKind::Project, project_id),
        )
        .await?;

        let reports = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE project_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::service::fixtures::World;
    use crate::service::{NewTask, TaskUpdate};
    use crate::DatabaseError;
    use authz::ProjectRole;

    #[test]
    fn test_progress_rounding() {
        assert_eq!(progress(0, 0), 0.0);
        assert_eq!(progress(3, 1), 33.33);
        assert_eq!(progress(3, 2), 66.67);
        assert_eq!(progress(4, 4), 100.0);
    }

    #[tokio::test]
    async fn test_report_without_tasks() {
        let world = World::new().await;

        let report = world
            .service
            .generate_report(&world.pm.actor(), world.project.id, None)
            .await
            .unwrap();
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.completed_tasks, 0);
        assert_eq!(report.progress, 0.0);
        assert_eq!(report.generated_by, world.pm.id);
    }

    #[tokio::test]
    async fn test_report_counts_done_tasks() {
        let world = World::new().await;
        let carol = world.member("Carol", ProjectRole::Backend).await;
        let pm = world.pm.actor();

        let mut tasks = Vec::new();
        for title in ["Schema", "API", "Docs"] {
            tasks.push(
                world
                    .service
                    .create_task(&pm, world.project.id, NewTask::titled(title))
                    .await
                    .unwrap(),
            );
        }
        let mut done = TaskUpdate::from(tasks[0].clone());
        done.fields.status = TaskStatus::Done;
        done.progress_percentage = 100;
        world.service.update_task(&pm, tasks[0].id, done).await.unwrap();

        let first = world
            .service
            .generate_report(&carol.actor(), world.project.id, Some("Week 1".into()))
            .await
            .unwrap();
        assert_eq!(first.total_tasks, 3);
        assert_eq!(first.completed_tasks, 1);
        assert_eq!(first.progress, 33.33);
        assert_eq!(first.summary.as_deref(), Some("Week 1"));

        let second = world
            .service
            .generate_report(&pm, world.project.id, None)
            .await
            .unwrap();

        let ids: Vec<_> = world
            .service
            .list_reports(&carol.actor(), world.project.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, [second.id, first.id]);
    }

    #[tokio::test]
    async fn test_reports_need_membership() {
        let world = World::new().await;
        let eve = world.outsider("Eve").await;

        assert!(matches!(
            world.service.generate_report(&eve.actor(), world.project.id, None).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world.service.list_reports(&eve.actor(), world.project.id).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world.service.generate_report(&world.pm.actor(), 999, None).await,
            Err(DatabaseError::EntityNotFound(_))
        ));
    }
}
