use super::Service;
use crate::models::Notification;
use crate::{DatabaseError, Result};
use authz::Actor;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub sent_via_email: bool,
}

/// Insert a notification on `conn`, so callers can make it part of the
/// transaction that caused it.
pub(super) async fn insert_notification(
    conn: &mut SqliteConnection,
    user_id: i64,
    input: &NewNotification,
) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO notifications (user_id, kind, title, message, sent_via_email) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&input.kind)
    .bind(&input.title)
    .bind(&input.message)
    .bind(input.sent_via_email)
    .execute(conn)
    .await?
    .last_insert_rowid();

    debug!("Notification {} queued for user {}", id, user_id);
    Ok(id)
}

impl Service {
    /// Deliver a notification to `user_id`. Internal; not actor-guarded.
    pub async fn notify(&self, user_id: i64, input: NewNotification) -> Result<Notification> {
        let mut conn = self.db.pool().acquire().await?;
        let id = insert_notification(&mut conn, user_id, &input).await?;
        drop(conn);
        self.fetch("notifications", id).await
    }

    /// The actor's own notifications, newest first.
    pub async fn list_notifications(&self, actor: &Actor) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(actor.id.0)
        .fetch_all(self.db.pool())
        .await?;
        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, actor: &Actor, id: i64) -> Result<Notification> {
        self.owned_notification(actor, id).await?;

        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        self.fetch("notifications", id).await
    }

    pub async fn delete_notification(&self, actor: &Actor, id: i64) -> Result<()> {
        self.owned_notification(actor, id).await?;

        sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Notifications are not project-scoped: only their recipient may touch them.
    async fn owned_notification(&self, actor: &Actor, id: i64) -> Result<Notification> {
        let notification: Notification = self.fetch("notifications", id).await?;
        if notification.user_id != actor.id.0 {
            return Err(DatabaseError::Forbidden(format!(
                "notification {} belongs to another user",
                id
            )));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::World;

    fn ping() -> NewNotification {
        NewNotification {
            kind: "reminder".into(),
            title: "Standup".into(),
            message: "Standup in 5 minutes".into(),
            sent_via_email: true,
        }
    }

    #[tokio::test]
    async fn test_recipient_marks_and_deletes() {
        let world = World::new().await;
        let note = world.service.notify(world.pm.id, ping()).await.unwrap();
        assert!(!note.is_read);
        assert!(note.sent_via_email);

        let read = world
            .service
            .mark_notification_read(&world.pm.actor(), note.id)
            .await
            .unwrap();
        assert!(read.is_read);

        world
            .service
            .delete_notification(&world.pm.actor(), note.id)
            .await
            .unwrap();
        assert!(world
            .service
            .list_notifications(&world.pm.actor())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_other_users_notifications_forbidden() {
        let world = World::new().await;
        let note = world.service.notify(world.pm.id, ping()).await.unwrap();
        let eve = world.outsider("Eve").await;

        assert!(matches!(
            world.service.mark_notification_read(&eve.actor(), note.id).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world.service.delete_notification(&eve.actor(), note.id).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world.service.mark_notification_read(&eve.actor(), 999).await,
            Err(DatabaseError::EntityNotFound(_))
        ));
    }
}
