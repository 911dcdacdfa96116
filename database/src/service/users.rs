use super::{require_text, Service};
use crate::models::User;
use crate::{DatabaseError, Result};
use authz::Actor;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Global role allowed to administer other accounts. It is also the label
/// that gates project creation.
const ADMIN_ROLE: &str = "project_manager";

/// Matches users who are not the only project manager of some project.
const NOT_SOLE_MANAGER: &str = "NOT EXISTS (SELECT 1 FROM project_members pm \
     WHERE pm.user_id = users.id AND pm.role_in_project = 'project_manager' \
     AND (SELECT COUNT(*) FROM project_members other \
          WHERE other.project_id = pm.project_id \
          AND other.role_in_project = 'project_manager') <= 1)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    /// Global role label
    pub role: String,
}

impl From<User> for UserUpdate {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

fn validate_account(name: &str, email: &str) -> Result<()> {
    require_text("name", name)?;
    require_text("email", email)?;
    if !email.contains('@') {
        return Err(DatabaseError::Validation(format!("invalid email: {}", email)));
    }
    Ok(())
}

fn email_conflict(err: sqlx::Error, email: &str) -> DatabaseError {
    let err = DatabaseError::from(err);
    if err.is_unique_violation() {
        DatabaseError::Conflict(format!("email already registered: {}", email))
    } else {
        err
    }
}

/// Accounts are global, not project-scoped: a user manages their own
/// account and an administrator manages everyone's.
fn ensure_account_access(actor: &Actor, user_id: i64) -> Result<()> {
    if actor.id.0 == user_id || actor.global_role == ADMIN_ROLE {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden(format!(
            "user {} may not manage user {}",
            actor.id, user_id
        )))
    }
}

impl Service {
    /// Register a user. Not guarded: accounts are provisioned by the
    /// authentication layer before any policy applies.
    pub async fn create_user(&self, name: &str, email: &str, role: &str) -> Result<User> {
        validate_account(name, email)?;

        let id = sqlx::query("INSERT INTO users (name, email, role) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(role)
            .execute(self.db.pool())
            .await
            .map_err(|e| email_conflict(e, email))?
            .last_insert_rowid();

        info!("Created user {} with global role {}", id, role);
        self.get_user(id).await
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.fetch("users", id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| DatabaseError::EntityNotFound(format!("user {}", email)))
    }

    /// Every account, by name.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY name, id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(users)
    }

    /// Update an account. Only an administrator may change a global role,
    /// since that label decides who can create projects.
    pub async fn update_user(&self, actor: &Actor, id: i64, input: UserUpdate) -> Result<User> {
        ensure_account_access(actor, id)?;
        let current = self.get_user(id).await?;
        validate_account(&input.name, &input.email)?;
        require_text("role", &input.role)?;

        if input.role != current.role && actor.global_role != ADMIN_ROLE {
            return Err(DatabaseError::Forbidden(format!(
                "user {} may not change global roles",
                actor.id
            )));
        }

        sqlx::query("UPDATE users SET name = ?, email = ?, role = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.role)
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(|e| email_conflict(e, &input.email))?;

        if input.role != current.role {
            info!(
                "User {} changed global role of user {} from {} to {}",
                actor.id, id, current.role, input.role
            );
        }
        self.get_user(id).await
    }

    /// Delete an account together with its memberships, time logs and
    /// notifications. Projects and tasks the user created go with it.
    ///
    /// The only project manager of a project cannot be deleted.
    pub async fn delete_user(&self, actor: &Actor, id: i64) -> Result<()> {
        ensure_account_access(actor, id)?;
        self.get_user(id).await?;

        let sql = format!("DELETE FROM users WHERE id = ? AND {}", NOT_SOLE_MANAGER);
        let deleted = sqlx::query(&sql)
            .bind(id)
            .execute(self.db.pool())
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(DatabaseError::Validation(format!(
                "user {} is the only project_manager of a project",
                id
            )));
        }

        info!("User {} deleted user {}", actor.id, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::World;
    use crate::service::{NewProject, NewTask, NewTimeLog};
    use crate::test_support::test_db;
    use authz::ProjectRole;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let (_dir, db) = test_db().await;
        let service = Service::new(db);

        let user = service
            .create_user("Bob", "bob@example.com", "developer")
            .await
            .unwrap();
        assert_eq!(user.role, "developer");
        assert_eq!(user.actor().global_role, "developer");

        let found = service.find_user_by_email("bob@example.com").await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (_dir, db) = test_db().await;
        let service = Service::new(db);

        service
            .create_user("Bob", "bob@example.com", "developer")
            .await
            .unwrap();
        let err = service
            .create_user("Robert", "bob@example.com", "developer")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_self_service_and_admin_updates() {
        let world = World::new().await;
        let carol = world.outsider("Carol").await;
        let eve = world.outsider("Eve").await;

        let renamed = world
            .service
            .update_user(
                &carol.actor(),
                carol.id,
                UserUpdate {
                    name: "Caroline".into(),
                    ..carol.clone().into()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Caroline");

        // Nobody edits someone else's account without the admin role
        assert!(matches!(
            world
                .service
                .update_user(&eve.actor(), carol.id, carol.clone().into())
                .await,
            Err(DatabaseError::Forbidden(_))
        ));

        // Self-promotion would open project creation
        let promote = UserUpdate {
            role: "project_manager".into(),
            ..renamed.clone().into()
        };
        assert!(matches!(
            world.service.update_user(&carol.actor(), carol.id, promote.clone()).await,
            Err(DatabaseError::Forbidden(_))
        ));

        let promoted = world
            .service
            .update_user(&world.pm.actor(), carol.id, promote)
            .await
            .unwrap();
        world
            .service
            .create_project(&promoted.actor(), NewProject::named("Gemini"))
            .await
            .unwrap();

        assert!(matches!(
            world
                .service
                .update_user(
                    &world.pm.actor(),
                    eve.id,
                    UserUpdate {
                        email: "alice@example.com".into(),
                        ..eve.clone().into()
                    },
                )
                .await,
            Err(DatabaseError::Conflict(_))
        ));

        let names: Vec<_> = world
            .service
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["Alice", "Caroline", "Eve"]);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let world = World::new().await;
        let carol = world.member("Carol", ProjectRole::Backend).await;
        let task = world
            .service
            .create_task(
                &world.pm.actor(),
                world.project.id,
                NewTask {
                    assigned_to: Some(carol.id),
                    ..NewTask::titled("Schema")
                },
            )
            .await
            .unwrap();
        world
            .service
            .log_time(
                &carol.actor(),
                task.id,
                NewTimeLog {
                    date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
                    hours: 1.0,
                    note: None,
                },
            )
            .await
            .unwrap();

        world.service.delete_user(&carol.actor(), carol.id).await.unwrap();

        let pool = world.service.db().pool();
        for table in ["project_members", "time_logs", "notifications"] {
            let (count,): (i64,) =
                sqlx::query_as(&format!("SELECT COUNT(*) FROM {} WHERE user_id = ?", table))
                    .bind(carol.id)
                    .fetch_one(pool)
                    .await
                    .unwrap();
            assert_eq!(count, 0, "{} rows left behind", table);
        }

        // The task survives, unassigned
        let task = world.service.get_task(&world.pm.actor(), task.id).await.unwrap();
        assert_eq!(task.assigned_to, None);
        assert!(matches!(
            world.service.get_user(carol.id).await,
            Err(DatabaseError::EntityNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sole_project_manager_cannot_be_deleted() {
        let world = World::new().await;
        let eve = world.outsider("Eve").await;

        assert!(matches!(
            world.service.delete_user(&eve.actor(), world.pm.id).await,
            Err(DatabaseError::Forbidden(_))
        ));
        assert!(matches!(
            world.service.delete_user(&world.pm.actor(), world.pm.id).await,
            Err(DatabaseError::Validation(_))
        ));

        // With a second manager the creator may leave, taking the project along
        world.member("Erin", ProjectRole::ProjectManager).await;
        world
            .service
            .delete_user(&world.pm.actor(), world.pm.id)
            .await
            .unwrap();
        let (projects,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(world.service.db().pool())
            .await
            .unwrap();
        assert_eq!(projects, 0);
    }

    #[tokio::test]
    async fn test_user_validation() {
        let (_dir, db) = test_db().await;
        let service = Service::new(db);

        assert!(matches!(
            service.create_user("", "x@example.com", "developer").await,
            Err(DatabaseError::Validation(_))
        ));
        assert!(matches!(
            service.create_user("X", "not-an-email", "developer").await,
            Err(DatabaseError::Validation(_))
        ));
        assert!(matches!(
            service.get_user(42).await,
            Err(DatabaseError::EntityNotFound(_))
        ));
    }
}
