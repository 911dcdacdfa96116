//! Guarded operations.
//!
//! Every method authorizes the acting user through the policy engine before
//! touching a row. A denial surfaces as [`DatabaseError::Forbidden`]; a
//! target that does not exist surfaces as [`DatabaseError::EntityNotFound`].

mod attachments;
mod members;
mod notifications;
mod projects;
mod reports;
mod sprints;
mod tasks;
mod time_logs;
mod users;

pub use attachments::NewAttachment;
pub use notifications::NewNotification;
pub use projects::NewProject;
pub use sprints::NewSprint;
pub use tasks::{NewTask, TaskUpdate};
pub use time_logs::NewTimeLog;
pub use users::UserUpdate;

use crate::{Database, DatabaseError, Result};
use authz::{Action, Actor, AuthzEngine, Target};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use std::sync::Arc;
use tracing::warn;

/// Longest accepted value for short text fields.
const MAX_TEXT_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct Service {
    db: Arc<Database>,
    engine: AuthzEngine,
}

impl Service {
    /// A service using the standard rule table, with the database serving
    /// as both membership store and resource graph.
    pub fn new(db: Arc<Database>) -> Self {
        let engine = AuthzEngine::with_standard_rules(db.clone(), db.clone());
        Self { db, engine }
    }

    pub fn with_engine(db: Arc<Database>, engine: AuthzEngine) -> Self {
        Self { db, engine }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn engine(&self) -> &AuthzEngine {
        &self.engine
    }

    /// Fail with `Forbidden` unless `actor` may perform `action` on `target`.
    async fn ensure(&self, actor: &Actor, action: Action, target: Target) -> Result<()> {
        if self.engine.authorize(actor, action, &target).await? {
            Ok(())
        } else {
            warn!("Forbidden: user {} {} {}", actor.id, action, target);
            Err(DatabaseError::Forbidden(format!(
                "user {} may not {} {}",
                actor.id, action, target
            )))
        }
    }

    /// Load one row by primary key.
    async fn fetch<T>(&self, table: &'static str, id: i64) -> Result<T>
    where
        T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE id = ?", table);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| DatabaseError::EntityNotFound(format!("{} {}", table, id)))
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DatabaseError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(DatabaseError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(())
}

fn check_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(DatabaseError::Validation(
            "end_date must be on or after start_date".into(),
        )),
        _ => Ok(()),
    }
}
