use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub mod error;
pub mod init;
pub mod models;
pub mod schema;
pub mod service;
mod store;

pub use error::{DatabaseError, Result};
pub use init::{initialize_database, DatabaseConfig};
pub use service::Service;

/// Database connection pool
#[derive(Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if missing) the SQLite database at `database_path`
    pub async fn new(database_path: &Path) -> Result<Self> {
        // Ensure the data directory exists
        if let Some(parent) = database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Connecting to database at: {}", database_path.display());

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        debug!("Database connection established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create every table and index that does not exist yet
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        for (table, ddl) in schema::TABLES {
            sqlx::query(ddl).execute(&self.pool).await?;
            debug!("Ensured table {}", table);
        }

        for ddl in schema::INDEXES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }

        info!("Database migrations completed");
        Ok(())
    }

    /// Check if a table exists
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) as count
            FROM sqlite_master
            WHERE type='table' AND name=?
        "#;

        let result: (i32,) = sqlx::query_as(query)
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// A migrated database in a fresh temporary directory.
    ///
    /// The directory must outlive the database, so both are returned.
    pub async fn test_db() -> (TempDir, Arc<Database>) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        db.migrate().await.unwrap();
        (temp_dir, Arc::new(db))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_db;
    use super::*;
    use authz::{
        AuthzError, EntityRef, MembershipStore, ProjectId, ResourceGraph, ResourceKind, UserId,
    };

    #[tokio::test]
    async fn test_database_connection() {
        let (_dir, db) = test_db().await;
        assert!(db.pool().acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_migrate_creates_tables() {
        let (_dir, db) = test_db().await;

        for (table, _) in schema::TABLES {
            assert!(db.table_exists(table).await.unwrap(), "{} missing", table);
        }
        assert!(!db.table_exists("invoices").await.unwrap());

        // Migrations are idempotent
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_membership_lookup() {
        let (_dir, db) = test_db().await;
        sqlx::query("INSERT INTO users (id, name, email, role) VALUES (1, 'a', 'a@x', 'project_manager'), (2, 'b', 'b@x', 'developer')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO projects (id, name, created_by) VALUES (1, 'p', 1)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO project_members (project_id, user_id, role_in_project) VALUES (1, 1, 'project_manager'), (1, 2, 'sales_marketing')")
            .execute(db.pool())
            .await
            .unwrap();

        let pm = db.membership_role(ProjectId(1), UserId(1)).await.unwrap();
        assert!(pm.unwrap().is(authz::ProjectRole::ProjectManager));

        let marketing = db.membership_role(ProjectId(1), UserId(2)).await.unwrap();
        assert!(marketing.unwrap().is(authz::ProjectRole::Marketing));

        assert!(db
            .membership_role(ProjectId(1), UserId(3))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resource_graph_resolution() {
        let (_dir, db) = test_db().await;
        for sql in [
            "INSERT INTO users (id, name, email, role) VALUES (1, 'a', 'a@x', 'project_manager')",
            "INSERT INTO projects (id, name, created_by) VALUES (4, 'p', 1)",
            "INSERT INTO tasks (id, project_id, created_by, title) VALUES (9, 4, 1, 't')",
            "INSERT INTO time_logs (id, task_id, user_id, date, hours) VALUES (3, 9, 1, '2025-01-02', 1.5)",
        ] {
            sqlx::query(sql).execute(db.pool()).await.unwrap();
        }

        let task = db
            .resolve(&EntityRef::new(ResourceKind::Task, 9))
            .await
            .unwrap();
        assert_eq!(task.project, ProjectId(4));
        assert_eq!(task.recorded_by, None);

        let log = db
            .resolve(&EntityRef::new(ResourceKind::TimeLog, 3))
            .await
            .unwrap();
        assert_eq!(log.project, ProjectId(4));
        assert_eq!(log.recorded_by, Some(UserId(1)));

        assert_eq!(
            db.owning_project(&EntityRef::new(ResourceKind::Project, 4))
                .await
                .unwrap(),
            ProjectId(4)
        );

        let missing = db.resolve(&EntityRef::new(ResourceKind::Attachment, 1)).await;
        assert!(matches!(
            missing,
            Err(AuthzError::ResourceNotFound {
                kind: ResourceKind::Attachment,
                id: 1
            })
        ));
    }
}
