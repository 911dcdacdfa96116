use crate::utils::env_paths::EnvPaths;
use anyhow::{anyhow, Context, Result};
use authz::Actor;
use database::{initialize_database, DatabaseConfig, Service};
use serde::Serialize;
use std::path::Path;

pub mod init;
pub mod notifications;
pub mod policy;
pub mod projects;
pub mod reports;
pub mod users;
pub mod work;

/// An opened database plus the user the command runs as.
pub struct Session {
    pub service: Service,
    pub env_paths: EnvPaths,
    as_user: Option<i64>,
}

impl Session {
    pub async fn open(
        database_path: &Path,
        env_paths: EnvPaths,
        as_user: Option<i64>,
    ) -> Result<Self> {
        if !database_path.exists() {
            return Err(anyhow!(
                "No database at {}; run `sprb init` first",
                database_path.display()
            ));
        }

        let config =
            DatabaseConfig::new_with_path(database_path.to_path_buf()).with_create_tables(false);
        let db = initialize_database(config)
            .await
            .context("Failed to open database")?;

        Ok(Self {
            service: Service::new(db),
            env_paths,
            as_user,
        })
    }

    /// The acting user, loaded fresh from the database.
    pub async fn actor(&self) -> Result<Actor> {
        let id = self
            .as_user
            .ok_or_else(|| anyhow!("This command needs an acting user; pass --as <USER_ID>"))?;
        let user = self
            .service
            .get_user(id)
            .await
            .with_context(|| format!("Unknown acting user {}", id))?;
        Ok(user.actor())
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
