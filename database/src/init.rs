use crate::{Database, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "sprintboard.db";

/// Database initialization configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Whether to create tables on initialization
    pub create_tables: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_data_dir(Path::new("data"))
    }
}

impl DatabaseConfig {
    /// Create a new database configuration with default paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the database file inside `data_dir`
    pub fn from_data_dir(data_dir: &Path) -> Self {
        Self::new_with_path(data_dir.join(DATABASE_FILE))
    }

    /// Create a new database configuration with a specific database path
    pub fn new_with_path(database_path: PathBuf) -> Self {
        Self {
            database_path,
            create_tables: true,
        }
    }

    /// Set a custom database path
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    /// Set whether to create tables on initialization
    pub fn with_create_tables(mut self, create: bool) -> Self {
        self.create_tables = create;
        self
    }
}

/// Initialize the database with the given configuration
pub async fn initialize_database(config: DatabaseConfig) -> Result<Arc<Database>> {
    info!(
        "Initializing database at {}",
        config.database_path.display()
    );

    let db = Database::new(&config.database_path).await?;

    if config.create_tables {
        db.migrate().await?;
    }

    Ok(Arc::new(db))
}
