use anyhow::{Context, Result};
use database::init::DATABASE_FILE;
use std::env;
use std::path::{Path, PathBuf};

/// Environment-based path configuration
#[derive(Debug, Clone)]
pub struct EnvPaths {
    pub data_path: PathBuf,
    /// Explicit `DATABASE_PATH`, if set
    database_override: Option<PathBuf>,
}

impl EnvPaths {
    /// Load paths from environment variables with defaults
    pub fn load() -> Result<Self> {
        Self::load_with_base(None)
    }

    /// Load paths from environment variables with an optional base directory
    /// This is primarily for testing purposes
    pub fn load_with_base(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = if let Some(base) = base_dir {
            base
        } else {
            // Pick up a .env file in the working directory, if there is one
            if let Ok(cwd) = env::current_dir() {
                let env_file = cwd.join(".env");
                if env_file.exists() {
                    dotenv::from_path(&env_file).ok();
                }
            }
            env::current_dir().context("Failed to get current directory")?
        };

        let database_override = match env::var("DATABASE_PATH") {
            Ok(path) if !path.is_empty() => Some(Self::resolve(PathBuf::from(path), &base)),
            _ => None,
        };

        Ok(Self {
            data_path: Self::get_path_from_env("DATA_PATH", "./data", &base),
            database_override,
        })
    }

    /// Get a path from environment variable or use default
    fn get_path_from_env(var_name: &str, default: &str, base_dir: &Path) -> PathBuf {
        let path_str = env::var(var_name).unwrap_or_else(|_| default.to_string());
        Self::resolve(PathBuf::from(path_str), base_dir)
    }

    fn resolve(path: PathBuf, base_dir: &Path) -> PathBuf {
        if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        }
    }

    /// Get the database path
    pub fn database_path(&self) -> PathBuf {
        self.database_override
            .clone()
            .unwrap_or_else(|| self.data_path.join(DATABASE_FILE))
    }

    /// Get the logs directory path
    pub fn logs_path(&self) -> PathBuf {
        self.data_path.join("logs")
    }

    /// Get the uploads directory path
    pub fn uploads_path(&self) -> PathBuf {
        self.data_path.join("uploads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests share the process environment
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("DATA_PATH");
        env::remove_var("DATABASE_PATH");
    }

    #[test]
    fn test_env_paths_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        let paths = EnvPaths::load_with_base(Some(base_path.clone())).unwrap();

        assert_eq!(paths.data_path, base_path.join("data"));
        assert_eq!(paths.database_path(), base_path.join("data/sprintboard.db"));
        assert_eq!(paths.logs_path(), base_path.join("data/logs"));
        assert_eq!(paths.uploads_path(), base_path.join("data/uploads"));
    }

    #[test]
    fn test_env_paths_with_relative_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("DATA_PATH", "./custom_data");

        let paths = EnvPaths::load_with_base(Some(PathBuf::from("/srv"))).unwrap();
        assert_eq!(paths.data_path, PathBuf::from("/srv/./custom_data"));
        assert!(paths.database_path().ends_with("custom_data/sprintboard.db"));

        clear_env();
    }

    #[test]
    fn test_database_path_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let temp_dir = TempDir::new().unwrap();
        let db_file = temp_dir.path().join("elsewhere.db");
        env::set_var("DATABASE_PATH", db_file.to_str().unwrap());

        let paths = EnvPaths::load_with_base(Some(temp_dir.path().to_path_buf())).unwrap();

        // The data directory keeps its default; only the database moves
        assert_eq!(paths.data_path, temp_dir.path().join("data"));
        assert_eq!(paths.database_path(), db_file);

        clear_env();
    }
}
