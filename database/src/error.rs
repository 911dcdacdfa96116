use authz::AuthzError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Authorization(AuthzError),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<AuthzError> for DatabaseError {
    fn from(err: AuthzError) -> Self {
        match err {
            // A target that does not exist is a not-found, never a denial
            AuthzError::ResourceNotFound { .. } => DatabaseError::EntityNotFound(err.to_string()),
            other => DatabaseError::Authorization(other),
        }
    }
}

impl DatabaseError {
    /// Whether this is a uniqueness violation reported by SQLite.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Connection(sqlx::Error::Database(db_err)) => {
                db_err.is_unique_violation()
            }
            _ => false,
        }
    }
}
