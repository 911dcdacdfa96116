//! Error types for the authorization system.
//!
//! A denial is never an error: `authorize` returns `Ok(false)` for that.
//! The variants here cover the cases where no decision could be reached at
//! all, most importantly a target that does not resolve to a project.

use crate::types::ResourceKind;
use thiserror::Error;

/// Errors that can occur while preparing an authorization decision.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The resource graph could not resolve the target to an owning project.
    ///
    /// Callers must report this as "not found", never as "forbidden".
    #[error("{kind} {id} not found")]
    ResourceNotFound { kind: ResourceKind, id: i64 },

    /// A resource-to-be-created of a project-scoped kind was given no project.
    #[error("{0} must be created inside a project")]
    MissingProject(ResourceKind),

    /// A collaborator (membership store or resource graph) failed.
    #[error("Authorization store error: {0}")]
    Store(String),

    /// A role literal outside the project role enumeration.
    #[error("Invalid project role: {0}")]
    InvalidRole(String),

    /// An action literal that names no known action.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A resource type literal that names no known resource kind.
    #[error("Invalid resource kind: {0}")]
    InvalidResourceKind(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
