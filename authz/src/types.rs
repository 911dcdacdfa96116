//! Core authorization types: who acts, what they do, and to which entity.
//!
//! # Ownership
//!
//! Every project-scoped entity belongs, directly or through its task, to
//! exactly one project. The project is the unit of access control:
//!
//! ```text
//! Project ─┬─ ProjectMember
//!          ├─ Sprint
//!          ├─ Task ──── TimeLog
//!          └─ Attachment (optionally tied to a Task)
//! ```
//!
//! A [`Target`] names either an existing entity (resolved to its project by
//! the resource graph), an entity about to be created inside a known
//! project, or a whole collection.

use crate::error::AuthzError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Identifier of a project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated user attempting an action.
///
/// # Security Note
/// An actor must be built from an authenticated session or a trusted
/// user record, never from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,

    /// Global role label from the user record. Only consulted when
    /// creating a project.
    pub global_role: String,
}

impl Actor {
    pub fn new(id: i64, global_role: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            global_role: global_role.into(),
        }
    }
}

/// An action an actor may attempt on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "viewAny")]
    ViewAny,
    #[serde(rename = "view")]
    View,
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "restore")]
    Restore,
    #[serde(rename = "forceDelete")]
    ForceDelete,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::ViewAny,
        Action::View,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Restore,
        Action::ForceDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewAny => "viewAny",
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Restore => "restore",
            Action::ForceDelete => "forceDelete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AuthzError::InvalidAction(s.to_string()))
    }
}

/// The kinds of entity guarded by the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    ProjectMember,
    Sprint,
    Task,
    TimeLog,
    Attachment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Project,
        ResourceKind::ProjectMember,
        ResourceKind::Sprint,
        ResourceKind::Task,
        ResourceKind::TimeLog,
        ResourceKind::Attachment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::ProjectMember => "project_member",
            ResourceKind::Sprint => "sprint",
            ResourceKind::Task => "task",
            ResourceKind::TimeLog => "time_log",
            ResourceKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_").to_lowercase();
        let normalized = match normalized.as_str() {
            "member" => "project_member",
            "timelog" => "time_log",
            other => other,
        };
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AuthzError::InvalidResourceKind(s.to_string()))
    }
}

/// A reference to an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: ResourceKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: ResourceKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn project(id: ProjectId) -> Self {
        Self::new(ResourceKind::Project, id.0)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// What an authorization request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// An entity that already exists.
    Existing(EntityRef),

    /// An entity about to be created. `project` is `None` only for a new
    /// project, which has no owner yet.
    New {
        kind: ResourceKind,
        project: Option<ProjectId>,
    },

    /// The unscoped list of every entity of a kind.
    Collection(ResourceKind),
}

impl Target {
    pub fn existing(kind: ResourceKind, id: i64) -> Self {
        Target::Existing(EntityRef::new(kind, id))
    }

    /// A new entity inside `project`.
    pub fn new_in(kind: ResourceKind, project: ProjectId) -> Self {
        Target::New {
            kind,
            project: Some(project),
        }
    }

    pub fn new_project() -> Self {
        Target::New {
            kind: ResourceKind::Project,
            project: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Target::Existing(entity) => entity.kind,
            Target::New { kind, .. } => *kind,
            Target::Collection(kind) => *kind,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Existing(entity) => entity.fmt(f),
            Target::New {
                kind,
                project: Some(project),
            } => write!(f, "new {} in project#{}", kind, project),
            Target::New {
                kind,
                project: None,
            } => write!(f, "new {}", kind),
            Target::Collection(kind) => write!(f, "all {}", kind),
        }
    }
}
