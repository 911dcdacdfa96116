//! Project-scoped roles.
//!
//! A user's authority inside a project comes only from the role stored on
//! their membership row. The global role label on the user record is read
//! by exactly one rule (creating a project) and is otherwise ignored.

use crate::error::AuthzError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed enumeration of roles a member can hold in a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    ProjectManager,
    Backend,
    Frontend,
    Fullstack,
    Uiux,
    /// Also accepted as `sales_marketing` on input.
    #[serde(alias = "sales_marketing")]
    Marketing,
}

impl ProjectRole {
    /// Every role, in declaration order.
    pub const ALL: [ProjectRole; 6] = [
        ProjectRole::ProjectManager,
        ProjectRole::Backend,
        ProjectRole::Frontend,
        ProjectRole::Fullstack,
        ProjectRole::Uiux,
        ProjectRole::Marketing,
    ];

    /// The canonical literal stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::ProjectManager => "project_manager",
            ProjectRole::Backend => "backend",
            ProjectRole::Frontend => "frontend",
            ProjectRole::Fullstack => "fullstack",
            ProjectRole::Uiux => "uiux",
            ProjectRole::Marketing => "marketing",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectRole {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_manager" => Ok(ProjectRole::ProjectManager),
            "backend" => Ok(ProjectRole::Backend),
            "frontend" => Ok(ProjectRole::Frontend),
            "fullstack" => Ok(ProjectRole::Fullstack),
            "uiux" => Ok(ProjectRole::Uiux),
            "marketing" | "sales_marketing" => Ok(ProjectRole::Marketing),
            other => Err(AuthzError::InvalidRole(other.to_string())),
        }
    }
}

/// The role text actually found on a membership row.
///
/// Rows written by older code paths may carry text outside the enumeration.
/// Such a row still proves membership but never satisfies a role set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRole {
    Known(ProjectRole),
    Unrecognized(String),
}

impl MemberRole {
    /// The parsed role, if the stored text was recognized.
    pub fn known(&self) -> Option<ProjectRole> {
        match self {
            MemberRole::Known(role) => Some(*role),
            MemberRole::Unrecognized(_) => None,
        }
    }

    pub fn is(&self, role: ProjectRole) -> bool {
        self.known() == Some(role)
    }
}

impl From<ProjectRole> for MemberRole {
    fn from(role: ProjectRole) -> Self {
        MemberRole::Known(role)
    }
}

impl From<&str> for MemberRole {
    fn from(raw: &str) -> Self {
        raw.parse::<ProjectRole>()
            .map(MemberRole::Known)
            .unwrap_or_else(|_| MemberRole::Unrecognized(raw.to_string()))
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Known(role) => role.fmt(f),
            MemberRole::Unrecognized(raw) => f.write_str(raw),
        }
    }
}
