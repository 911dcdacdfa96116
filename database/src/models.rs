//! Row types for every table, plus the status enumerations they carry.

use authz::{MemberRole, ProjectId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DatabaseError;

/// Declares a TEXT-backed enum with `as_str`, `Display` and `FromStr`.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DatabaseError::Validation(format!(
                        "invalid {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(ProjectStatus {
    Planning => "planning",
    InProgress => "in_progress",
    Completed => "completed",
    OnHold => "on_hold",
});

text_enum!(SprintStatus {
    Planned => "planned",
    InProgress => "in_progress",
    Completed => "completed",
});

text_enum!(TaskStatus {
    Todo => "todo",
    InProgress => "in_progress",
    Review => "review",
    Done => "done",
});

text_enum!(TaskPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

text_enum!(
    /// The discipline a task belongs to. Mirrors the project roles.
    ModuleType {
        Backend => "backend",
        Frontend => "frontend",
        Uiux => "uiux",
        ProjectManager => "project_manager",
        Marketing => "marketing",
        Fullstack => "fullstack",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Global role label. Only decides who may create projects.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn actor(&self) -> authz::Actor {
        authz::Actor::new(self.id, self.role.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub budget: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn project_id(&self) -> ProjectId {
        ProjectId(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role_in_project: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectMember {
    pub fn role(&self) -> MemberRole {
        MemberRole::from(self.role_in_project.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sprint {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SprintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub sprint_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub created_by: i64,
    pub title: String,
    pub description: Option<String>,
    pub module_type: ModuleType,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub progress_percentage: i64,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeLog {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub hours: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeLog {
    pub fn recorded_by(&self) -> UserId {
        UserId(self.user_id)
    }
}

/// File metadata only; the bytes live in external storage.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: i64,
    pub project_id: i64,
    pub task_id: Option<i64>,
    pub uploaded_by: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub sent_via_email: bool,
    pub created_at: DateTime<Utc>,
}

/// A point-in-time snapshot of a project's task completion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: i64,
    pub project_id: i64,
    pub generated_by: i64,
    pub summary: Option<String>,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    /// Percentage of tasks done, to two decimals
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_literals() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), *status);
        }
        assert_eq!(SprintStatus::InProgress.to_string(), "in_progress");
        assert_eq!(ProjectStatus::OnHold.as_str(), "on_hold");
    }

    #[test]
    fn test_invalid_status_is_validation_error() {
        let err = "archived".parse::<SprintStatus>().unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(msg) if msg.contains("archived")));
    }

    #[test]
    fn test_member_row_role() {
        let member = ProjectMember {
            id: 1,
            project_id: 1,
            user_id: 2,
            role_in_project: "sales_marketing".into(),
            created_at: Utc::now(),
        };
        assert!(member.role().is(authz::ProjectRole::Marketing));
    }
}
