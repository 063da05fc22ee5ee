//! Core types for the task hierarchy tracker.

use serde::{Deserialize, Serialize};

/// Status of a task, in strict linear workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    Started,
    Functional,
    Documented,
    Integrated,
}

impl TaskStatus {
    /// All statuses in workflow order.
    pub const ORDER: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::Started,
        TaskStatus::Functional,
        TaskStatus::Documented,
        TaskStatus::Integrated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Started => "started",
            TaskStatus::Functional => "functional",
            TaskStatus::Documented => "documented",
            TaskStatus::Integrated => "integrated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(TaskStatus::NotStarted),
            "started" => Some(TaskStatus::Started),
            "functional" => Some(TaskStatus::Functional),
            "documented" => Some(TaskStatus::Documented),
            "integrated" => Some(TaskStatus::Integrated),
            _ => None,
        }
    }

    /// The next status in the linear order, or `None` at `Integrated`.
    pub fn next(&self) -> Option<TaskStatus> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }
}

/// The authenticated actor performing an operation.
///
/// Authentication itself happens outside the core; the service layer only
/// ever sees an already-resolved id and role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user account.
///
/// `credential` is opaque to the core: it is stored and returned verbatim,
/// and verified by the excluded boundary layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub credential: String,
    pub role: Role,
    pub created_at: i64,
}

/// A user row in the admin listing, with task counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_tasks_count: i64,
    pub assigned_tasks_count: i64,
}

/// A task node in the hierarchy DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Permanent latch: once true, the unfinished-children warning is
    /// suppressed for this task on every later transition.
    pub override_warning: bool,
    pub creator_id: String,
    pub assignee_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Documentation attached to a task (at most one record per task).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documentation {
    pub task_id: String,
    pub content: String,
    pub template_hint: String,
    pub updated_at: i64,
}

/// Immutable audit record of one accepted status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub task_id: String,
    pub old_status: TaskStatus,
    pub new_status: TaskStatus,
    pub user_id: String,
    pub timestamp: i64,
}

/// A history entry with the acting user's name resolved, for detail views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryView {
    pub old_status: TaskStatus,
    pub new_status: TaskStatus,
    pub user: String,
    pub timestamp: i64,
}

/// A task as presented in list views, with derived fields filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub parent_ids: Vec<String>,
    pub child_ids: Vec<String>,
    pub status: TaskStatus,
    pub assignee_id: Option<String>,
    pub assignee: Option<String>,
    pub creator: String,
    pub progress: u8,
    pub created_at: i64,
    pub can_edit: bool,
    pub next_status_highlight: Option<TaskStatus>,
    pub override_warning: bool,
}

/// A single task with documentation and full status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub view: TaskView,
    pub documentation: String,
    pub history: Vec<HistoryView>,
}

/// Fields for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Parents to attach at creation; all are cycle-validated before any
    /// edge is written.
    #[serde(default)]
    pub parent_ids: Vec<String>,
}

/// Partial update to a task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Full replacement parent set, diffed against the current one.
    pub parent_ids: Option<Vec<String>>,
    pub status: Option<TaskStatus>,
    /// Caller confirmation for the unfinished-children warning. Setting it
    /// latches `override_warning` on the task permanently.
    #[serde(default)]
    pub override_warning: bool,
    pub documentation: Option<String>,
}

/// A hit from substring search over title/description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    /// Description truncated to 100 characters.
    pub description: String,
    /// Documentation excerpt truncated to 200 characters.
    pub doc_preview: String,
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_is_linear() {
        assert_eq!(TaskStatus::NotStarted.next(), Some(TaskStatus::Started));
        assert_eq!(TaskStatus::Started.next(), Some(TaskStatus::Functional));
        assert_eq!(TaskStatus::Functional.next(), Some(TaskStatus::Documented));
        assert_eq!(TaskStatus::Documented.next(), Some(TaskStatus::Integrated));
        assert_eq!(TaskStatus::Integrated.next(), None);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in TaskStatus::ORDER {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("finished"), None);
    }

    #[test]
    fn status_ord_matches_workflow_order() {
        assert!(TaskStatus::NotStarted < TaskStatus::Functional);
        assert!(TaskStatus::Started < TaskStatus::Functional);
        assert!(TaskStatus::Documented < TaskStatus::Integrated);
    }
}
