//! Structured error types for service responses.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Not found errors
    TaskNotFound,
    UserNotFound,
    EdgeNotFound,

    // Authorization
    PermissionDenied,

    // Graph integrity
    CycleDetected,
    SelfReference,
    DuplicateEdge,
    HasChildren,

    // Status state machine
    /// Soft guard: unfinished children. Overridable by the caller.
    StatusGuardWarning,
    /// Hard guard: integration with non-integrated children. Not overridable.
    StatusGuardBlocked,

    // Validation / users
    MissingRequiredField,
    DuplicateUsername,
    InvalidRole,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured, recoverable error reported to callers.
///
/// Every variant except `DatabaseError`/`InternalError` is an expected
/// condition the caller can act on; `StatusGuardWarning` additionally
/// invites a confirm-and-retry with the override flag set.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct CoreError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// True for the soft unfinished-children guard, which callers may
    /// surface as a confirm/override affordance rather than a failure.
    pub fn is_warning(&self) -> bool {
        self.code == ErrorCode::StatusGuardWarning
    }

    // Convenience constructors

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn user_not_found(user_id: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User not found: {}", user_id),
        )
    }

    pub fn edge_not_found(parent_id: &str, child_id: &str) -> Self {
        Self::new(
            ErrorCode::EdgeNotFound,
            format!("No edge from {} to {}", parent_id, child_id),
        )
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn cycle_detected(child_id: &str, parent_id: &str) -> Self {
        Self::new(
            ErrorCode::CycleDetected,
            format!(
                "Attaching {} as a parent of {} would create a cycle",
                parent_id, child_id
            ),
        )
    }

    pub fn self_reference(task_id: &str) -> Self {
        Self::new(
            ErrorCode::SelfReference,
            format!("Task {} cannot be its own parent", task_id),
        )
    }

    pub fn duplicate_edge(parent_id: &str, child_id: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateEdge,
            format!("{} is already a parent of {}", parent_id, child_id),
        )
    }

    pub fn has_children(task_id: &str, count: usize) -> Self {
        Self::new(
            ErrorCode::HasChildren,
            format!(
                "Cannot delete task {}: it still has {} child task(s)",
                task_id, count
            ),
        )
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
    }

    pub fn duplicate_username(username: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateUsername,
            format!("Username already exists: {}", username),
        )
    }

    pub fn invalid_role(role: &str) -> Self {
        Self::new(
            ErrorCode::InvalidRole,
            format!("Invalid role '{}'; expected 'admin' or 'developer'", role),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to CoreError first
        match err.downcast::<CoreError>() {
            Ok(core_err) => core_err,
            Err(err) => CoreError::internal(err),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::database(err)
    }
}

/// Result type for service operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_is_distinguishable_from_hard_errors() {
        let warn = CoreError::new(ErrorCode::StatusGuardWarning, "unfinished children");
        let hard = CoreError::new(ErrorCode::StatusGuardBlocked, "children not integrated");
        assert!(warn.is_warning());
        assert!(!hard.is_warning());
    }

    #[test]
    fn anyhow_round_trip_preserves_code() {
        let err: anyhow::Error = CoreError::task_not_found("t1").into();
        let back: CoreError = err.into();
        assert_eq!(back.code, ErrorCode::TaskNotFound);
    }
}
