//! Status state machine: transition guards and the next-status hint.
//!
//! The guards here are pure functions over already-fetched rows; the
//! service layer runs them inside the transaction that commits the
//! transition, so the child statuses they see cannot change underneath
//! them.
//!
//! Note the deliberate asymmetry: a direct status update may jump several
//! steps along the workflow order as long as the guards pass, while
//! `next_status_highlight` only ever suggests the single next step.

use crate::error::{CoreError, CoreResult, ErrorCode};
use crate::types::{Task, TaskStatus};

/// How many offending child titles to name in guard messages.
const NAMED_CHILD_LIMIT: usize = 3;

/// A child is unfinished when its status is earlier than `Functional`.
pub fn is_unfinished(status: TaskStatus) -> bool {
    status < TaskStatus::Functional
}

/// True when at least one direct child is unfinished.
pub fn has_unfinished_children(children: &[Task]) -> bool {
    children.iter().any(|c| is_unfinished(c.status))
}

/// Comma-separated ids of every offending child, carried in the error's
/// `details` so callers can resolve them without parsing the message.
fn offender_ids(offenders: &[&Task]) -> String {
    offenders
        .iter()
        .map(|t| t.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format up to [`NAMED_CHILD_LIMIT`] child titles plus a remainder count.
fn name_offenders(offenders: &[&Task]) -> String {
    let named: Vec<&str> = offenders
        .iter()
        .take(NAMED_CHILD_LIMIT)
        .map(|t| t.title.as_str())
        .collect();
    let mut out = named.join(", ");
    if offenders.len() > NAMED_CHILD_LIMIT {
        out.push_str(&format!(" and {} more", offenders.len() - NAMED_CHILD_LIMIT));
    }
    out
}

/// Decision from a passed transition check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The caller confirmed the warning; latch `override_warning` on the
    /// task before committing.
    pub latch_override: bool,
}

/// Validate a status change against the child guards.
///
/// Guard order matches the update contract:
/// 1. Unfinished-children warning (soft, overridable; suppressed once the
///    task's override latch is set).
/// 2. Integration guard (hard, never overridable).
///
/// Callers must only invoke this when `new_status != task.status`.
pub fn check_transition(
    task: &Task,
    children: &[Task],
    new_status: TaskStatus,
    override_requested: bool,
) -> CoreResult<TransitionOutcome> {
    if has_unfinished_children(children) && !override_requested && !task.override_warning {
        let offenders: Vec<&Task> = children.iter().filter(|c| is_unfinished(c.status)).collect();
        return Err(CoreError::new(
            ErrorCode::StatusGuardWarning,
            format!(
                "This task has unfinished children: {}. Are you sure you want to proceed?",
                name_offenders(&offenders)
            ),
        )
        .with_details(offender_ids(&offenders)));
    }

    if !children.is_empty() && new_status == TaskStatus::Integrated {
        let offenders: Vec<&Task> = children
            .iter()
            .filter(|c| c.status != TaskStatus::Integrated)
            .collect();
        if !offenders.is_empty() {
            return Err(CoreError::new(
                ErrorCode::StatusGuardBlocked,
                format!(
                    "Cannot integrate while children are not integrated: {}",
                    name_offenders(&offenders)
                ),
            )
            .with_details(offender_ids(&offenders)));
        }
    }

    Ok(TransitionOutcome {
        latch_override: override_requested,
    })
}

/// The next status to highlight in the UI, or `None`.
///
/// A hint is only offered when the task is unassigned or assigned to the
/// requesting actor, and either every child has reached `Functional` or
/// the task is childless with its override latch still unset. This is an
/// affordance, not a gate: it never constrains what an update may set.
pub fn next_status_highlight(
    task: &Task,
    children: &[Task],
    actor_id: &str,
) -> Option<TaskStatus> {
    if let Some(assignee_id) = &task.assignee_id {
        if assignee_id != actor_id {
            return None;
        }
    }

    if !children.is_empty() {
        if !has_unfinished_children(children) {
            return task.status.next();
        }
    } else if !task.override_warning {
        return task.status.next();
    }

    None
}
