//! Permission gate: who may mutate what.
//!
//! Pure predicates over an [`Actor`] and a [`Task`]; every mutation in the
//! service layer passes through here before touching the store.

use crate::types::{Actor, Task, TaskStatus};

/// Title, description, status, documentation, and parent-set edits.
pub fn can_edit(actor: &Actor, task: &Task) -> bool {
    actor.is_admin()
        || actor.id == task.creator_id
        || task.assignee_id.as_deref() == Some(actor.id.as_str())
}

/// Deletion: admins may delete any task, developers only their own.
/// The no-children constraint is enforced separately by the store.
pub fn can_delete(actor: &Actor, task: &Task) -> bool {
    actor.is_admin() || actor.id == task.creator_id
}

/// Unassignment: admin, creator, or the current assignee.
pub fn can_unassign(actor: &Actor, task: &Task) -> bool {
    actor.is_admin()
        || actor.id == task.creator_id
        || task.assignee_id.as_deref() == Some(actor.id.as_str())
}

/// Assignment by id and all user management are admin-only.
pub fn can_administer(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Self-request: any actor, but only for unassigned, not-yet-started tasks.
pub fn can_request(task: &Task) -> bool {
    task.assignee_id.is_none() && task.status == TaskStatus::NotStarted
}
