//! Task, edge, status, and assignment operations.

use super::TaskService;
use crate::db::docs::{doc_content_internal, insert_doc_internal, set_doc_content_internal};
use crate::db::edges::{
    add_edge_internal, all_edges_internal, children_internal, parent_ids_internal,
    remove_edge_internal, would_create_cycle_internal,
};
use crate::db::history::{append_history_internal, history_views_internal};
use crate::db::tasks::{
    delete_task_internal, insert_task_internal, latch_override_internal, list_tasks_internal,
    require_task_internal, set_assignee_internal, set_status_internal, update_fields_internal,
};
use crate::db::users::{get_user_internal, username_map_internal};
use crate::error::{CoreError, CoreResult};
use crate::graph::GraphSnapshot;
use crate::permissions;
use crate::status;
use crate::types::{Actor, NewTask, SearchHit, Task, TaskDetail, TaskPatch, TaskStatus, TaskView};
use std::collections::{HashMap, HashSet};
use tracing::info;

impl TaskService {
    /// List every task with derived fields (parents, children, progress,
    /// edit permission, next-status hint) filled in for the given actor.
    pub fn list_tasks(&self, actor: &Actor) -> CoreResult<Vec<TaskView>> {
        self.db
            .with_conn(|conn| {
                let tasks = list_tasks_internal(conn)?;
                let edges = all_edges_internal(conn)?;
                let usernames = username_map_internal(conn)?;

                let snapshot = GraphSnapshot::new(
                    tasks.iter().map(|t| (t.id.clone(), t.status)),
                    edges,
                );
                let by_id: HashMap<&str, &Task> =
                    tasks.iter().map(|t| (t.id.as_str(), t)).collect();

                let views = tasks
                    .iter()
                    .map(|task| {
                        let children: Vec<Task> = snapshot
                            .child_ids(&task.id)
                            .iter()
                            .filter_map(|c| by_id.get(c.as_str()).map(|t| (*t).clone()))
                            .collect();
                        build_view(task, &snapshot, &children, &usernames, actor)
                    })
                    .collect();

                Ok(views)
            })
            .map_err(CoreError::from)
    }

    /// Fetch one task with documentation and full status history.
    pub fn get_task(&self, actor: &Actor, task_id: &str) -> CoreResult<TaskDetail> {
        self.db
            .with_conn(|conn| {
                let task = require_task_internal(conn, task_id)?;
                let children = children_internal(conn, task_id)?;
                let parent_ids = parent_ids_internal(conn, task_id)?;
                let usernames = username_map_internal(conn)?;

                // A local snapshot of the task and its direct neighborhood is
                // enough here: progress only counts direct children, and the
                // view's id lists come from this task's own edges. Parent
                // statuses are placeholders, never read.
                let mut statuses: Vec<(String, TaskStatus)> = children
                    .iter()
                    .map(|c| (c.id.clone(), c.status))
                    .collect();
                statuses.push((task.id.clone(), task.status));
                for p in &parent_ids {
                    statuses.push((p.clone(), TaskStatus::NotStarted));
                }
                let edges: Vec<(String, String)> = children
                    .iter()
                    .map(|c| (task.id.clone(), c.id.clone()))
                    .chain(parent_ids.iter().map(|p| (p.clone(), task.id.clone())))
                    .collect();
                let snapshot = GraphSnapshot::new(statuses, edges);

                let view = build_view(&task, &snapshot, &children, &usernames, actor);
                let documentation = doc_content_internal(conn, task_id)?;
                let history = history_views_internal(conn, task_id)?;

                Ok(TaskDetail {
                    view,
                    documentation,
                    history,
                })
            })
            .map_err(CoreError::from)
    }

    /// Create a task, validating every proposed parent before any edge is
    /// written. An empty documentation record is created alongside.
    pub fn create_task(&self, actor: &Actor, new: NewTask) -> CoreResult<Task> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(CoreError::missing_field("title"));
        }

        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;

                let mut seen = HashSet::new();
                let parent_ids: Vec<&str> = new
                    .parent_ids
                    .iter()
                    .map(String::as_str)
                    .filter(|p| seen.insert(*p))
                    .collect();

                for pid in &parent_ids {
                    require_task_internal(&tx, pid)?;
                }

                let task =
                    insert_task_internal(&tx, title, new.description.as_deref(), &actor.id)?;

                // A fresh task has no descendants, so no parent can close a
                // cycle; the guard still runs on the whole batch before any
                // edge is written, same as the update path.
                for pid in &parent_ids {
                    if would_create_cycle_internal(&tx, &task.id, pid)? {
                        return Err(CoreError::cycle_detected(&task.id, pid).into());
                    }
                }
                for pid in &parent_ids {
                    add_edge_internal(&tx, pid, &task.id)?;
                }

                insert_doc_internal(&tx, &task.id)?;
                tx.commit()?;

                info!(task_id = %task.id, title = %task.title, "created task");
                Ok(task)
            })
            .map_err(CoreError::from)
    }

    /// Apply a partial update: title, description, parent set replacement,
    /// status (guarded), documentation. The whole patch is one transaction;
    /// any rejection rolls everything back.
    pub fn update_task(&self, actor: &Actor, task_id: &str, patch: TaskPatch) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if !permissions::can_edit(actor, &task) {
                    return Err(
                        CoreError::permission_denied("You cannot edit this task").into()
                    );
                }

                update_fields_internal(
                    &tx,
                    task_id,
                    patch.title.as_deref(),
                    patch.description.as_deref(),
                )?;

                if let Some(new_parents) = &patch.parent_ids {
                    let mut seen = HashSet::new();
                    let new_set: Vec<&str> = new_parents
                        .iter()
                        .map(String::as_str)
                        .filter(|p| seen.insert(*p))
                        .collect();

                    // Validate the whole replacement set before touching any
                    // edge: existence, self-reference, and the cycle guard
                    // for every proposed parent.
                    for pid in &new_set {
                        if *pid == task_id {
                            return Err(CoreError::self_reference(task_id).into());
                        }
                        require_task_internal(&tx, pid)?;
                        if would_create_cycle_internal(&tx, task_id, pid)? {
                            return Err(CoreError::cycle_detected(task_id, pid).into());
                        }
                    }

                    let current: HashSet<String> =
                        parent_ids_internal(&tx, task_id)?.into_iter().collect();
                    let wanted: HashSet<&str> = new_set.iter().copied().collect();

                    for pid in &current {
                        if !wanted.contains(pid.as_str()) {
                            remove_edge_internal(&tx, pid, task_id)?;
                        }
                    }
                    for pid in &new_set {
                        if !current.contains(*pid) {
                            add_edge_internal(&tx, pid, task_id)?;
                        }
                    }
                }

                if let Some(new_status) = patch.status {
                    if new_status != task.status {
                        let children = children_internal(&tx, task_id)?;
                        let outcome = status::check_transition(
                            &task,
                            &children,
                            new_status,
                            patch.override_warning,
                        )?;
                        if outcome.latch_override {
                            latch_override_internal(&tx, task_id)?;
                        }
                        append_history_internal(&tx, task_id, task.status, new_status, &actor.id)?;
                        set_status_internal(&tx, task_id, new_status)?;
                        info!(
                            task_id = %task_id,
                            from = %task.status,
                            to = %new_status,
                            "status changed"
                        );
                    }
                }

                if let Some(doc) = &patch.documentation {
                    set_doc_content_internal(&tx, task_id, doc)?;
                }

                tx.commit()?;
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Delete a task. Blocked while it has children; documentation and
    /// history cascade with it.
    pub fn delete_task(&self, actor: &Actor, task_id: &str) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if !permissions::can_delete(actor, &task) {
                    return Err(
                        CoreError::permission_denied("You cannot delete this task").into()
                    );
                }

                delete_task_internal(&tx, task_id)?;
                tx.commit()?;

                info!(task_id = %task_id, "deleted task");
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Attach `parent_id` as a parent of `task_id`.
    pub fn add_parent(&self, actor: &Actor, task_id: &str, parent_id: &str) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if !permissions::can_edit(actor, &task) {
                    return Err(
                        CoreError::permission_denied("You cannot edit this task").into()
                    );
                }
                if parent_id == task_id {
                    return Err(CoreError::self_reference(task_id).into());
                }
                require_task_internal(&tx, parent_id)?;

                if would_create_cycle_internal(&tx, task_id, parent_id)? {
                    return Err(CoreError::cycle_detected(task_id, parent_id).into());
                }
                add_edge_internal(&tx, parent_id, task_id)?;
                tx.commit()?;

                info!(task_id = %task_id, parent_id = %parent_id, "attached parent");
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Attach `child_id` as a child of `task_id`.
    pub fn add_child(&self, actor: &Actor, task_id: &str, child_id: &str) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if !permissions::can_edit(actor, &task) {
                    return Err(
                        CoreError::permission_denied("You cannot edit this task").into()
                    );
                }
                if child_id == task_id {
                    return Err(CoreError::self_reference(task_id).into());
                }
                require_task_internal(&tx, child_id)?;

                if would_create_cycle_internal(&tx, child_id, task_id)? {
                    return Err(CoreError::cycle_detected(child_id, task_id).into());
                }
                add_edge_internal(&tx, task_id, child_id)?;
                tx.commit()?;

                info!(task_id = %task_id, child_id = %child_id, "attached child");
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Detach `parent_id` from `task_id`'s parent set.
    pub fn remove_parent(&self, actor: &Actor, task_id: &str, parent_id: &str) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if !permissions::can_edit(actor, &task) {
                    return Err(
                        CoreError::permission_denied("You cannot edit this task").into()
                    );
                }
                require_task_internal(&tx, parent_id)?;
                remove_edge_internal(&tx, parent_id, task_id)?;
                tx.commit()?;

                info!(task_id = %task_id, parent_id = %parent_id, "detached parent");
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Clear the assignee. Allowed for admin, creator, or the assignee.
    pub fn unassign_task(&self, actor: &Actor, task_id: &str) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if !permissions::can_unassign(actor, &task) {
                    return Err(
                        CoreError::permission_denied("You cannot unassign this task").into()
                    );
                }
                set_assignee_internal(&tx, task_id, None)?;
                tx.commit()?;
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Self-assign an unassigned, not-yet-started task.
    pub fn request_task(&self, actor: &Actor, task_id: &str) -> CoreResult<()> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let task = require_task_internal(&tx, task_id)?;

                if task.assignee_id.is_some() {
                    return Err(CoreError::permission_denied("Task already assigned").into());
                }
                if !permissions::can_request(&task) {
                    return Err(CoreError::permission_denied(
                        "Only not-started tasks can be requested",
                    )
                    .into());
                }
                set_assignee_internal(&tx, task_id, Some(&actor.id))?;
                tx.commit()?;

                info!(task_id = %task_id, assignee = %actor.id, "task requested");
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Admin-only: assign a task to a user by id, or clear the assignee
    /// when `user_id` is `None`.
    pub fn assign_task(
        &self,
        actor: &Actor,
        task_id: &str,
        user_id: Option<&str>,
    ) -> CoreResult<()> {
        if !permissions::can_administer(actor) {
            return Err(CoreError::permission_denied("Admin access required"));
        }

        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                require_task_internal(&tx, task_id)?;

                if let Some(uid) = user_id {
                    if get_user_internal(&tx, uid)?.is_none() {
                        return Err(CoreError::user_not_found(uid).into());
                    }
                }
                set_assignee_internal(&tx, task_id, user_id)?;
                tx.commit()?;
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Snapshot of the whole DAG for on-demand metric computation
    /// (depth, progress, importance weight). Never persisted.
    pub fn graph_snapshot(&self) -> CoreResult<GraphSnapshot> {
        self.db
            .with_conn(|conn| {
                let tasks = list_tasks_internal(conn)?;
                let edges = all_edges_internal(conn)?;
                Ok(GraphSnapshot::new(
                    tasks.into_iter().map(|t| (t.id, t.status)),
                    edges,
                ))
            })
            .map_err(CoreError::from)
    }

    /// Case-insensitive substring search over title and description.
    pub fn search(&self, _actor: &Actor, query: &str) -> CoreResult<Vec<SearchHit>> {
        self.db.search_tasks(query).map_err(CoreError::from)
    }
}

/// Assemble a [`TaskView`] from a task row and its surrounding graph.
fn build_view(
    task: &Task,
    snapshot: &GraphSnapshot,
    children: &[Task],
    usernames: &HashMap<String, String>,
    actor: &Actor,
) -> TaskView {
    TaskView {
        id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        parent_ids: snapshot.parent_ids(&task.id).to_vec(),
        child_ids: snapshot.child_ids(&task.id).to_vec(),
        status: task.status,
        assignee_id: task.assignee_id.clone(),
        assignee: task
            .assignee_id
            .as_ref()
            .and_then(|id| usernames.get(id).cloned()),
        creator: usernames
            .get(&task.creator_id)
            .cloned()
            .unwrap_or_else(|| task.creator_id.clone()),
        progress: snapshot.progress(&task.id),
        created_at: task.created_at,
        can_edit: permissions::can_edit(actor, task),
        next_status_highlight: status::next_status_highlight(task, children, &actor.id),
        override_warning: task.override_warning,
    }
}
