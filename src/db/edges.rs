//! Parent/child edge operations and cycle detection.

use super::tasks::parse_task_row;
use super::{now_ms, Database};
use crate::error::CoreError;
use crate::types::Task;
use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::{HashSet, VecDeque};

/// Check whether attaching `proposed_parent_id` as a parent of `child_id`
/// would create a cycle.
///
/// Walks existing parent edges upward from the proposed parent with a
/// visited set (the graph may contain diamonds). A cycle exists exactly
/// when the walk reaches `child_id`, or when the two ids are equal.
pub(crate) fn would_create_cycle_internal(
    conn: &Connection,
    child_id: &str,
    proposed_parent_id: &str,
) -> Result<bool> {
    if child_id == proposed_parent_id {
        return Ok(true);
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(proposed_parent_id.to_string());

    while let Some(current) = queue.pop_front() {
        if current == child_id {
            return Ok(true); // Would create a cycle
        }

        if !visited.insert(current.clone()) {
            continue;
        }

        let mut stmt = conn.prepare("SELECT parent_id FROM task_edges WHERE child_id = ?1")?;
        let ancestors: Vec<String> = stmt
            .query_map(params![&current], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for ancestor in ancestors {
            if !visited.contains(&ancestor) {
                queue.push_back(ancestor);
            }
        }
    }

    Ok(false)
}

/// Insert a parent→child edge. Rejects self-references and duplicates;
/// cycle checking is the caller's responsibility.
pub(crate) fn add_edge_internal(conn: &Connection, parent_id: &str, child_id: &str) -> Result<()> {
    if parent_id == child_id {
        return Err(CoreError::self_reference(parent_id).into());
    }

    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_edges WHERE parent_id = ?1 AND child_id = ?2",
        params![parent_id, child_id],
        |row| row.get(0),
    )?;
    if exists > 0 {
        return Err(CoreError::duplicate_edge(parent_id, child_id).into());
    }

    conn.execute(
        "INSERT INTO task_edges (parent_id, child_id) VALUES (?1, ?2)",
        params![parent_id, child_id],
    )?;
    conn.execute(
        "UPDATE tasks SET updated_at = ?1 WHERE id = ?2",
        params![now_ms(), child_id],
    )?;
    Ok(())
}

/// Remove a parent→child edge.
pub(crate) fn remove_edge_internal(
    conn: &Connection,
    parent_id: &str,
    child_id: &str,
) -> Result<()> {
    let removed = conn.execute(
        "DELETE FROM task_edges WHERE parent_id = ?1 AND child_id = ?2",
        params![parent_id, child_id],
    )?;
    if removed == 0 {
        return Err(CoreError::edge_not_found(parent_id, child_id).into());
    }
    conn.execute(
        "UPDATE tasks SET updated_at = ?1 WHERE id = ?2",
        params![now_ms(), child_id],
    )?;
    Ok(())
}

/// Ids of the direct parents of a task.
pub(crate) fn parent_ids_internal(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT parent_id FROM task_edges WHERE child_id = ?1 ORDER BY parent_id",
    )?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(ids)
}

/// Ids of the direct children of a task.
pub(crate) fn child_ids_internal(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT child_id FROM task_edges WHERE parent_id = ?1 ORDER BY child_id")?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(ids)
}

/// Direct children of a task as full rows, oldest first.
pub(crate) fn children_internal(conn: &Connection, task_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT t.* FROM tasks t
         INNER JOIN task_edges e ON t.id = e.child_id
         WHERE e.parent_id = ?1
         ORDER BY t.created_at",
    )?;
    let tasks = stmt
        .query_map(params![task_id], parse_task_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(tasks)
}

/// All edges as (parent_id, child_id) pairs.
pub(crate) fn all_edges_internal(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT parent_id, child_id FROM task_edges")?;
    let edges = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(edges)
}

impl Database {
    /// Check whether a proposed parent attachment would create a cycle.
    pub fn would_create_cycle(&self, child_id: &str, proposed_parent_id: &str) -> Result<bool> {
        self.with_conn(|conn| would_create_cycle_internal(conn, child_id, proposed_parent_id))
    }

    /// Get the ids of a task's direct parents.
    pub fn parents_of(&self, task_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| parent_ids_internal(conn, task_id))
    }

    /// Get the ids of a task's direct children.
    pub fn children_of(&self, task_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| child_ids_internal(conn, task_id))
    }

    /// Get all parent→child edges.
    pub fn all_edges(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(all_edges_internal)
    }
}
