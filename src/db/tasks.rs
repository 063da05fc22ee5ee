//! Task CRUD primitives.
//!
//! These are pure graph-store mutations: permission checks, cycle guarding,
//! and status guards live in the service layer, which composes the
//! `_internal` functions inside a single transaction.

use super::{now_ms, Database};
use crate::error::CoreError;
use crate::types::{Task, TaskStatus};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get("id")?;
    let title: String = row.get("title")?;
    let description: Option<String> = row.get("description")?;
    let status_raw: String = row.get("status")?;
    let override_warning: bool = row.get("override_warning")?;
    let creator_id: String = row.get("creator_id")?;
    let assignee_id: Option<String> = row.get("assignee_id")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    let status = TaskStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown status: {}", status_raw).into(),
        )
    })?;

    Ok(Task {
        id,
        title,
        description,
        status,
        override_warning,
        creator_id,
        assignee_id,
        created_at,
        updated_at,
    })
}

/// Get a task using an existing connection.
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;
    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get a task, failing with `TASK_NOT_FOUND` when absent.
pub(crate) fn require_task_internal(conn: &Connection, task_id: &str) -> Result<Task> {
    get_task_internal(conn, task_id)?.ok_or_else(|| CoreError::task_not_found(task_id).into())
}

/// Insert a new task in `not_started` status.
pub(crate) fn insert_task_internal(
    conn: &Connection,
    title: &str,
    description: Option<&str>,
    creator_id: &str,
) -> Result<Task> {
    let now = now_ms();
    let task = Task {
        id: Uuid::now_v7().to_string(),
        title: title.to_string(),
        description: description.map(str::to_string),
        status: TaskStatus::NotStarted,
        override_warning: false,
        creator_id: creator_id.to_string(),
        assignee_id: None,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO tasks (
            id, title, description, status, override_warning,
            creator_id, assignee_id, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            &task.id,
            &task.title,
            &task.description,
            task.status.as_str(),
            task.override_warning,
            &task.creator_id,
            &task.assignee_id,
            task.created_at,
            task.updated_at,
        ],
    )?;

    Ok(task)
}

/// Update title and/or description, bumping `updated_at`.
pub(crate) fn update_fields_internal(
    conn: &Connection,
    task_id: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    if let Some(title) = title {
        conn.execute(
            "UPDATE tasks SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now_ms(), task_id],
        )?;
    }
    if let Some(description) = description {
        conn.execute(
            "UPDATE tasks SET description = ?1, updated_at = ?2 WHERE id = ?3",
            params![description, now_ms(), task_id],
        )?;
    }
    Ok(())
}

/// Commit a new status value. Guard checks and history recording happen
/// before this in the service layer.
pub(crate) fn set_status_internal(
    conn: &Connection,
    task_id: &str,
    status: TaskStatus,
) -> Result<()> {
    conn.execute(
        "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_ms(), task_id],
    )?;
    Ok(())
}

/// Latch the override flag. It only ever goes from false to true.
pub(crate) fn latch_override_internal(conn: &Connection, task_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE tasks SET override_warning = 1, updated_at = ?1 WHERE id = ?2",
        params![now_ms(), task_id],
    )?;
    Ok(())
}

/// Set or clear the assignee.
pub(crate) fn set_assignee_internal(
    conn: &Connection,
    task_id: &str,
    assignee_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE tasks SET assignee_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![assignee_id, now_ms(), task_id],
    )?;
    Ok(())
}

/// Delete a task. Fails with `HAS_CHILDREN` when child edges exist; the
/// schema cascades documentation, history, and remaining parent edges.
pub(crate) fn delete_task_internal(conn: &Connection, task_id: &str) -> Result<()> {
    let child_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_edges WHERE parent_id = ?1",
        params![task_id],
        |row| row.get(0),
    )?;
    if child_count > 0 {
        return Err(CoreError::has_children(task_id, child_count as usize).into());
    }

    let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
    if deleted == 0 {
        return Err(CoreError::task_not_found(task_id).into());
    }
    Ok(())
}

/// List all tasks using an existing connection, oldest first.
pub(crate) fn list_tasks_internal(conn: &Connection) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY created_at")?;
    let tasks = stmt
        .query_map([], parse_task_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(tasks)
}

impl Database {
    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List all tasks, oldest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(list_tasks_internal)
    }
}
