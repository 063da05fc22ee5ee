//! Append-only status transition history.

use super::{now_ms, Database};
use crate::types::{HistoryView, StatusHistoryEntry, TaskStatus};
use anyhow::Result;
use rusqlite::{params, Connection};

/// Append one history entry. Called exactly once per accepted transition,
/// in the same transaction that commits the new status.
pub(crate) fn append_history_internal(
    conn: &Connection,
    task_id: &str,
    old_status: TaskStatus,
    new_status: TaskStatus,
    user_id: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO status_history (task_id, old_status, new_status, user_id, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            task_id,
            old_status.as_str(),
            new_status.as_str(),
            user_id,
            now_ms(),
        ],
    )?;
    Ok(())
}

/// Chronological history for a task, with usernames resolved.
pub(crate) fn history_views_internal(conn: &Connection, task_id: &str) -> Result<Vec<HistoryView>> {
    let mut stmt = conn.prepare(
        "SELECT h.old_status, h.new_status, u.username, h.timestamp
         FROM status_history h
         INNER JOIN users u ON h.user_id = u.id
         WHERE h.task_id = ?1
         ORDER BY h.id",
    )?;

    let entries = stmt
        .query_map(params![task_id], |row| {
            let old_raw: String = row.get(0)?;
            let new_raw: String = row.get(1)?;
            let user: String = row.get(2)?;
            let timestamp: i64 = row.get(3)?;
            Ok((old_raw, new_raw, user, timestamp))
        })?
        .filter_map(|r| r.ok())
        .filter_map(|(old_raw, new_raw, user, timestamp)| {
            let old_status = TaskStatus::parse(&old_raw)?;
            let new_status = TaskStatus::parse(&new_raw)?;
            Some(HistoryView {
                old_status,
                new_status,
                user,
                timestamp,
            })
        })
        .collect();

    Ok(entries)
}

impl Database {
    /// Full chronological history for a task as raw entries.
    pub fn task_history(&self, task_id: &str) -> Result<Vec<StatusHistoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, old_status, new_status, user_id, timestamp
                 FROM status_history WHERE task_id = ?1 ORDER BY id",
            )?;

            let entries = stmt
                .query_map(params![task_id], |row| {
                    let id: i64 = row.get(0)?;
                    let task_id: String = row.get(1)?;
                    let old_raw: String = row.get(2)?;
                    let new_raw: String = row.get(3)?;
                    let user_id: String = row.get(4)?;
                    let timestamp: i64 = row.get(5)?;
                    Ok((id, task_id, old_raw, new_raw, user_id, timestamp))
                })?
                .filter_map(|r| r.ok())
                .filter_map(|(id, task_id, old_raw, new_raw, user_id, timestamp)| {
                    Some(StatusHistoryEntry {
                        id,
                        task_id,
                        old_status: TaskStatus::parse(&old_raw)?,
                        new_status: TaskStatus::parse(&new_raw)?,
                        user_id,
                        timestamp,
                    })
                })
                .collect();

            Ok(entries)
        })
    }
}
