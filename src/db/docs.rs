//! Documentation records (one per task, created empty at task creation).

use super::{now_ms, Database};
use crate::types::Documentation;
use anyhow::Result;
use rusqlite::{params, Connection};

/// Static template shown to documentation authors.
pub const TEMPLATE_HINT: &str =
    "List any externally accessible features here.\n\n\nVariables:\n\nFunctions:\n\nExample use cases:\n";

/// Create the empty documentation record for a new task.
pub(crate) fn insert_doc_internal(conn: &Connection, task_id: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO documentation (task_id, content, template_hint, updated_at)
         VALUES (?1, '', ?2, ?3)",
        params![task_id, TEMPLATE_HINT, now_ms()],
    )?;
    Ok(())
}

/// Write documentation content, creating the record if the task predates
/// lazy creation.
pub(crate) fn set_doc_content_internal(
    conn: &Connection,
    task_id: &str,
    content: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO documentation (task_id, content, template_hint, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(task_id) DO UPDATE SET content = ?2, updated_at = ?4",
        params![task_id, content, TEMPLATE_HINT, now_ms()],
    )?;
    Ok(())
}

/// Documentation content for a task, empty string when absent.
pub(crate) fn doc_content_internal(conn: &Connection, task_id: &str) -> Result<String> {
    let result = conn.query_row(
        "SELECT content FROM documentation WHERE task_id = ?1",
        params![task_id],
        |row| row.get(0),
    );

    match result {
        Ok(content) => Ok(content),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Get the full documentation record for a task.
    pub fn get_documentation(&self, task_id: &str) -> Result<Option<Documentation>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT task_id, content, template_hint, updated_at
                 FROM documentation WHERE task_id = ?1",
                params![task_id],
                |row| {
                    Ok(Documentation {
                        task_id: row.get(0)?,
                        content: row.get(1)?,
                        template_hint: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            );

            match result {
                Ok(doc) => Ok(Some(doc)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}
