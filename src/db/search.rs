//! Substring search over task titles and descriptions.

use super::Database;
use crate::types::{SearchHit, TaskStatus};
use anyhow::Result;
use rusqlite::params;

const DESCRIPTION_PREVIEW_CHARS: usize = 100;
const DOC_PREVIEW_CHARS: usize = 200;

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Escape LIKE wildcards so the query matches literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Database {
    /// Case-insensitive substring search over title and description.
    ///
    /// Hits carry a truncated description and a short documentation
    /// excerpt for display. An empty query matches nothing.
    pub fn search_tasks(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(query));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.title, t.description, t.status,
                        COALESCE(d.content, '')
                 FROM tasks t
                 LEFT JOIN documentation d ON d.task_id = t.id
                 WHERE t.title LIKE ?1 ESCAPE '\\'
                    OR t.description LIKE ?1 ESCAPE '\\'
                 ORDER BY t.created_at",
            )?;

            let hits = stmt
                .query_map(params![&pattern], |row| {
                    let id: String = row.get(0)?;
                    let title: String = row.get(1)?;
                    let description: Option<String> = row.get(2)?;
                    let status_raw: String = row.get(3)?;
                    let doc: String = row.get(4)?;
                    Ok((id, title, description, status_raw, doc))
                })?
                .filter_map(|r| r.ok())
                .filter_map(|(id, title, description, status_raw, doc)| {
                    let status = TaskStatus::parse(&status_raw)?;
                    Some(SearchHit {
                        id,
                        title,
                        description: truncate_chars(
                            description.as_deref().unwrap_or(""),
                            DESCRIPTION_PREVIEW_CHARS,
                        ),
                        doc_preview: truncate_chars(&doc, DOC_PREVIEW_CHARS),
                        status,
                    })
                })
                .collect();

            Ok(hits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
    }
}
