//! User account storage.

use super::{now_ms, Database};
use crate::error::CoreError;
use crate::types::{Role, User, UserInfo};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get("id")?;
    let username: String = row.get("username")?;
    let credential: String = row.get("credential")?;
    let role_raw: String = row.get("role")?;
    let created_at: i64 = row.get("created_at")?;

    let role = Role::parse(&role_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown role: {}", role_raw).into(),
        )
    })?;

    Ok(User {
        id,
        username,
        credential,
        role,
        created_at,
    })
}

/// Look up a user by id using an existing connection.
pub(crate) fn get_user_internal(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?1")?;
    let result = stmt.query_row(params![user_id], parse_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Look up a user by username using an existing connection.
pub(crate) fn get_user_by_username_internal(
    conn: &Connection,
    username: &str,
) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE username = ?1")?;
    let result = stmt.query_row(params![username], parse_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert a user, failing on duplicate usernames.
pub(crate) fn insert_user_internal(
    conn: &Connection,
    username: &str,
    credential: &str,
    role: Role,
) -> Result<User> {
    if get_user_by_username_internal(conn, username)?.is_some() {
        return Err(CoreError::duplicate_username(username).into());
    }

    let user = User {
        id: Uuid::now_v7().to_string(),
        username: username.to_string(),
        credential: credential.to_string(),
        role,
        created_at: now_ms(),
    };

    conn.execute(
        "INSERT INTO users (id, username, credential, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &user.id,
            &user.username,
            &user.credential,
            user.role.as_str(),
            user.created_at,
        ],
    )?;

    Ok(user)
}

/// Map of user id → username, for resolving names in views.
pub(crate) fn username_map_internal(
    conn: &Connection,
) -> Result<std::collections::HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT id, username FROM users")?;
    let map = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(map)
}

/// Rename a user and/or change their role. Renames are checked for
/// collisions first.
pub(crate) fn update_user_internal(
    conn: &Connection,
    user_id: &str,
    username: Option<&str>,
    role: Option<Role>,
) -> Result<()> {
    let user =
        get_user_internal(conn, user_id)?.ok_or_else(|| CoreError::user_not_found(user_id))?;

    if let Some(new_username) = username {
        if new_username != user.username {
            if get_user_by_username_internal(conn, new_username)?.is_some() {
                return Err(CoreError::duplicate_username(new_username).into());
            }
            conn.execute(
                "UPDATE users SET username = ?1 WHERE id = ?2",
                params![new_username, user_id],
            )?;
        }
    }

    if let Some(role) = role {
        conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), user_id],
        )?;
    }

    Ok(())
}

/// Delete a user account. Fails while tasks still reference the user as
/// creator (foreign key).
pub(crate) fn delete_user_internal(conn: &Connection, user_id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if deleted == 0 {
        return Err(CoreError::user_not_found(user_id).into());
    }
    Ok(())
}

impl Database {
    /// Get a user by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// Get a user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_username_internal(conn, username))
    }

    /// True when the users table is empty (fresh database).
    pub fn has_no_users(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count == 0)
        })
    }

    /// List all users with their created/assigned task counts.
    pub fn list_users(&self) -> Result<Vec<UserInfo>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.role,
                        (SELECT COUNT(*) FROM tasks t WHERE t.creator_id = u.id),
                        (SELECT COUNT(*) FROM tasks t WHERE t.assignee_id = u.id)
                 FROM users u
                 ORDER BY u.created_at",
            )?;

            let users = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    let username: String = row.get(1)?;
                    let role_raw: String = row.get(2)?;
                    let created_tasks_count: i64 = row.get(3)?;
                    let assigned_tasks_count: i64 = row.get(4)?;
                    Ok((
                        id,
                        username,
                        role_raw,
                        created_tasks_count,
                        assigned_tasks_count,
                    ))
                })?
                .filter_map(|r| r.ok())
                .filter_map(|(id, username, role_raw, created, assigned)| {
                    Role::parse(&role_raw).map(|role| UserInfo {
                        id,
                        username,
                        role,
                        created_tasks_count: created,
                        assigned_tasks_count: assigned,
                    })
                })
                .collect();

            Ok(users)
        })
    }
}
