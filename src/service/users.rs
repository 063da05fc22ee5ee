//! User management operations (admin-only) and first-run bootstrap.

use super::TaskService;
use crate::db::users::{delete_user_internal, insert_user_internal, update_user_internal};
use crate::error::{CoreError, CoreResult};
use crate::permissions;
use crate::types::{Actor, Role, User, UserInfo};
use tracing::info;

impl TaskService {
    /// Create a user account. Admin-only; usernames are unique.
    pub fn add_user(
        &self,
        actor: &Actor,
        username: &str,
        credential: &str,
        role: &str,
    ) -> CoreResult<User> {
        if !permissions::can_administer(actor) {
            return Err(CoreError::permission_denied("Admin access required"));
        }
        if username.is_empty() {
            return Err(CoreError::missing_field("username"));
        }
        let role = Role::parse(role).ok_or_else(|| CoreError::invalid_role(role))?;

        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let user = insert_user_internal(&tx, username, credential, role)?;
                tx.commit()?;

                info!(user_id = %user.id, username = %user.username, "created user");
                Ok(user)
            })
            .map_err(CoreError::from)
    }

    /// List all users with created/assigned task counts. Admin-only.
    pub fn list_users(&self, actor: &Actor) -> CoreResult<Vec<UserInfo>> {
        if !permissions::can_administer(actor) {
            return Err(CoreError::permission_denied("Admin access required"));
        }
        self.db.list_users().map_err(CoreError::from)
    }

    /// Rename a user and/or change their role. Admin-only.
    pub fn update_user(
        &self,
        actor: &Actor,
        user_id: &str,
        username: Option<&str>,
        role: Option<&str>,
    ) -> CoreResult<()> {
        if !permissions::can_administer(actor) {
            return Err(CoreError::permission_denied("Admin access required"));
        }
        let role = match role {
            Some(r) => Some(Role::parse(r).ok_or_else(|| CoreError::invalid_role(r))?),
            None => None,
        };

        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                update_user_internal(&tx, user_id, username, role)?;
                tx.commit()?;
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Delete a user account. Admin-only, never self-directed.
    pub fn delete_user(&self, actor: &Actor, user_id: &str) -> CoreResult<()> {
        if !permissions::can_administer(actor) {
            return Err(CoreError::permission_denied("Admin access required"));
        }
        if actor.id == user_id {
            return Err(CoreError::permission_denied(
                "Cannot delete your own account",
            ));
        }

        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                delete_user_internal(&tx, user_id)?;
                tx.commit()?;

                info!(user_id = %user_id, "deleted user");
                Ok(())
            })
            .map_err(CoreError::from)
    }

    /// Seed an admin account on a fresh database. Returns the admin when
    /// one was created, `None` when users already exist.
    pub fn bootstrap_admin(&self, username: &str, credential: &str) -> CoreResult<Option<User>> {
        self.db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let count: i64 =
                    tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                if count > 0 {
                    return Ok(None);
                }
                let user = insert_user_internal(&tx, username, credential, Role::Admin)?;
                tx.commit()?;

                info!(username = %username, "bootstrapped admin user");
                Ok(Some(user))
            })
            .map_err(CoreError::from)
    }
}
