//! Actor-facing operations over the task graph.
//!
//! Every mutation follows the same discipline: open a transaction,
//! re-read the relevant rows, run the permission gate and graph/status
//! guards against that fresh state, then write and commit. Returning an
//! error from the closure rolls the transaction back, so a rejected
//! operation leaves no partial state behind.

mod tasks;
mod users;

use crate::db::Database;

/// Service handle combining the store with the guard and permission logic.
#[derive(Clone)]
pub struct TaskService {
    db: Database,
}

impl TaskService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the underlying database (read-side helpers, tests).
    pub fn database(&self) -> &Database {
        &self.db
    }
}
