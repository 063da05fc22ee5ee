//! SQLite-backed storage for the task graph.
//!
//! One connection, guarded by a mutex, shared by cloning the handle.
//! Reads go through [`Database::with_conn`]; mutations go through
//! [`Database::with_conn_mut`], which hands out the `&mut Connection`
//! that `rusqlite` needs to start a transaction. Nothing in this module
//! opens a transaction itself; the service layer owns those boundaries.
//!
//! The free functions in the submodules take a `&Connection` and are
//! suffixed `_internal` so the service layer can compose several of
//! them inside one transaction.

pub mod docs;
pub mod edges;
pub mod history;
pub mod search;
pub mod tasks;
pub mod users;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Cloneable handle to the task store. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the store at `path` and bring its schema up to
    /// date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        // WAL so a second process can read while this one writes; the
        // busy timeout covers a writer in another process.
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;
        Self::from_connection(conn)
    }

    /// In-memory store for tests. Foreign keys stay on so edge,
    /// documentation, and history cascades behave like the on-disk
    /// schema.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with shared access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Run `f` with exclusive access, for callers that need a
    /// transaction.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }
}

/// Milliseconds since the UNIX epoch; the one clock behind
/// `created_at`, `updated_at`, and history timestamps.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
