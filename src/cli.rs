//! CLI command definitions for taskdag.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};

/// Hierarchical task tracker CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to database file (defaults to the platform data directory)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Username to act as (must exist; see `bootstrap` / `add-user`)
    #[arg(long = "as", value_name = "USERNAME", global = true)]
    pub act_as: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed the admin account on a fresh database
    Bootstrap {
        /// Admin username
        #[arg(default_value = "admin")]
        username: String,
        /// Opaque credential material (hashed by the surrounding auth layer)
        credential: String,
    },

    /// List all tasks with derived fields
    List,

    /// Show one task with documentation and status history
    Show { id: String },

    /// Create a task
    Create {
        title: String,
        /// Optional description
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// Parent task id (repeatable); all parents are validated before commit
        #[arg(short, long = "parent")]
        parents: Vec<String>,
    },

    /// Edit a task's title or description
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'm', long)]
        description: Option<String>,
    },

    /// Change a task's status (guards apply; --force confirms the
    /// unfinished-children warning and latches the override flag)
    Status {
        id: String,
        /// One of: not_started, started, functional, documented, integrated
        status: String,
        /// Confirm the unfinished-children warning
        #[arg(long)]
        force: bool,
    },

    /// Write a task's documentation content
    Doc {
        id: String,
        content: String,
    },

    /// Replace a task's parent set
    Reparent {
        id: String,
        /// New parent id (repeatable); an empty list detaches all parents
        #[arg(short, long = "parent")]
        parents: Vec<String>,
    },

    /// Attach a single parent edge
    AttachParent { id: String, parent_id: String },

    /// Attach a single child edge
    AttachChild { id: String, child_id: String },

    /// Detach a single parent edge
    DetachParent { id: String, parent_id: String },

    /// Delete a task (fails while it has children)
    Delete { id: String },

    /// Request (self-assign) an unassigned, not-started task
    Request { id: String },

    /// Clear a task's assignee
    Unassign { id: String },

    /// Assign a task to a user by username (admin only)
    Assign { id: String, username: String },

    /// Search tasks by title/description substring
    Search { query: String },

    /// List users with task counts (admin only)
    Users,

    /// Create a user (admin only)
    AddUser {
        username: String,
        credential: String,
        /// Role: admin or developer
        #[arg(long, default_value = "developer")]
        role: String,
    },

    /// Delete a user (admin only, never yourself)
    DeleteUser { username: String },
}
