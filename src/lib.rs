//! Hierarchical task tracker core.
//!
//! Tasks form a directed acyclic graph (a task may have several parents
//! and several children). The crate provides the graph store, cycle
//! guard, derived metrics, the status state machine with its child
//! guards, and the role-based permission gate; persistence is SQLite.
//! Authentication and presentation live outside this crate and interact
//! with it through [`types::Actor`] and the [`service::TaskService`]
//! operations.

pub mod cli;
pub mod db;
pub mod error;
pub mod graph;
pub mod permissions;
pub mod service;
pub mod status;
pub mod types;
