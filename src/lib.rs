//! taskmaster - per-user task management library
//!
//! The core of the taskmaster CLI: user profiles, their tasks, and the
//! queries and statistics computed over them.
//!
//! # Core Concepts
//!
//! - **Users**: named profiles that own tasks; one may be "current"
//! - **Tasks**: text with a status, a priority and a category
//! - **Views**: filter, sort and group results are fresh collections, never
//!   live references into the task store
//! - **Persistence**: a key-value adapter whose failures degrade to
//!   warnings instead of errors
//!
//! # Module Organization
//!
//! - `app`: coordinator tying users, tasks and storage together
//! - `cli`: command-line interface using clap
//! - `config`: configuration loading from `.taskmaster.toml`
//! - `error`: error types and result aliases
//! - `filter`: filtering, sorting and grouping
//! - `lock`: file locking and atomic writes
//! - `manager`: task lifecycle
//! - `output`: human and JSON output for commands
//! - `stats`: aggregate statistics
//! - `storage`: key-value persistence adapter
//! - `task`: task entity and its enums
//! - `user`: user profiles and name validation

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod lock;
pub mod manager;
pub mod output;
pub mod stats;
pub mod storage;
pub mod task;
pub mod user;

pub use error::{Error, Result};
