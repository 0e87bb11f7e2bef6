//! # convsync-core
//!
//! Core library for convsync - searchable markdown history of assistant
//! sessions, kept next to the project they belong to.
//!
//! This library provides:
//! - Active-branch extraction from tree-shaped session logs
//! - Cross-log continuation detection (session chains)
//! - Markdown rendering of sessions, chains and the index
//! - Persisted per-session sync state
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Raw:** Append-only JSONL logs written by the assistant (never modified)
//! - **State:** Per-session cache in `.state/` deciding what needs re-rendering
//! - **Rendered:** `.parts/`, `sessions/` and `index.md` (regenerable)
//!
//! ## Example
//!
//! ```rust,no_run
//! use convsync_core::{ingest, render};
//! use std::path::Path;
//!
//! let branch = ingest::extract_active_branch(Path::new("session.jsonl"))?;
//! print!("{}", render::format_messages(&branch.messages));
//! # Ok::<(), convsync_core::Error>(())
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use sync::{SyncCoordinator, SyncResult};
pub use types::*;

// Public modules
pub mod chain;
pub mod config;
pub mod error;
pub mod format;
pub mod hook;
pub mod ingest;
pub mod logging;
pub mod render;
pub mod state;
pub mod sync;
pub mod types;
pub mod vcs;
pub mod workspace;
