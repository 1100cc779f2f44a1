//! Taskbot - Telegram bot for task management in groups and forum topics
//!
//! Admins create tasks, assign members, edit dates and descriptions, and
//! attach files through inline-keyboard menus. Assigned users browse their
//! own tasks.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors and logging
//! - `storage`: SQLite pool, migrations and CRUD over groups, users and tasks
//! - `conversation`: per-user prompt state and reply validation
//! - `i18n`: Fluent translations
//! - `telegram`: commands, menus and the dispatcher schema

#![allow(clippy::too_many_arguments)]

pub mod cli;
pub mod conversation;
pub mod core;
pub mod i18n;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{schema, HandlerDeps};
