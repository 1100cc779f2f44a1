//! Storage layer: SQLite connection pool, migrations and CRUD over tasks

pub mod attachments;
pub mod db;
pub mod migrations;
pub mod models;
pub mod tasks;
pub mod users;

// Re-export commonly used types
pub use db::{create_pool, get_connection, with_conn, DbConnection, DbPool};
pub use models::{Attachment, AttachmentKind, Group, Task, TaskStatus, Topic, User};
