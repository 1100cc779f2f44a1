use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::migrations::run_migrations;
use super::models::{Group, Topic};
use crate::core::AppResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Tables in drop order (children first).
const TABLES: &[&str] = &[
    "task_attachments",
    "users_tasks",
    "tasks",
    "topics",
    "groups",
    "users",
    "refinery_schema_history",
];

/// Create a new database connection pool
///
/// Every connection enables foreign keys so cascade deletes work. The schema
/// is migrated on the first connection. An in-memory database is private to
/// a single connection, so `:memory:` pools are capped at one connection.
///
/// # Example
///
/// ```no_run
/// use taskbot::storage::create_pool;
///
/// let pool = create_pool("taskbot.sqlite")?;
/// # Ok::<(), taskbot::core::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let in_memory = database_path == ":memory:";
    let manager = if in_memory {
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(database_path)
    }
    .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));

    let mut builder = Pool::builder().max_size(if in_memory { 1 } else { 10 });
    if in_memory {
        // Recycling the only connection would drop the in-memory database.
        builder = builder.max_lifetime(None).idle_timeout(None);
    }
    let pool = builder.build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Runs `f` on a pooled connection, releasing it before returning.
///
/// Handlers use this so no connection is held across an `.await`.
pub fn with_conn<T>(pool: &DbPool, f: impl FnOnce(&Connection) -> Result<T>) -> AppResult<T> {
    let conn = get_connection(pool)?;
    Ok(f(&conn)?)
}

/// Drops every table and recreates the schema from scratch.
pub fn reset_schema(conn: &mut Connection) -> AppResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    for table in TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    run_migrations(conn)?;
    log::warn!("Database schema was reset");
    Ok(())
}

// ==================== Groups ====================

/// Returns the group registered for a chat, creating it on first use.
///
/// The stored name follows the chat title when it changes.
pub fn get_or_create_group(conn: &Connection, telegram_id: i64, name: Option<&str>) -> Result<Group> {
    if let Some(existing) = get_group_by_telegram_id(conn, telegram_id)? {
        if name.is_some() && existing.name.as_deref() != name {
            conn.execute(
                "UPDATE groups SET name = ?1 WHERE id = ?2",
                params![name, existing.id],
            )?;
            return Ok(Group {
                name: name.map(str::to_string),
                ..existing
            });
        }
        return Ok(existing);
    }

    conn.execute(
        "INSERT INTO groups (telegram_id, name) VALUES (?1, ?2)",
        params![telegram_id, name],
    )?;
    log::info!("Registered group {} ({:?})", telegram_id, name);
    Ok(Group {
        id: conn.last_insert_rowid(),
        telegram_id,
        name: name.map(str::to_string),
    })
}

pub fn get_group(conn: &Connection, id: i64) -> Result<Option<Group>> {
    conn.query_row(
        "SELECT id, telegram_id, name FROM groups WHERE id = ?1",
        [id],
        Group::from_row,
    )
    .optional()
}

pub fn get_group_by_telegram_id(conn: &Connection, telegram_id: i64) -> Result<Option<Group>> {
    conn.query_row(
        "SELECT id, telegram_id, name FROM groups WHERE telegram_id = ?1",
        [telegram_id],
        Group::from_row,
    )
    .optional()
}

pub fn get_all_groups(conn: &Connection) -> Result<Vec<Group>> {
    let mut stmt = conn.prepare("SELECT id, telegram_id, name FROM groups ORDER BY id")?;
    let rows = stmt.query_map([], Group::from_row)?;
    rows.collect()
}

// ==================== Topics ====================

pub fn get_or_create_topic(conn: &Connection, telegram_id: i32, group_id: i64) -> Result<Topic> {
    if let Some(existing) = get_topic(conn, telegram_id, group_id)? {
        return Ok(existing);
    }

    conn.execute(
        "INSERT INTO topics (telegram_id, group_id) VALUES (?1, ?2)",
        params![telegram_id, group_id],
    )?;
    Ok(Topic {
        id: conn.last_insert_rowid(),
        telegram_id,
        group_id,
    })
}

pub fn get_topic(conn: &Connection, telegram_id: i32, group_id: i64) -> Result<Option<Topic>> {
    conn.query_row(
        "SELECT id, telegram_id, group_id FROM topics WHERE telegram_id = ?1 AND group_id = ?2",
        params![telegram_id, group_id],
        Topic::from_row,
    )
    .optional()
}

pub fn get_all_topics(conn: &Connection) -> Result<Vec<Topic>> {
    let mut stmt = conn.prepare("SELECT id, telegram_id, group_id FROM topics ORDER BY id")?;
    let rows = stmt.query_map([], Topic::from_row)?;
    rows.collect()
}

/// Opens a private in-memory database with the full schema applied.
#[cfg(test)]
pub(crate) fn test_connection() -> Connection {
    let mut conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("PRAGMA foreign_keys = ON;").expect("enable foreign keys");
    run_migrations(&mut conn).expect("migrate");
    conn
}
