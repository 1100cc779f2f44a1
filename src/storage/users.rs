//! User rows: registration, lookup and deletion.

use rusqlite::{params, Connection, OptionalExtension, Result};

use super::models::User;

const USER_COLUMNS: &str = "id, telegram_id, username, is_admin";

/// Outcome of deleting a user by username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Finds a user by Telegram id, falling back to the username.
///
/// A username-only row (added before the person ever wrote to the bot) is
/// linked to `telegram_id` the first time it is found this way.
pub fn find_user(conn: &Connection, telegram_id: Option<i64>, username: Option<&str>) -> Result<Option<User>> {
    if let Some(tid) = telegram_id {
        let by_id = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
                [tid],
                User::from_row,
            )
            .optional()?;
        if by_id.is_some() {
            return Ok(by_id);
        }
    }

    let Some(username) = username.filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    let Some(user) = get_user_by_username(conn, username)? else {
        return Ok(None);
    };

    match (user.telegram_id, telegram_id) {
        (None, Some(tid)) => {
            conn.execute("UPDATE users SET telegram_id = ?1 WHERE id = ?2", params![tid, user.id])?;
            log::info!("Linked user @{} to telegram id {}", user.username, tid);
            Ok(Some(User {
                telegram_id: Some(tid),
                ..user
            }))
        }
        (Some(existing), Some(tid)) if existing != tid => Ok(None),
        _ => Ok(Some(user)),
    }
}

/// Returns the matching user or registers a new one.
pub fn get_or_create_user(conn: &Connection, telegram_id: Option<i64>, username: &str, is_admin: bool) -> Result<User> {
    if let Some(user) = find_user(conn, telegram_id, Some(username))? {
        if is_admin && !user.is_admin {
            set_user_admin(conn, user.id, true)?;
            return Ok(User { is_admin: true, ..user });
        }
        return Ok(user);
    }

    conn.execute(
        "INSERT INTO users (telegram_id, username, is_admin) VALUES (?1, ?2, ?3)",
        params![telegram_id, username, is_admin],
    )?;
    log::info!("Created user @{} (admin: {})", username, is_admin);
    Ok(User {
        id: conn.last_insert_rowid(),
        telegram_id,
        username: username.to_string(),
        is_admin,
    })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        User::from_row,
    )
    .optional()
}

/// Case-insensitive username lookup.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 COLLATE NOCASE ORDER BY id LIMIT 1"),
        [username],
        User::from_row,
    )
    .optional()
}

pub fn set_user_admin(conn: &Connection, id: i64, is_admin: bool) -> Result<()> {
    conn.execute("UPDATE users SET is_admin = ?1 WHERE id = ?2", params![is_admin, id])?;
    Ok(())
}

/// Keeps the stored username in sync with the Telegram profile.
pub fn update_username(conn: &Connection, id: i64, username: &str) -> Result<()> {
    conn.execute("UPDATE users SET username = ?1 WHERE id = ?2", params![username, id])?;
    Ok(())
}

/// Deletes a user; their created tasks and assignments cascade.
pub fn delete_user_by_username(conn: &Connection, username: &str) -> Result<DeleteOutcome> {
    let affected = conn.execute("DELETE FROM users WHERE username = ?1 COLLATE NOCASE", [username])?;
    if affected == 0 {
        Ok(DeleteOutcome::NotFound)
    } else {
        log::info!("Deleted user @{}", username);
        Ok(DeleteOutcome::Deleted)
    }
}

/// Users that can still be assigned to a task.
///
/// Excludes the requester and everyone already assigned.
pub fn suggested_users(conn: &Connection, task_id: i64, requester_telegram_id: i64) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE (telegram_id IS NULL OR telegram_id != ?2)
           AND id NOT IN (SELECT user_id FROM users_tasks WHERE task_id = ?1)
         ORDER BY username COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map(params![task_id, requester_telegram_id], User::from_row)?;
    rows.collect()
}
