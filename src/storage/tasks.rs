//! Tasks and their assignments.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::models::{Task, TaskStatus, User};

const TASK_COLUMNS: &str = "id, group_id, topic_id, admin_id, title, description, start_date, end_date, status";

/// Fields required to create a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub admin_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub group_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub end_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(admin_id: i64, title: impl Into<String>) -> Self {
        Self {
            admin_id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn in_group(mut self, group_id: i64, topic_id: Option<i64>) -> Self {
        self.group_id = Some(group_id);
        self.topic_id = topic_id;
        self
    }
}

/// Partial update of a task. Unset or blank fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TaskEdit {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn start_date(date: NaiveDate) -> Self {
        Self {
            start_date: Some(date),
            ..Default::default()
        }
    }

    pub fn end_date(date: NaiveDate) -> Self {
        Self {
            end_date: Some(date),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated(Task),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotAssigned,
}

/// Which tasks a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFilter {
    All,
    Group(i64),
    /// Tasks created outside any group chat.
    Ungrouped,
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn create_task(conn: &Connection, task: &NewTask) -> Result<Task> {
    conn.execute(
        "INSERT INTO tasks (group_id, topic_id, admin_id, title, description, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            task.group_id,
            task.topic_id,
            task.admin_id,
            task.title.trim(),
            non_blank(&task.description),
            task.end_date.map(midnight),
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("Created task {} '{}' (admin {})", id, task.title.trim(), task.admin_id);
    get_task(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_task(conn: &Connection, id: i64) -> Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        [id],
        Task::from_row,
    )
    .optional()
}

/// Tasks created by an admin.
pub fn get_tasks_by_admin(conn: &Connection, admin_id: i64) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE admin_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([admin_id], Task::from_row)?;
    rows.collect()
}

pub fn get_all_tasks(conn: &Connection, filter: GroupFilter) -> Result<Vec<Task>> {
    let clause = match filter {
        GroupFilter::All => "",
        GroupFilter::Group(_) => "WHERE group_id = ?1",
        GroupFilter::Ungrouped => "WHERE group_id IS NULL",
    };
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks {clause} ORDER BY id"))?;
    let tasks: Result<Vec<Task>> = match filter {
        GroupFilter::Group(id) => stmt.query_map([id], Task::from_row)?.collect(),
        _ => stmt.query_map([], Task::from_row)?.collect(),
    };
    tasks
}

/// Tasks a user is assigned to.
pub fn get_tasks_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.group_id, t.topic_id, t.admin_id, t.title, t.description,
                t.start_date, t.end_date, t.status
         FROM tasks t
         JOIN users_tasks ut ON ut.task_id = t.id
         WHERE ut.user_id = ?1
         ORDER BY t.id",
    )?;
    let rows = stmt.query_map([user_id], Task::from_row)?;
    rows.collect()
}

/// Applies the non-empty fields of `edit`.
pub fn edit_task(conn: &Connection, id: i64, edit: &TaskEdit) -> Result<EditOutcome> {
    if get_task(conn, id)?.is_none() {
        return Ok(EditOutcome::NotFound);
    }

    if let Some(title) = non_blank(&edit.title) {
        conn.execute("UPDATE tasks SET title = ?1 WHERE id = ?2", params![title, id])?;
    }
    if let Some(description) = non_blank(&edit.description) {
        conn.execute("UPDATE tasks SET description = ?1 WHERE id = ?2", params![description, id])?;
    }
    if let Some(date) = edit.start_date {
        conn.execute("UPDATE tasks SET start_date = ?1 WHERE id = ?2", params![midnight(date), id])?;
    }
    if let Some(date) = edit.end_date {
        conn.execute("UPDATE tasks SET end_date = ?1 WHERE id = ?2", params![midnight(date), id])?;
    }

    match get_task(conn, id)? {
        Some(task) => Ok(EditOutcome::Updated(task)),
        None => Ok(EditOutcome::NotFound),
    }
}

pub fn set_task_status(conn: &Connection, id: i64, status: TaskStatus) -> Result<bool> {
    let affected = conn.execute("UPDATE tasks SET status = ?1 WHERE id = ?2", params![status.as_ref(), id])?;
    Ok(affected > 0)
}

/// Deletes a task with its assignments and attachments. Returns false if it did not exist.
pub fn delete_task(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
    if affected > 0 {
        log::info!("Deleted task {}", id);
    }
    Ok(affected > 0)
}

// ==================== Assignments ====================

/// Assigns a user. Returns false when the assignment already existed.
pub fn assign_user_to_task(conn: &Connection, user_id: i64, task_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO users_tasks (user_id, task_id) VALUES (?1, ?2)",
        params![user_id, task_id],
    )?;
    Ok(affected > 0)
}

pub fn is_user_assigned(conn: &Connection, user_id: i64, task_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users_tasks WHERE user_id = ?1 AND task_id = ?2)",
        params![user_id, task_id],
        |row| row.get(0),
    )
}

pub fn get_task_users(conn: &Connection, task_id: i64) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.telegram_id, u.username, u.is_admin
         FROM users u
         JOIN users_tasks ut ON ut.user_id = u.id
         WHERE ut.task_id = ?1
         ORDER BY u.username COLLATE NOCASE",
    )?;
    let rows = stmt.query_map([task_id], User::from_row)?;
    rows.collect()
}

pub fn remove_user_from_task(conn: &Connection, task_id: i64, user_id: i64) -> Result<RemoveOutcome> {
    let affected = conn.execute(
        "DELETE FROM users_tasks WHERE task_id = ?1 AND user_id = ?2",
        params![task_id, user_id],
    )?;
    Ok(if affected > 0 {
        RemoveOutcome::Removed
    } else {
        RemoveOutcome::NotAssigned
    })
}
