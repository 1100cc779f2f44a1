//! Row types shared by the storage functions and the Telegram layer.

use chrono::NaiveDateTime;
use rusqlite::Row;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// A Telegram group or supergroup the bot was started in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub telegram_id: i64,
    pub name: Option<String>,
}

impl Group {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            telegram_id: row.get("telegram_id")?,
            name: row.get("name")?,
        })
    }

    /// Name shown on buttons; falls back to the chat id for untitled chats.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => self.telegram_id.to_string(),
        }
    }
}

/// A forum topic (message thread) inside a supergroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub telegram_id: i32,
    pub group_id: i64,
}

impl Topic {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            telegram_id: row.get("telegram_id")?,
            group_id: row.get("group_id")?,
        })
    }
}

/// A bot user. Users added by username have no Telegram id until their first `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_id: Option<i64>,
    pub username: String,
    pub is_admin: bool,
}

impl User {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            telegram_id: row.get("telegram_id")?,
            username: row.get("username")?,
            is_admin: row.get("is_admin")?,
        })
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Next status in the pending → in progress → done cycle.
    pub fn next(self) -> Self {
        let all: Vec<TaskStatus> = TaskStatus::iter().collect();
        let pos = all.iter().position(|s| *s == self).unwrap_or(0);
        all[(pos + 1) % all.len()]
    }

    /// Localization key for this status.
    pub fn i18n_key(self) -> &'static str {
        match self {
            TaskStatus::Pending => "status-pending",
            TaskStatus::InProgress => "status-in-progress",
            TaskStatus::Done => "status-done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub group_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub admin_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl Task {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            group_id: row.get("group_id")?,
            topic_id: row.get("topic_id")?,
            admin_id: row.get("admin_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            status: status.parse().unwrap_or_default(),
        })
    }
}

/// How an attachment was received; decides which send method replays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AttachmentKind {
    Document,
    Photo,
    Video,
    Audio,
    Voice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: i64,
    pub task_id: i64,
    pub file_id: String,
    pub kind: AttachmentKind,
}

impl Attachment {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get("kind")?;
        Ok(Self {
            id: row.get("id")?,
            task_id: row.get("task_id")?,
            file_id: row.get("file_id")?,
            kind: kind.parse().unwrap_or(AttachmentKind::Document),
        })
    }
}
