//! Pure keyboard builders.
//!
//! Nothing here talks to Telegram or the database, so layouts are unit tested
//! directly.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use unic_langid::LanguageIdentifier;

use super::callback_data::CallbackData;
use crate::core::config::menu::GRID_COLUMNS;
use crate::i18n;
use crate::storage::{Group, Task, User};
use crate::telegram::cb;

/// Labels of the persistent reply keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    ManageTasks,
    NewTask,
    MyTasks,
}

impl MenuButton {
    const ALL: [MenuButton; 3] = [MenuButton::ManageTasks, MenuButton::NewTask, MenuButton::MyTasks];

    fn key(self) -> &'static str {
        match self {
            MenuButton::ManageTasks => "kb-manage-tasks",
            MenuButton::NewTask => "kb-new-task",
            MenuButton::MyTasks => "kb-my-tasks",
        }
    }

    /// Recognizes a pressed reply-keyboard button in any supported language.
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|button| i18n::matches_any_lang(text, button.key()))
    }

    fn button(self, lang: &LanguageIdentifier) -> KeyboardButton {
        KeyboardButton::new(i18n::t(lang, self.key()))
    }
}

/// Reply keyboard for private chats. Admins get the management buttons.
pub fn main_reply_keyboard(lang: &LanguageIdentifier, is_admin: bool) -> KeyboardMarkup {
    let rows = if is_admin {
        vec![
            vec![MenuButton::ManageTasks.button(lang), MenuButton::NewTask.button(lang)],
            vec![MenuButton::MyTasks.button(lang)],
        ]
    } else {
        vec![vec![MenuButton::MyTasks.button(lang)]]
    };
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Reply keyboard for group chats.
pub fn group_reply_keyboard(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        MenuButton::ManageTasks.button(lang),
        MenuButton::NewTask.button(lang),
    ]])
    .resize_keyboard()
}

/// Lays buttons out in rows of `columns`.
pub fn grid(buttons: Vec<InlineKeyboardButton>, columns: usize) -> Vec<Vec<InlineKeyboardButton>> {
    buttons.chunks(columns.max(1)).map(<[_]>::to_vec).collect()
}

fn back_row(lang: &LanguageIdentifier, key: &str, target: CallbackData) -> Vec<InlineKeyboardButton> {
    vec![cb(i18n::t(lang, key), target)]
}

/// Group picker: groups in a grid, then "Other …", "Created by me" and "Close".
pub fn manage_groups_keyboard(lang: &LanguageIdentifier, groups: &[Group]) -> InlineKeyboardMarkup {
    let buttons = groups
        .iter()
        .map(|g| cb(g.display_name(), CallbackData::ViewGroup(g.id)))
        .collect();
    let mut rows = grid(buttons, GRID_COLUMNS);
    rows.push(vec![cb(i18n::t(lang, "btn-other-group"), CallbackData::ViewUngrouped)]);
    rows.push(vec![cb(i18n::t(lang, "btn-created-by-me"), CallbackData::OwnTasks)]);
    rows.push(back_row(lang, "btn-close", CallbackData::CloseMenu));
    InlineKeyboardMarkup::new(rows)
}

/// Tasks in a grid, each opening `open(task_id)`, with a trailing navigation row.
pub fn task_grid_keyboard(
    lang: &LanguageIdentifier,
    tasks: &[Task],
    open: fn(i64) -> CallbackData,
    back: (&str, CallbackData),
) -> InlineKeyboardMarkup {
    let buttons = tasks.iter().map(|t| cb(t.title.clone(), open(t.id))).collect();
    let mut rows = grid(buttons, GRID_COLUMNS);
    rows.push(back_row(lang, back.0, back.1));
    InlineKeyboardMarkup::new(rows)
}

/// Every action an admin can take on a task.
pub fn admin_task_keyboard(lang: &LanguageIdentifier, task: &Task) -> InlineKeyboardMarkup {
    let id = task.id;
    let t = |key: &str| i18n::t(lang, key);
    let status = i18n::t_with(lang, "btn-status", "status", i18n::t(lang, task.status.i18n_key()));

    InlineKeyboardMarkup::new(vec![
        vec![cb(t("btn-back"), CallbackData::ManageMenu), cb(t("btn-delete-task"), CallbackData::DeleteTask(id))],
        vec![cb(t("btn-add-user"), CallbackData::AddUser(id)), cb(t("btn-remove-user"), CallbackData::RemoveList(id))],
        vec![cb(t("btn-users"), CallbackData::TaskUsers(id)), cb(status, CallbackData::CycleStatus(id))],
        vec![cb(t("btn-edit-start"), CallbackData::EditStart(id)), cb(t("btn-edit-end"), CallbackData::EditEnd(id))],
        vec![cb(t("btn-edit-desc"), CallbackData::EditDescription(id)), cb(t("btn-edit-name"), CallbackData::EditName(id))],
        vec![
            cb(t("btn-add-attachment"), CallbackData::AddAttachment(id)),
            cb(t("btn-get-attachments"), CallbackData::GetAttachments(id)),
        ],
    ])
}

/// Read-only card actions for assignees.
pub fn assignee_task_keyboard(lang: &LanguageIdentifier, task_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        cb(i18n::t(lang, "btn-back"), CallbackData::MyTasks),
        cb(i18n::t(lang, "btn-get-attachments"), CallbackData::GetAttachments(task_id)),
    ]])
}

pub fn back_to_task_keyboard(lang: &LanguageIdentifier, task_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_row(lang, "btn-back-to-task", CallbackData::AdminTask(task_id))])
}

/// Suggested users for assignment, a manual-entry button and a way back.
pub fn suggested_users_keyboard(lang: &LanguageIdentifier, task_id: i64, users: &[User]) -> InlineKeyboardMarkup {
    let buttons = users
        .iter()
        .map(|u| {
            cb(
                format!("👤 {}", u.username),
                CallbackData::PickUser {
                    task_id,
                    user_id: u.id,
                },
            )
        })
        .collect();
    let mut rows = grid(buttons, GRID_COLUMNS);
    rows.push(vec![cb(i18n::t(lang, "btn-manual-username"), CallbackData::ManualUsername(task_id))]);
    rows.push(back_row(lang, "btn-back-to-task", CallbackData::AdminTask(task_id)));
    InlineKeyboardMarkup::new(rows)
}

/// Assigned users, one per row, each starting the removal confirmation.
pub fn remove_users_keyboard(lang: &LanguageIdentifier, task_id: i64, users: &[User]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = users
        .iter()
        .map(|u| {
            vec![cb(
                format!("❌ {}", u.username),
                CallbackData::RemoveUser {
                    task_id,
                    user_id: u.id,
                },
            )]
        })
        .collect();
    rows.push(back_row(lang, "btn-back-to-task", CallbackData::AdminTask(task_id)));
    InlineKeyboardMarkup::new(rows)
}

pub fn confirm_remove_keyboard(lang: &LanguageIdentifier, task_id: i64, user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        cb(i18n::t(lang, "btn-confirm-remove"), CallbackData::ConfirmRemove { task_id, user_id }),
        cb(i18n::t(lang, "btn-cancel-remove"), CallbackData::RemoveList(task_id)),
    ]])
}
