//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod menu;

use teloxide::types::{InlineKeyboardButton, Message, ThreadId};

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};

/// Bot type used across the crate.
pub type Bot = teloxide::Bot;

/// Inline button carrying callback data.
pub fn cb(text: impl Into<String>, data: impl ToString) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), data.to_string())
}

/// Telegram user id as stored in the database.
pub fn telegram_id(user: &teloxide::types::User) -> i64 {
    i64::try_from(user.id.0).unwrap_or_default()
}

/// The forum topic `msg` was sent in.
///
/// Outside forums `thread_id` names a reply thread, which is not a valid send target.
pub fn topic_thread(msg: &Message) -> Option<ThreadId> {
    msg.thread_id.filter(|_| msg.is_topic_message)
}
