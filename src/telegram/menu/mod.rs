//! Inline menus: the task management tree, task cards and their actions.

mod attachments;
pub mod callback_data;
mod callback_router;
mod edit;
pub mod keyboards;
mod members;
mod my_tasks;
mod task_card;
mod task_manage;
pub mod views;

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ThreadId};
use teloxide::{ApiError, RequestError};
use unic_langid::LanguageIdentifier;

use crate::conversation::FlowKey;
use crate::i18n;

pub use attachments::{incoming_attachment, save_incoming_attachment};
pub use callback_data::CallbackData;
pub use callback_router::handle_menu_callback;
pub use edit::{start_edit, EditField};
pub use members::assign_by_username;
pub use my_tasks::show_my_tasks;
pub use task_card::{load_card, show_admin_card};
pub use task_manage::show_manage_menu;

use crate::telegram::{topic_thread, Bot};

/// Where a menu is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A fresh message, inside a forum topic when `thread` is set.
    Send { chat: ChatId, thread: Option<ThreadId> },
    /// Replaces the text and keyboard of an existing bot message.
    Edit { chat: ChatId, message: MessageId },
}

/// Sends or edits a menu message and returns the id it ended up in.
///
/// If an edit is rejected (the message is too old or was deleted) the menu
/// is sent as a new message instead.
pub async fn render(
    bot: &Bot,
    target: Target,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> ResponseResult<MessageId> {
    match target {
        Target::Send { chat, thread } => {
            let mut req = bot.send_message(chat, text).reply_markup(keyboard);
            if let Some(thread) = thread {
                req = req.message_thread_id(thread);
            }
            Ok(req.await?.id)
        }
        Target::Edit { chat, message } => {
            match bot
                .edit_message_text(chat, message, text.clone())
                .reply_markup(keyboard.clone())
                .await
            {
                Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(message),
                Err(e) => {
                    log::warn!("Failed to edit message {} in {}: {}. Sending a new one", message.0, chat.0, e);
                    Ok(bot.send_message(chat, text).reply_markup(keyboard).await?.id)
                }
            }
        }
    }
}

/// Deletes messages after `delay` without blocking the handler.
pub fn delete_later(bot: &Bot, chat: ChatId, messages: Vec<MessageId>, delay: Duration) {
    let bot = bot.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for message in messages {
            if let Err(e) = bot.delete_message(chat, message).await {
                log::debug!("Failed to delete message {} in {}: {}", message.0, chat.0, e);
            }
        }
    });
}

/// How a callback query is answered once its action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Silent,
    /// Short notice at the top of the chat.
    Toast(String),
    /// Modal the user has to dismiss.
    Alert(String),
}

/// Everything an action needs to know about the pressed button.
#[derive(Debug, Clone)]
pub struct CallbackCtx {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub thread_id: Option<ThreadId>,
    pub user: teloxide::types::User,
    pub lang: LanguageIdentifier,
}

impl CallbackCtx {
    /// None when the query has no accessible message to work on.
    pub fn from_query(q: &CallbackQuery) -> Option<Self> {
        let message = q.message.as_ref()?;
        Some(Self {
            chat_id: message.chat().id,
            message_id: message.id(),
            thread_id: q.regular_message().and_then(topic_thread),
            user: q.from.clone(),
            lang: i18n::lang_for_user(Some(&q.from)),
        })
    }

    pub fn flow_key(&self) -> FlowKey {
        FlowKey::new(self.chat_id, self.user.id)
    }

    /// The message holding the pressed button.
    pub fn edit(&self) -> Target {
        Target::Edit {
            chat: self.chat_id,
            message: self.message_id,
        }
    }

    pub fn t(&self, key: &str) -> String {
        i18n::t(&self.lang, key)
    }
}
