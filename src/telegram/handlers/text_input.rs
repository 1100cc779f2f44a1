//! Replies to an open prompt: new task titles, field edits and manual usernames.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, Message, MessageId};
use unic_langid::LanguageIdentifier;

use super::commands::{create_and_show, reply};
use super::types::{admin_user, HandlerDeps, HandlerError};
use crate::conversation::{normalize_username, validate_title, FlowKey, FlowState, InputError};
use crate::core::config::menu::{MAX_TITLE_LEN, MAX_USERNAME_LEN};
use crate::i18n;
use crate::storage::tasks::{edit_task, EditOutcome};
use crate::storage::with_conn;
use crate::telegram::menu::keyboards;
use crate::telegram::menu::{assign_by_username, render, EditField, Target};
use crate::telegram::Bot;

/// Handles a text message from a user with an open prompt.
pub async fn handle_flow_reply(bot: Bot, msg: Message, deps: HandlerDeps) -> Result<(), HandlerError> {
    let (Some(from), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let key = FlowKey::new(msg.chat.id, from.id);
    let state = deps.flows.get(key);
    let lang = i18n::lang_for_user(Some(from));

    let result = match state {
        FlowState::AwaitingTitle {
            prompt,
            group_id,
            topic_id,
            ..
        } => new_task_reply(&bot, &msg, &deps, &lang, key, prompt, text, (group_id, topic_id)).await,
        FlowState::AwaitingUsername { task_id, prompt, .. } => {
            username_reply(&bot, &msg, &deps, &lang, key, task_id, prompt, text).await
        }
        other => match EditField::from_state(&other) {
            Some((field, task_id)) => edit_reply(&bot, &msg, &deps, &lang, key, other, field, task_id, text).await,
            None => Ok(()),
        },
    };

    if let Err(e) = result {
        log::error!("Flow reply failed for {} in {}: {}", from.id, msg.chat.id, e);
        deps.flows.clear(key);
        reply(&bot, &msg, i18n::t(&lang, "error-generic")).await?;
    }
    Ok(())
}

fn input_error_text(lang: &LanguageIdentifier, error: &InputError, max: usize) -> String {
    i18n::t_with(lang, error.i18n_key(), "max", max)
}

/// Replaces the user's bad reply with a fresh error message and keeps the prompt open.
///
/// Only the newest error stays visible.
async fn reject(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    key: FlowKey,
    state: FlowState,
    text: String,
) -> Result<(), HandlerError> {
    bot.delete_message(msg.chat.id, msg.id).await.ok();
    if let Some(previous) = state.error_message() {
        bot.delete_message(msg.chat.id, previous).await.ok();
    }
    let error = reply(bot, msg, text).await?;
    deps.flows.set(key, state.with_error(error.id));
    Ok(())
}

/// Removes the answered prompt's leftovers and shows `text` in its place.
async fn finish(
    bot: &Bot,
    msg: &Message,
    state: FlowState,
    prompt: MessageId,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> Result<(), HandlerError> {
    bot.delete_message(msg.chat.id, msg.id).await.ok();
    if let Some(previous) = state.error_message() {
        bot.delete_message(msg.chat.id, previous).await.ok();
    }
    let target = Target::Edit {
        chat: msg.chat.id,
        message: prompt,
    };
    render(bot, target, text, keyboard).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn new_task_reply(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    key: FlowKey,
    prompt: MessageId,
    text: &str,
    (group_id, topic_id): (Option<i64>, Option<i64>),
) -> Result<(), HandlerError> {
    let state = deps.flows.get(key);
    let title = match validate_title(text) {
        Ok(title) => title,
        Err(e) => return reject(bot, msg, deps, key, state, input_error_text(lang, &e, MAX_TITLE_LEN)).await,
    };

    deps.flows.clear(key);
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(admin) = admin_user(deps, from)? else {
        reply(bot, msg, i18n::t(lang, "error-no-access")).await?;
        return Ok(());
    };

    bot.delete_message(msg.chat.id, prompt).await.ok();
    if let Some(previous) = state.error_message() {
        bot.delete_message(msg.chat.id, previous).await.ok();
    }
    create_and_show(bot, msg, deps, lang, &admin, &title, group_id, topic_id).await
}

#[allow(clippy::too_many_arguments)]
async fn username_reply(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    key: FlowKey,
    task_id: i64,
    prompt: MessageId,
    text: &str,
) -> Result<(), HandlerError> {
    let state = deps.flows.get(key);
    let username = match normalize_username(text) {
        Ok(username) => username,
        Err(e) => return reject(bot, msg, deps, key, state, input_error_text(lang, &e, MAX_USERNAME_LEN)).await,
    };

    deps.flows.clear(key);
    let text = match assign_by_username(deps, task_id, &username)? {
        Some((user, true)) => {
            log::info!("User @{} assigned to task {}", user.username, task_id);
            i18n::t_with(lang, "user-added", "username", user.username)
        }
        Some((user, false)) => i18n::t_with(lang, "user-already-assigned", "username", user.username),
        None => i18n::t(lang, "error-task-not-found"),
    };
    finish(bot, msg, state, prompt, text, keyboards::back_to_task_keyboard(lang, task_id)).await
}

#[allow(clippy::too_many_arguments)]
async fn edit_reply(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    key: FlowKey,
    state: FlowState,
    field: EditField,
    task_id: i64,
    text: &str,
) -> Result<(), HandlerError> {
    let Some(prompt) = state.prompt() else {
        return Ok(());
    };
    let edit = match field.parse(text) {
        Ok(edit) => edit,
        Err(e) => return reject(bot, msg, deps, key, state, input_error_text(lang, &e, MAX_TITLE_LEN)).await,
    };

    deps.flows.clear(key);
    let text = match with_conn(&deps.db_pool, |conn| edit_task(conn, task_id, &edit))? {
        EditOutcome::Updated(task) => {
            log::info!("Task {} {:?} edited by {}", task.id, field, key.user);
            i18n::t(lang, field.done_key())
        }
        EditOutcome::NotFound => i18n::t(lang, "error-task-not-found"),
    };
    finish(bot, msg, state, prompt, text, keyboards::back_to_task_keyboard(lang, task_id)).await
}
