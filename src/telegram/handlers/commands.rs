//! Command handler implementations (/start, /tasks, /mytasks, /newtask, /adduser, /deluser, /cancel)

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, Message};
use unic_langid::LanguageIdentifier;

use super::types::{fallback_username, registered_user, HandlerDeps, HandlerError};
use crate::conversation::{normalize_username, validate_title, FlowKey, FlowState};
use crate::core::config::{self, Mode};
use crate::core::AppResult;
use crate::i18n;
use crate::storage::db::{get_or_create_group, get_or_create_topic};
use crate::storage::tasks::{create_task, NewTask};
use crate::storage::users::{delete_user_by_username, get_or_create_user, DeleteOutcome};
use crate::storage::{with_conn, User};
use crate::telegram::bot::Command;
use crate::telegram::menu::keyboards::{self, MenuButton};
use crate::telegram::menu::{delete_later, render, show_admin_card, show_manage_menu, show_my_tasks, Target};
use crate::telegram::{telegram_id, topic_thread, Bot};

/// Sends `text` to the chat of `msg`, inside its forum topic if it has one.
pub(super) async fn reply(bot: &Bot, msg: &Message, text: impl Into<String>) -> ResponseResult<Message> {
    let mut req = bot.send_message(msg.chat.id, text.into());
    if let Some(thread) = topic_thread(msg) {
        req = req.message_thread_id(thread);
    }
    req.await
}

/// Target for a menu answering `msg`.
pub(super) fn reply_target(msg: &Message) -> Target {
    Target::Send {
        chat: msg.chat.id,
        thread: topic_thread(msg),
    }
}

/// Group and topic rows for the chat `msg` was sent in, registering them on first use.
///
/// Private chats have neither.
pub(super) fn chat_context(deps: &HandlerDeps, msg: &Message) -> AppResult<(Option<i64>, Option<i64>)> {
    if msg.chat.is_private() {
        return Ok((None, None));
    }
    let title = msg.chat.title();
    let thread = topic_thread(msg);
    with_conn(&deps.db_pool, |conn| {
        let group = get_or_create_group(conn, msg.chat.id.0, title)?;
        let topic = match thread {
            Some(thread) => Some(get_or_create_topic(conn, thread.0 .0, group.id)?.id),
            None => None,
        };
        Ok((Some(group.id), topic))
    })
}

/// The sender as an admin, or a localized refusal.
async fn require_admin(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
) -> Result<Option<User>, HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(None);
    };
    match registered_user(deps, from)? {
        Some(user) if user.is_admin => Ok(Some(user)),
        Some(_) => {
            reply(bot, msg, i18n::t(lang, "error-no-access")).await?;
            Ok(None)
        }
        None => {
            reply(bot, msg, i18n::t(lang, "error-not-registered")).await?;
            Ok(None)
        }
    }
}

/// Routes a parsed command. Failures are logged and reported with a generic message.
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, deps: HandlerDeps) -> Result<(), HandlerError> {
    log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
    let lang = i18n::lang_for_user(msg.from.as_ref());

    let result = match &cmd {
        Command::Start => handle_start_command(&bot, &msg, &deps, &lang).await,
        Command::Tasks => handle_tasks_command(&bot, &msg, &deps, &lang).await,
        Command::MyTasks => handle_my_tasks_command(&bot, &msg, &deps, &lang).await,
        Command::NewTask(title) => handle_new_task_command(&bot, &msg, &deps, &lang, title).await,
        Command::AddUser(name) => handle_add_user_command(&bot, &msg, &deps, &lang, name).await,
        Command::DelUser(name) => handle_del_user_command(&bot, &msg, &deps, &lang, name).await,
        Command::Cancel => handle_cancel_command(&bot, &msg, &deps, &lang).await,
        Command::Help => reply(&bot, &msg, i18n::t(&lang, "help-text")).await.map(|_| ()).map_err(Into::into),
    };

    if let Err(e) = result {
        log::error!("Command {:?} failed in chat {}: {}", cmd, msg.chat.id, e);
        reply(&bot, &msg, i18n::t(&lang, "error-generic")).await?;
    }
    Ok(())
}

/// Reply-keyboard buttons behave like their commands and abandon any open prompt.
pub async fn handle_menu_button(bot: Bot, msg: Message, button: MenuButton, deps: HandlerDeps) -> Result<(), HandlerError> {
    let lang = i18n::lang_for_user(msg.from.as_ref());
    if let Some(from) = msg.from.as_ref() {
        deps.flows.clear(FlowKey::new(msg.chat.id, from.id));
    }

    let result = match button {
        MenuButton::ManageTasks => handle_tasks_command(&bot, &msg, &deps, &lang).await,
        MenuButton::NewTask => handle_new_task_command(&bot, &msg, &deps, &lang, "").await,
        MenuButton::MyTasks => handle_my_tasks_command(&bot, &msg, &deps, &lang).await,
    };

    if let Err(e) = result {
        log::error!("Menu button {:?} failed in chat {}: {}", button, msg.chat.id, e);
        reply(&bot, &msg, i18n::t(&lang, "error-generic")).await?;
    }
    Ok(())
}

/// Handle /start command
///
/// In a private chat it registers (dev mode) or recognizes (prod mode) the
/// sender. In a group it registers the group and topic, and only chat
/// admins may run it.
pub(super) async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if from.is_bot {
        reply(bot, msg, i18n::t(lang, "error-bots-not-allowed")).await?;
        return Ok(());
    }

    if msg.chat.is_private() {
        start_private(bot, msg, deps, lang, from).await
    } else {
        start_group(bot, msg, deps, lang, from).await
    }
}

/// In dev mode anyone who writes /start becomes an admin.
fn dev_register(deps: &HandlerDeps, from: &teloxide::types::User) -> AppResult<User> {
    let tid = telegram_id(from);
    let username = fallback_username(from);
    with_conn(&deps.db_pool, |conn| get_or_create_user(conn, Some(tid), &username, true))
}

async fn start_private(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    from: &teloxide::types::User,
) -> Result<(), HandlerError> {
    let user = match deps.mode {
        Mode::Dev => Some(dev_register(deps, from)?),
        Mode::Prod => registered_user(deps, from)?,
    };
    let Some(user) = user else {
        log::info!("Unregistered user {} sent /start", from.id);
        reply(bot, msg, i18n::t(lang, "error-not-registered")).await?;
        return Ok(());
    };

    let key = if user.is_admin { "start-private-admin" } else { "start-private" };
    bot.send_message(msg.chat.id, i18n::t_with(lang, key, "name", &from.first_name))
        .reply_markup(keyboards::main_reply_keyboard(lang, user.is_admin))
        .await?;
    Ok(())
}

async fn start_group(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    from: &teloxide::types::User,
) -> Result<(), HandlerError> {
    let member = bot.get_chat_member(msg.chat.id, from.id).await?;
    if !member.is_privileged() {
        reply(bot, msg, i18n::t(lang, "error-group-admin-only")).await?;
        return Ok(());
    }

    let user = match deps.mode {
        Mode::Dev => Some(dev_register(deps, from)?),
        Mode::Prod => registered_user(deps, from)?,
    };
    match user {
        Some(user) if user.is_admin => {}
        Some(_) => {
            reply(bot, msg, i18n::t(lang, "error-no-access")).await?;
            return Ok(());
        }
        None => {
            reply(bot, msg, i18n::t(lang, "error-not-registered")).await?;
            return Ok(());
        }
    }

    chat_context(deps, msg)?;
    let group = msg.chat.title().unwrap_or("-").to_string();
    log::info!("Group {} ({}) set up by {}", msg.chat.id, group, from.id);

    let mut req = bot
        .send_message(msg.chat.id, i18n::t_with(lang, "start-group", "group", group))
        .reply_markup(keyboards::group_reply_keyboard(lang));
    if let Some(thread) = topic_thread(msg) {
        req = req.message_thread_id(thread);
    }
    req.await?;
    Ok(())
}

pub(super) async fn handle_tasks_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
) -> Result<(), HandlerError> {
    if require_admin(bot, msg, deps, lang).await?.is_none() {
        return Ok(());
    }
    show_manage_menu(bot, reply_target(msg), lang, deps).await?;
    Ok(())
}

pub(super) async fn handle_my_tasks_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(user) = registered_user(deps, from)? else {
        reply(bot, msg, i18n::t(lang, "error-not-registered")).await?;
        return Ok(());
    };
    show_my_tasks(bot, reply_target(msg), lang, deps, &user).await?;
    Ok(())
}

/// `/newtask <title>` creates the task at once; a bare `/newtask` asks for the title.
pub(super) async fn handle_new_task_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    title: &str,
) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(admin) = require_admin(bot, msg, deps, lang).await? else {
        return Ok(());
    };
    let (group_id, topic_id) = chat_context(deps, msg)?;

    if title.trim().is_empty() {
        let text = format!("{}\n\n{}", i18n::t(lang, "prompt-new-task"), i18n::t(lang, "prompt-cancel-hint"));
        let prompt = reply(bot, msg, text).await?;
        deps.flows.set(
            FlowKey::new(msg.chat.id, from.id),
            FlowState::AwaitingTitle {
                prompt: prompt.id,
                group_id,
                topic_id,
                error: None,
            },
        );
        return Ok(());
    }

    match validate_title(title) {
        Ok(title) => create_and_show(bot, msg, deps, lang, &admin, &title, group_id, topic_id).await,
        Err(e) => {
            reply(bot, msg, i18n::t_with(lang, e.i18n_key(), "max", config::menu::MAX_TITLE_LEN)).await?;
            Ok(())
        }
    }
}

/// Stores a new task and posts its admin card.
#[allow(clippy::too_many_arguments)]
pub(super) async fn create_and_show(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    admin: &User,
    title: &str,
    group_id: Option<i64>,
    topic_id: Option<i64>,
) -> Result<(), HandlerError> {
    let mut new_task = NewTask::new(admin.id, title);
    if let Some(group_id) = group_id {
        new_task = new_task.in_group(group_id, topic_id);
    }
    let task = with_conn(&deps.db_pool, |conn| create_task(conn, &new_task))?;

    reply(bot, msg, i18n::t_with(lang, "task-created", "title", &task.title)).await?;
    show_admin_card(bot, reply_target(msg), lang, deps, task.id).await?;
    Ok(())
}

/// Registers a username so it can be assigned before that person ever writes to the bot.
pub(super) async fn handle_add_user_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    name: &str,
) -> Result<(), HandlerError> {
    if require_admin(bot, msg, deps, lang).await?.is_none() {
        return Ok(());
    }
    if name.trim().is_empty() {
        reply(bot, msg, i18n::t(lang, "adduser-usage")).await?;
        return Ok(());
    }
    let username = match normalize_username(name) {
        Ok(username) => username,
        Err(e) => {
            reply(bot, msg, i18n::t_with(lang, e.i18n_key(), "max", config::menu::MAX_USERNAME_LEN)).await?;
            return Ok(());
        }
    };

    let user = with_conn(&deps.db_pool, |conn| get_or_create_user(conn, None, &username, false))?;
    reply(bot, msg, i18n::t_with(lang, "adduser-done", "username", user.username)).await?;
    Ok(())
}

/// Deletes a user. The command and its answer disappear after a short delay.
pub(super) async fn handle_del_user_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    name: &str,
) -> Result<(), HandlerError> {
    if require_admin(bot, msg, deps, lang).await?.is_none() {
        return Ok(());
    }
    let Ok(username) = normalize_username(name) else {
        reply(bot, msg, i18n::t(lang, "deluser-usage")).await?;
        return Ok(());
    };

    let outcome = with_conn(&deps.db_pool, |conn| delete_user_by_username(conn, &username))?;
    let key = match outcome {
        DeleteOutcome::Deleted => "deluser-done",
        DeleteOutcome::NotFound => "deluser-missing",
    };
    let answer = reply(bot, msg, i18n::t(lang, key)).await?;
    delete_later(
        bot,
        msg.chat.id,
        vec![answer.id, msg.id],
        config::menu::notice_delete_delay(),
    );
    Ok(())
}

/// Leaves the current flow and turns its prompt back into a link to the task.
pub(super) async fn handle_cancel_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let state = deps.flows.clear(FlowKey::new(msg.chat.id, from.id));

    if let Some(error) = state.error_message() {
        bot.delete_message(msg.chat.id, error).await.ok();
    }

    let cancelled = i18n::t(lang, "flow-cancelled");
    match (state.prompt(), state.task_id()) {
        (Some(prompt), Some(task_id)) => {
            let target = Target::Edit {
                chat: msg.chat.id,
                message: prompt,
            };
            render(bot, target, cancelled, keyboards::back_to_task_keyboard(lang, task_id)).await?;
        }
        (Some(prompt), None) => {
            let target = Target::Edit {
                chat: msg.chat.id,
                message: prompt,
            };
            render(bot, target, cancelled, InlineKeyboardMarkup::default()).await?;
        }
        (None, Some(_)) => {
            reply(bot, msg, cancelled).await?;
        }
        (None, None) => {
            reply(bot, msg, i18n::t(lang, "cancel-nothing")).await?;
        }
    }
    Ok(())
}
