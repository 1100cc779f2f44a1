//! Assigning users to tasks and removing them again.

use std::collections::HashSet;

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;

use super::{keyboards, render, views, Answer, CallbackCtx};
use crate::conversation::FlowState;
use crate::core::config::menu::MAX_SUGGESTED_USERS;
use crate::core::AppResult;
use crate::i18n;
use crate::storage::tasks::{assign_user_to_task, get_task, get_task_users, remove_user_from_task, RemoveOutcome};
use crate::storage::users::{get_or_create_user, get_user, suggested_users};
use crate::storage::{with_conn, User};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::{telegram_id, Bot};

/// Narrows suggestions to the admins of a group chat.
///
/// The Bot API can't list ordinary members, so chat administrators are the
/// only people known to be in the group. Username-only rows are matched by name.
async fn filter_to_chat_members(bot: &Bot, chat: ChatId, users: Vec<User>) -> Vec<User> {
    let admins = match bot.get_chat_administrators(chat).await {
        Ok(admins) => admins,
        Err(e) => {
            log::warn!("Failed to fetch administrators of {}: {}", chat.0, e);
            return users;
        }
    };

    let humans = admins.iter().filter(|m| !m.user.is_bot);
    let ids: HashSet<i64> = humans.clone().map(|m| telegram_id(&m.user)).collect();
    let names: HashSet<String> = humans
        .filter_map(|m| m.user.username.as_deref())
        .map(str::to_lowercase)
        .collect();

    users
        .into_iter()
        .filter(|u| match u.telegram_id {
            Some(tid) => ids.contains(&tid),
            None => names.contains(&u.username.to_lowercase()),
        })
        .collect()
}

pub(super) async fn show_add_user(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    let requester = telegram_id(&ctx.user);
    let found = with_conn(&deps.db_pool, |conn| {
        let Some(task) = get_task(conn, task_id)? else {
            return Ok(None);
        };
        Ok(Some((task, suggested_users(conn, task_id, requester)?)))
    })?;
    let Some((task, mut users)) = found else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    if !ctx.chat_id.is_user() {
        users = filter_to_chat_members(bot, ctx.chat_id, users).await;
    }
    users.truncate(MAX_SUGGESTED_USERS);

    let key = if users.is_empty() { "add-user-none" } else { "add-user-title" };
    let text = i18n::t_with(&ctx.lang, key, "title", &task.title);
    render(
        bot,
        ctx.edit(),
        text,
        keyboards::suggested_users_keyboard(&ctx.lang, task_id, &users),
    )
    .await?;
    Ok(Answer::Silent)
}

pub(super) async fn pick_user(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    task_id: i64,
    user_id: i64,
) -> Result<Answer, HandlerError> {
    let outcome = with_conn(&deps.db_pool, |conn| {
        if get_task(conn, task_id)?.is_none() {
            return Ok(Err("error-task-not-found"));
        }
        let Some(user) = get_user(conn, user_id)? else {
            return Ok(Err("error-user-not-found"));
        };
        let added = assign_user_to_task(conn, user.id, task_id)?;
        Ok(Ok((user, added)))
    })?;
    let (user, added) = match outcome {
        Ok(assigned) => assigned,
        Err(key) => return Ok(Answer::Alert(ctx.t(key))),
    };

    show_add_user(bot, ctx, deps, task_id).await?;
    Ok(Answer::Toast(assigned_text(ctx, &user, added)))
}

fn assigned_text(ctx: &CallbackCtx, user: &User, added: bool) -> String {
    let key = if added { "user-added" } else { "user-already-assigned" };
    i18n::t_with(&ctx.lang, key, "username", &user.username)
}

/// Asks for a username; the reply is handled by the text input flow.
pub(super) async fn start_manual(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    if with_conn(&deps.db_pool, |conn| get_task(conn, task_id))?.is_none() {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    }

    let text = format!("{}\n\n{}", ctx.t("prompt-username"), ctx.t("prompt-cancel-hint"));
    let prompt = render(bot, ctx.edit(), text, keyboards::back_to_task_keyboard(&ctx.lang, task_id)).await?;
    deps.flows.set(
        ctx.flow_key(),
        FlowState::AwaitingUsername {
            task_id,
            prompt,
            error: None,
        },
    );
    Ok(Answer::Silent)
}

/// Assigns a user by name, registering the name if it is new.
///
/// Returns the user and whether the assignment is new, or `None` when the
/// task is gone.
pub fn assign_by_username(deps: &HandlerDeps, task_id: i64, username: &str) -> AppResult<Option<(User, bool)>> {
    with_conn(&deps.db_pool, |conn| {
        if get_task(conn, task_id)?.is_none() {
            return Ok(None);
        }
        let user = get_or_create_user(conn, None, username, false)?;
        let added = assign_user_to_task(conn, user.id, task_id)?;
        Ok(Some((user, added)))
    })
}

pub(super) async fn show_users(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    let found = with_conn(&deps.db_pool, |conn| {
        let Some(task) = get_task(conn, task_id)? else {
            return Ok(None);
        };
        let admin = get_user(conn, task.admin_id)?.map(|u| u.username);
        Ok(Some((task, admin, get_task_users(conn, task_id)?)))
    })?;
    let Some((task, admin, users)) = found else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    let text = views::task_users_text(&ctx.lang, &task, admin.as_deref(), &users);
    render(bot, ctx.edit(), text, keyboards::back_to_task_keyboard(&ctx.lang, task_id)).await?;
    Ok(Answer::Silent)
}

pub(super) async fn show_remove_list(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    task_id: i64,
) -> Result<Answer, HandlerError> {
    let found = with_conn(&deps.db_pool, |conn| {
        let Some(task) = get_task(conn, task_id)? else {
            return Ok(None);
        };
        Ok(Some((task, get_task_users(conn, task_id)?)))
    })?;
    let Some((task, users)) = found else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    let text = if users.is_empty() {
        ctx.t("task-users-none")
    } else {
        i18n::t_with(&ctx.lang, "remove-user-title", "title", &task.title)
    };
    render(bot, ctx.edit(), text, keyboards::remove_users_keyboard(&ctx.lang, task_id, &users)).await?;
    Ok(Answer::Silent)
}

pub(super) async fn ask_remove(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    task_id: i64,
    user_id: i64,
) -> Result<Answer, HandlerError> {
    let found = with_conn(&deps.db_pool, |conn| Ok((get_task(conn, task_id)?, get_user(conn, user_id)?)))?;
    let (task, user) = match found {
        (None, _) => return Ok(Answer::Alert(ctx.t("error-task-not-found"))),
        (Some(_), None) => return Ok(Answer::Alert(ctx.t("error-user-not-found"))),
        (Some(task), Some(user)) => (task, user),
    };

    let mut args = FluentArgs::new();
    args.set("username", user.username);
    args.set("title", task.title);
    let text = i18n::t_args(&ctx.lang, "remove-user-confirm", &args);
    render(
        bot,
        ctx.edit(),
        text,
        keyboards::confirm_remove_keyboard(&ctx.lang, task_id, user_id),
    )
    .await?;
    Ok(Answer::Silent)
}

pub(super) async fn confirm_remove(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    task_id: i64,
    user_id: i64,
) -> Result<Answer, HandlerError> {
    let removed = with_conn(&deps.db_pool, |conn| {
        if get_task(conn, task_id)?.is_none() {
            return Ok(None);
        }
        Ok(Some((get_user(conn, user_id)?, remove_user_from_task(conn, task_id, user_id)?)))
    })?;
    let Some((user, outcome)) = removed else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    show_remove_list(bot, ctx, deps, task_id).await?;
    match (user, outcome) {
        (Some(user), RemoveOutcome::Removed) => {
            log::info!("User {} removed from task {} by {}", user.id, task_id, ctx.user.id);
            Ok(Answer::Toast(i18n::t_with(&ctx.lang, "user-removed", "username", user.username)))
        }
        _ => Ok(Answer::Alert(ctx.t("user-not-assigned"))),
    }
}
