//! The admin task management tree: groups, their tasks and the admin's own tasks.

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use unic_langid::LanguageIdentifier;

use super::callback_data::CallbackData;
use super::{keyboards, render, views, Answer, CallbackCtx, Target};
use crate::i18n;
use crate::storage::db::{get_all_groups, get_group};
use crate::storage::tasks::{get_all_tasks, get_tasks_by_admin, GroupFilter};
use crate::storage::{with_conn, User};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::Bot;

/// Entry point of `/tasks` and every "back to list" button.
///
/// With no registered groups the task list is shown directly.
pub async fn show_manage_menu(
    bot: &Bot,
    target: Target,
    lang: &LanguageIdentifier,
    deps: &HandlerDeps,
) -> Result<MessageId, HandlerError> {
    let (groups, tasks) = with_conn(&deps.db_pool, |conn| {
        Ok((get_all_groups(conn)?, get_all_tasks(conn, GroupFilter::All)?))
    })?;

    let (text, keyboard) = if !groups.is_empty() {
        (
            views::counted_title(lang, "manage-groups-title", groups.len()),
            keyboards::manage_groups_keyboard(lang, &groups),
        )
    } else {
        let text = if tasks.is_empty() {
            i18n::t(lang, "manage-empty")
        } else {
            views::counted_title(lang, "manage-tasks-title", tasks.len())
        };
        (
            text,
            keyboards::task_grid_keyboard(lang, &tasks, CallbackData::AdminTask, ("btn-close", CallbackData::CloseMenu)),
        )
    };

    Ok(render(bot, target, text, keyboard).await?)
}

pub(super) async fn back_to_menu(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> Result<Answer, HandlerError> {
    deps.flows.clear(ctx.flow_key());
    show_manage_menu(bot, ctx.edit(), &ctx.lang, deps).await?;
    Ok(Answer::Silent)
}

pub(super) async fn show_group(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, group_id: i64) -> Result<Answer, HandlerError> {
    let found = with_conn(&deps.db_pool, |conn| {
        let Some(group) = get_group(conn, group_id)? else {
            return Ok(None);
        };
        Ok(Some((group, get_all_tasks(conn, GroupFilter::Group(group_id))?)))
    })?;
    let Some((group, tasks)) = found else {
        show_manage_menu(bot, ctx.edit(), &ctx.lang, deps).await?;
        return Ok(Answer::Silent);
    };

    let text = if tasks.is_empty() {
        ctx.t("group-no-tasks")
    } else {
        let mut args = FluentArgs::new();
        args.set("group", group.display_name());
        args.set("count", tasks.len().to_string());
        i18n::t_args(&ctx.lang, "group-tasks-title", &args)
    };
    let keyboard =
        keyboards::task_grid_keyboard(&ctx.lang, &tasks, CallbackData::AdminTask, ("btn-back", CallbackData::ManageMenu));
    render(bot, ctx.edit(), text, keyboard).await?;
    Ok(Answer::Silent)
}

/// Tasks created in a private chat.
pub(super) async fn show_ungrouped(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> Result<Answer, HandlerError> {
    let tasks = with_conn(&deps.db_pool, |conn| get_all_tasks(conn, GroupFilter::Ungrouped))?;

    let text = if tasks.is_empty() {
        ctx.t("group-no-tasks")
    } else {
        views::counted_title(&ctx.lang, "group-other-title", tasks.len())
    };
    let keyboard =
        keyboards::task_grid_keyboard(&ctx.lang, &tasks, CallbackData::AdminTask, ("btn-back", CallbackData::ManageMenu));
    render(bot, ctx.edit(), text, keyboard).await?;
    Ok(Answer::Silent)
}

pub(super) async fn show_own(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, admin: &User) -> Result<Answer, HandlerError> {
    let tasks = with_conn(&deps.db_pool, |conn| get_tasks_by_admin(conn, admin.id))?;

    let key = if tasks.is_empty() { "admin-tasks-empty" } else { "admin-tasks-title" };
    let keyboard =
        keyboards::task_grid_keyboard(&ctx.lang, &tasks, CallbackData::AdminTask, ("btn-back", CallbackData::ManageMenu));
    render(bot, ctx.edit(), ctx.t(key), keyboard).await?;
    Ok(Answer::Silent)
}

pub(super) async fn close(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps) -> Result<Answer, HandlerError> {
    deps.flows.clear(ctx.flow_key());
    if let Err(e) = bot.delete_message(ctx.chat_id, ctx.message_id).await {
        log::warn!("Failed to close menu {} in {}: {}", ctx.message_id.0, ctx.chat_id.0, e);
        bot.edit_message_reply_markup(ctx.chat_id, ctx.message_id).await?;
    }
    Ok(Answer::Silent)
}
