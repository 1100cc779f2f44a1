//! Read-only views for assigned users.

use teloxide::types::MessageId;
use unic_langid::LanguageIdentifier;

use super::callback_data::CallbackData;
use super::task_card::load_card;
use super::{keyboards, render, views, Answer, CallbackCtx, Target};
use crate::core::AppResult;
use crate::i18n;
use crate::storage::tasks::{get_tasks_for_user, is_user_assigned};
use crate::storage::{with_conn, User};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::Bot;

/// Tasks `user` is assigned to, as a grid of buttons.
pub async fn show_my_tasks(
    bot: &Bot,
    target: Target,
    lang: &LanguageIdentifier,
    deps: &HandlerDeps,
    user: &User,
) -> Result<MessageId, HandlerError> {
    let tasks = with_conn(&deps.db_pool, |conn| get_tasks_for_user(conn, user.id))?;

    let text = if tasks.is_empty() {
        i18n::t(lang, "my-tasks-empty")
    } else {
        i18n::t_with(lang, "my-tasks-title", "username", &user.username)
    };
    let keyboard = keyboards::task_grid_keyboard(lang, &tasks, CallbackData::ShowTask, ("btn-close", CallbackData::CloseMenu));
    Ok(render(bot, target, text, keyboard).await?)
}

pub(super) async fn back_to_list(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, user: &User) -> Result<Answer, HandlerError> {
    show_my_tasks(bot, ctx.edit(), &ctx.lang, deps, user).await?;
    Ok(Answer::Silent)
}

/// Admins see every task; other users only those assigned to them.
pub(super) fn can_view(deps: &HandlerDeps, user: &User, task_id: i64) -> AppResult<bool> {
    if user.is_admin {
        return Ok(true);
    }
    with_conn(&deps.db_pool, |conn| is_user_assigned(conn, user.id, task_id))
}

/// Task card without management actions. Only assignees and admins may open it.
pub(super) async fn show_card(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    user: &User,
    task_id: i64,
) -> Result<Answer, HandlerError> {
    if !can_view(deps, user, task_id)? {
        return Ok(Answer::Alert(ctx.t("error-no-access")));
    }
    let Some((task, admin)) = load_card(deps, task_id)? else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    let text = views::task_card_text(&ctx.lang, &task, admin.as_deref());
    render(bot, ctx.edit(), text, keyboards::assignee_task_keyboard(&ctx.lang, task.id)).await?;
    Ok(Answer::Silent)
}
