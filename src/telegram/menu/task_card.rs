use teloxide::types::MessageId;
use unic_langid::LanguageIdentifier;

use super::task_manage::show_manage_menu;
use super::{keyboards, render, views, Answer, CallbackCtx, Target};
use crate::core::AppResult;
use crate::i18n;
use crate::storage::tasks::{delete_task, get_task, set_task_status};
use crate::storage::users::get_user;
use crate::storage::{with_conn, Task};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::Bot;

/// A task with its creator's username.
pub fn load_card(deps: &HandlerDeps, task_id: i64) -> AppResult<Option<(Task, Option<String>)>> {
    with_conn(&deps.db_pool, |conn| {
        let Some(task) = get_task(conn, task_id)? else {
            return Ok(None);
        };
        let admin = get_user(conn, task.admin_id)?.map(|u| u.username);
        Ok(Some((task, admin)))
    })
}

/// Renders the admin card. `None` when the task no longer exists.
pub async fn show_admin_card(
    bot: &Bot,
    target: Target,
    lang: &LanguageIdentifier,
    deps: &HandlerDeps,
    task_id: i64,
) -> Result<Option<MessageId>, HandlerError> {
    let Some((task, admin)) = load_card(deps, task_id)? else {
        return Ok(None);
    };
    let text = views::task_card_text(lang, &task, admin.as_deref());
    let message = render(bot, target, text, keyboards::admin_task_keyboard(lang, &task)).await?;
    Ok(Some(message))
}

/// Opening a card abandons whatever input was in progress.
pub(super) async fn open(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    deps.flows.clear(ctx.flow_key());
    match show_admin_card(bot, ctx.edit(), &ctx.lang, deps, task_id).await? {
        Some(_) => Ok(Answer::Silent),
        None => Ok(Answer::Alert(ctx.t("error-task-not-found"))),
    }
}

/// pending → in progress → done → pending
pub(super) async fn cycle_status(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    task_id: i64,
) -> Result<Answer, HandlerError> {
    let next = with_conn(&deps.db_pool, |conn| {
        let Some(task) = get_task(conn, task_id)? else {
            return Ok(None);
        };
        let next = task.status.next();
        set_task_status(conn, task_id, next)?;
        Ok(Some(next))
    })?;
    let Some(next) = next else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    log::info!("Task {} status set to {} by {}", task_id, next, ctx.user.id);
    show_admin_card(bot, ctx.edit(), &ctx.lang, deps, task_id).await?;
    Ok(Answer::Toast(i18n::t_with(
        &ctx.lang,
        "status-changed",
        "status",
        ctx.t(next.i18n_key()),
    )))
}

pub(super) async fn delete(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    let deleted = with_conn(&deps.db_pool, |conn| {
        let Some(task) = get_task(conn, task_id)? else {
            return Ok(None);
        };
        delete_task(conn, task_id)?;
        Ok(Some(task))
    })?;
    let Some(task) = deleted else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    show_manage_menu(bot, ctx.edit(), &ctx.lang, deps).await?;
    Ok(Answer::Toast(i18n::t_with(&ctx.lang, "task-deleted", "title", task.title)))
}
