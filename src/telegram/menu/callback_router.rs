use teloxide::prelude::*;

use super::callback_data::CallbackData;
use super::edit::{start_edit, EditField};
use super::{attachments, members, my_tasks, task_card, task_manage, Answer, CallbackCtx};
use crate::telegram::handlers::{registered_user, HandlerDeps, HandlerError};
use crate::telegram::Bot;

/// Handles callback queries from the task menus.
///
/// Management actions need an admin; assignees may only browse their own
/// tasks and fetch attachments. Every query is answered, with a toast or
/// alert when the action produced one.
pub async fn handle_menu_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(ctx) = CallbackCtx::from_query(&q) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let answer = match q.data.as_deref().map(str::parse::<CallbackData>) {
        Some(Ok(data)) => {
            log::debug!("Callback {} from {} in {}", data, ctx.user.id, ctx.chat_id.0);
            route(&bot, &ctx, &deps, data).await.unwrap_or_else(|e| {
                log::error!("Callback {} failed for {}: {}", data, ctx.user.id, e);
                Answer::Alert(ctx.t("error-generic"))
            })
        }
        Some(Err(e)) => {
            log::warn!("{}", e);
            Answer::Silent
        }
        None => Answer::Silent,
    };

    let req = bot.answer_callback_query(q.id.clone());
    match answer {
        Answer::Silent => req.await?,
        Answer::Toast(text) => req.text(text).await?,
        Answer::Alert(text) => req.text(text).show_alert(true).await?,
    };
    Ok(())
}

async fn route(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, data: CallbackData) -> Result<Answer, HandlerError> {
    use CallbackData::*;

    let Some(user) = registered_user(deps, &ctx.user)? else {
        return Ok(Answer::Alert(ctx.t("error-not-registered")));
    };
    if !data.is_member_action() && !user.is_admin {
        log::warn!("User {} tried admin action {}", ctx.user.id, data);
        return Ok(Answer::Alert(ctx.t("error-no-access")));
    }

    match data {
        ManageMenu => task_manage::back_to_menu(bot, ctx, deps).await,
        CloseMenu => task_manage::close(bot, ctx, deps).await,
        OwnTasks => task_manage::show_own(bot, ctx, deps, &user).await,
        ViewGroup(group_id) => task_manage::show_group(bot, ctx, deps, group_id).await,
        ViewUngrouped => task_manage::show_ungrouped(bot, ctx, deps).await,
        MyTasks => my_tasks::back_to_list(bot, ctx, deps, &user).await,
        AdminTask(id) => task_card::open(bot, ctx, deps, id).await,
        ShowTask(id) => my_tasks::show_card(bot, ctx, deps, &user, id).await,
        DeleteTask(id) => task_card::delete(bot, ctx, deps, id).await,
        CycleStatus(id) => task_card::cycle_status(bot, ctx, deps, id).await,
        AddUser(id) => members::show_add_user(bot, ctx, deps, id).await,
        PickUser { task_id, user_id } => members::pick_user(bot, ctx, deps, task_id, user_id).await,
        ManualUsername(id) => members::start_manual(bot, ctx, deps, id).await,
        TaskUsers(id) => members::show_users(bot, ctx, deps, id).await,
        RemoveList(id) => members::show_remove_list(bot, ctx, deps, id).await,
        RemoveUser { task_id, user_id } => members::ask_remove(bot, ctx, deps, task_id, user_id).await,
        ConfirmRemove { task_id, user_id } => members::confirm_remove(bot, ctx, deps, task_id, user_id).await,
        EditName(id) => start_edit(bot, ctx, deps, id, EditField::Name).await,
        EditDescription(id) => start_edit(bot, ctx, deps, id, EditField::Description).await,
        EditStart(id) => start_edit(bot, ctx, deps, id, EditField::StartDate).await,
        EditEnd(id) => start_edit(bot, ctx, deps, id, EditField::EndDate).await,
        AddAttachment(id) => attachments::start_collecting(bot, ctx, deps, id).await,
        GetAttachments(id) => {
            if !my_tasks::can_view(deps, &user, id)? {
                return Ok(Answer::Alert(ctx.t("error-no-access")));
            }
            attachments::send_all(bot, ctx, deps, id).await
        }
    }
}
