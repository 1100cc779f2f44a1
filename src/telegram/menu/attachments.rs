//! Collecting files for a task and sending them back.

use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, Message};

use super::{keyboards, render, Answer, CallbackCtx};
use crate::conversation::{FlowKey, FlowState};
use crate::i18n;
use crate::storage::attachments::{add_attachment, get_attachments};
use crate::storage::tasks::get_task;
use crate::storage::{with_conn, Attachment, AttachmentKind};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::{topic_thread, Bot};

/// File id and kind of the media carried by a message.
///
/// Photos arrive in several sizes; the largest is kept.
pub fn incoming_attachment(msg: &Message) -> Option<(String, AttachmentKind)> {
    if let Some(doc) = msg.document() {
        Some((doc.file.id.0.clone(), AttachmentKind::Document))
    } else if let Some(photos) = msg.photo() {
        photos
            .iter()
            .max_by_key(|p| p.width * p.height)
            .map(|p| (p.file.id.0.clone(), AttachmentKind::Photo))
    } else if let Some(video) = msg.video() {
        Some((video.file.id.0.clone(), AttachmentKind::Video))
    } else if let Some(audio) = msg.audio() {
        Some((audio.file.id.0.clone(), AttachmentKind::Audio))
    } else {
        msg.voice().map(|voice| (voice.file.id.0.clone(), AttachmentKind::Voice))
    }
}

/// Every file sent until the user leaves the card is attached to the task.
pub async fn start_collecting(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    let Some(task) = with_conn(&deps.db_pool, |conn| get_task(conn, task_id))? else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    let text = i18n::t_with(&ctx.lang, "attach-start", "title", &task.title);
    render(bot, ctx.edit(), text, keyboards::back_to_task_keyboard(&ctx.lang, task_id)).await?;
    deps.flows.set(ctx.flow_key(), FlowState::CollectingAttachments { task_id });
    Ok(Answer::Silent)
}

/// Stores the media of `msg` for `task_id` and confirms it in the chat.
///
/// Returns false when the message carries no supported media.
pub async fn save_incoming_attachment(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    key: FlowKey,
    task_id: i64,
) -> Result<bool, HandlerError> {
    let Some((file_id, kind)) = incoming_attachment(msg) else {
        return Ok(false);
    };
    let lang = i18n::lang_for_user(msg.from.as_ref());

    let saved = with_conn(&deps.db_pool, |conn| {
        if get_task(conn, task_id)?.is_none() {
            return Ok(None);
        }
        add_attachment(conn, task_id, &file_id, kind).map(Some)
    })?;

    let key_text = match saved {
        Some(true) => {
            log::info!("Attached {} {} to task {}", kind, file_id, task_id);
            "attach-saved"
        }
        Some(false) => "attach-duplicate",
        None => {
            deps.flows.clear(key);
            "error-task-not-found"
        }
    };

    let mut req = bot.send_message(msg.chat.id, i18n::t(&lang, key_text));
    if let Some(thread) = topic_thread(msg) {
        req = req.message_thread_id(thread);
    }
    req.await?;
    Ok(true)
}

async fn send_attachment(
    bot: &Bot,
    ctx: &CallbackCtx,
    attachment: &Attachment,
) -> Result<(), teloxide::RequestError> {
    let file = InputFile::file_id(FileId(attachment.file_id.clone()));
    macro_rules! send {
        ($method:ident) => {{
            let mut req = bot.$method(ctx.chat_id, file);
            if let Some(thread) = ctx.thread_id {
                req = req.message_thread_id(thread);
            }
            req.await?;
        }};
    }

    match attachment.kind {
        AttachmentKind::Document => send!(send_document),
        AttachmentKind::Photo => send!(send_photo),
        AttachmentKind::Video => send!(send_video),
        AttachmentKind::Audio => send!(send_audio),
        AttachmentKind::Voice => send!(send_voice),
    }
    Ok(())
}

/// Replays every attachment of a task into the chat, oldest first.
pub(super) async fn send_all(bot: &Bot, ctx: &CallbackCtx, deps: &HandlerDeps, task_id: i64) -> Result<Answer, HandlerError> {
    let attachments = with_conn(&deps.db_pool, |conn| get_attachments(conn, task_id))?;
    if attachments.is_empty() {
        return Ok(Answer::Alert(ctx.t("attach-none")));
    }

    for attachment in &attachments {
        if let Err(e) = send_attachment(bot, ctx, attachment).await {
            log::error!("Failed to send attachment {} of task {}: {}", attachment.id, task_id, e);
        }
    }
    Ok(Answer::Toast(ctx.t("attach-sent")))
}
