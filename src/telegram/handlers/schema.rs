//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{handle_command, handle_menu_button};
use super::text_input::handle_flow_reply;
use super::types::{HandlerDeps, HandlerError};
use crate::conversation::FlowKey;
use crate::telegram::bot::Command;
use crate::telegram::menu::keyboards::MenuButton;
use crate::telegram::menu::{handle_menu_callback, incoming_attachment, save_incoming_attachment};
use crate::telegram::Bot;

fn flow_key(msg: &Message) -> Option<FlowKey> {
    msg.from.as_ref().map(|u| FlowKey::new(msg.chat.id, u.id))
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Order matters: commands win over everything, reply-keyboard labels over
/// open prompts, and prompts over attachment capture.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(menu_button_handler(deps.clone()))
        .branch(flow_reply_handler(deps.clone()))
        .branch(attachment_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move { handle_command(bot, msg, cmd, deps).await }
        },
    ))
}

/// Labels of the persistent reply keyboard, in any supported language
fn menu_button_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| msg.text().and_then(MenuButton::from_label))
        .endpoint(move |bot: Bot, msg: Message, button: MenuButton| {
            let deps = deps.clone();
            async move { handle_menu_button(bot, msg, button, deps).await }
        })
}

/// Text sent while a prompt is waiting for it
fn flow_reply_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let flows = deps.flows.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            msg.text().is_some() && flow_key(&msg).is_some_and(|key| flows.get(key).expects_text())
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_flow_reply(bot, msg, deps).await }
        })
}

/// Media sent while a task is collecting attachments
fn attachment_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let flows = deps.flows.clone();
    Update::filter_message()
        .filter_map(move |msg: Message| {
            incoming_attachment(&msg)?;
            let key = flow_key(&msg)?;
            flows.collecting_for(key).map(|task_id| (key, task_id))
        })
        .endpoint(move |bot: Bot, msg: Message, (key, task_id): (FlowKey, i64)| {
            let deps = deps.clone();
            async move {
                if let Err(e) = save_incoming_attachment(&bot, &msg, &deps, key, task_id).await {
                    log::error!("Failed to store attachment for task {}: {}", task_id, e);
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_menu_callback(bot, q, deps).await }
    })
}
