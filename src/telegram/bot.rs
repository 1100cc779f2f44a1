//! Bot initialization and command definitions
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation (custom Bot API URL, proxy, timeout)
//! - Command list registration in the Telegram UI

use reqwest::{ClientBuilder, Proxy};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::{config, AppResult};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Task manager commands:")]
pub enum Command {
    #[command(description = "register and show the main menu")]
    Start,
    #[command(description = "manage tasks (admins)")]
    Tasks,
    #[command(description = "tasks assigned to you")]
    MyTasks,
    #[command(description = "create a task: /newtask <title>")]
    NewTask(String),
    #[command(description = "register a user: /adduser <username>")]
    AddUser(String),
    #[command(description = "delete a user: /deluser <username>")]
    DelUser(String),
    #[command(description = "stop the current input")]
    Cancel,
    #[command(description = "show help")]
    Help,
}

/// Creates a Bot instance with custom or default API URL
///
/// Bot API traffic goes through `PROXY_URL` when it is set.
pub fn create_bot() -> AppResult<Bot> {
    let mut client = ClientBuilder::new().timeout(config::network::timeout());
    if let Some(proxy_url) = config::PROXY_URL.as_deref() {
        log::info!("Routing Bot API requests through proxy");
        client = client.proxy(Proxy::all(proxy_url)?);
    }

    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client.build()?);

    match config::bot_api::get_url() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            Ok(bot.set_api_url(url::Url::parse(&bot_api_url)?))
        }
        None => Ok(bot),
    }
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_list_mentions_every_command() {
        let command_list = Command::descriptions().to_string();

        assert!(command_list.contains("Task manager commands"));
        for name in ["/start", "/tasks", "/mytasks", "/newtask", "/adduser", "/deluser", "/cancel"] {
            assert!(command_list.contains(name), "missing {name}");
        }
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse("/newtask Plan the sprint", "task_bot").unwrap(),
            Command::NewTask("Plan the sprint".to_string())
        );
        assert_eq!(
            Command::parse("/deluser@task_bot alice", "task_bot").unwrap(),
            Command::DelUser("alice".to_string())
        );
        assert_eq!(Command::parse("/tasks", "task_bot").unwrap(), Command::Tasks);
    }
}
