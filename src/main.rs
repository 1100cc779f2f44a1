use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::update_listeners::{webhooks, Polling};
use tokio::time::sleep;

use taskbot::cli::{Cli, Commands};
use taskbot::core::{config, init_logger, log_startup_configuration};
use taskbot::storage::{create_pool, db::reset_schema, get_connection};
use taskbot::telegram::{create_bot, schema, setup_bot_commands, Bot, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::InitDb { force }) => init_db(force),
        Some(Commands::Run { webhook }) => run_bot(webhook).await,
        None => run_bot(false).await,
    }
}

fn init_db(force: bool) -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    if force {
        let mut conn = get_connection(&pool)?;
        reset_schema(&mut conn)?;
    }
    log::info!("Database ready at {}", *config::DATABASE_PATH);
    Ok(())
}

/// `getMe` with retries while the Bot API is unreachable.
async fn fetch_me(bot: &Bot) -> Result<Me> {
    let mut attempt = 0;
    loop {
        match bot.get_me().await {
            Ok(me) => return Ok(me),
            Err(e) => {
                attempt += 1;
                let retryable = matches!(e, teloxide::RequestError::Network(_) | teloxide::RequestError::Io(_));
                if !retryable || attempt >= config::retry::STARTUP_MAX_RETRIES {
                    return Err(anyhow::anyhow!("Failed to connect to Bot API after {} attempts: {}", attempt, e));
                }
                log::warn!(
                    "Bot API not ready (attempt {}/{}): {}",
                    attempt,
                    config::retry::STARTUP_MAX_RETRIES,
                    e
                );
                sleep(config::retry::startup_delay()).await;
            }
        }
    }
}

async fn run_bot(use_webhook: bool) -> Result<()> {
    let bot_init_start = std::time::Instant::now();
    log::info!("Starting bot...");
    log_startup_configuration();

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    let bot = create_bot()?;
    let me = fetch_me(&bot).await?;
    log::info!("Bot username: {:?}, Bot ID: {}", me.username, me.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let handler_deps = HandlerDeps::new(db_pool, *config::MODE);
    let handler = schema(handler_deps);

    if use_webhook {
        let raw = config::webhook::URL
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--webhook needs WEBHOOK_URL"))?;
        let url = config::webhook::full_url(&raw)?;
        let addr: SocketAddr = format!("{}:{}", *config::webhook::HOST, *config::webhook::PORT).parse()?;
        log::info!("Starting bot in webhook mode at {} (listening on {})", url, addr);

        let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, url)).await?;
        log::info!("Bot initialization complete in {:.2}s", bot_init_start.elapsed().as_secs_f64());

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![me])
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("An error from the webhook listener"))
            .await;
        return Ok(());
    }

    log::info!("Starting bot in long polling mode");
    log::info!("Bot initialization complete in {:.2}s", bot_init_start.elapsed().as_secs_f64());

    // Run the dispatcher with retry logic
    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();
        let me_clone = me.clone();

        // A panicking dispatcher surfaces through the JoinHandle
        let handle = tokio::spawn(async move {
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(dptree::deps![me_clone])
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= config::retry::MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                exponential_backoff(retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }

        sleep(config::retry::dispatcher_delay()).await;
    }

    Ok(())
}

async fn exponential_backoff(retry_count: u32) {
    let delay = Duration::from_secs(config::retry::EXPONENTIAL_BACKOFF_BASE.pow(retry_count));
    sleep(delay).await;
}
