//! Logging initialization and startup diagnostics

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let log_config = ConfigBuilder::new()
        .add_filter_allow_str("taskbot")
        .add_filter_allow_str("teloxide")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            log_config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, log_config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup. Secrets are never printed.
pub fn log_startup_configuration() {
    log::info!("Mode: {}", *config::MODE);
    log::info!("Database: {}", *config::DATABASE_PATH);
    match config::PROXY_URL.as_deref() {
        Some(_) => log::info!("Proxy: enabled"),
        None => log::info!("Proxy: disabled"),
    }
    if let Some(url) = config::bot_api::get_url() {
        log::info!("Bot API: {} (local: {})", url, config::bot_api::is_local_url(&url));
    }
    if config::BOT_TOKEN.is_empty() {
        log::warn!("BOT_TOKEN is not set, Bot API calls will fail");
    }
}
