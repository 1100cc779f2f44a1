use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: taskbot.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "taskbot.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: taskbot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "taskbot.log".to_string()));

/// Optional HTTP(S)/SOCKS5 proxy for every Bot API request
pub static PROXY_URL: Lazy<Option<String>> =
    Lazy::new(|| env::var("PROXY_URL").ok().filter(|url| !url.trim().is_empty()));

/// Access mode of the bot.
///
/// `Dev` registers everyone who sends `/start` as an admin. `Prod` only
/// serves users that already exist in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    Dev,
    Prod,
}

impl Mode {
    /// Parses a mode name, falling back to `Prod` for anything unknown.
    pub fn parse(value: &str) -> Self {
        value.trim().parse().unwrap_or(Mode::Prod)
    }
}

/// Read from MODE environment variable ("dev" or "prod")
/// Default: prod
pub static MODE: Lazy<Mode> = Lazy::new(|| env::var("MODE").map(|v| Mode::parse(&v)).unwrap_or(Mode::Prod));

/// Webhook settings
pub mod webhook {
    use once_cell::sync::Lazy;
    use std::env;

    /// Path used when WEBHOOK_URL does not carry one
    pub const DEFAULT_PATH: &str = "/webhook";

    /// Public URL Telegram posts updates to
    /// Read from WEBHOOK_URL environment variable
    pub static URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

    /// Interface the webhook server binds to
    pub static HOST: Lazy<String> = Lazy::new(|| env::var("WEBAPP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()));

    /// Port the webhook server binds to
    pub static PORT: Lazy<u16> = Lazy::new(|| {
        env::var("WEBAPP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080)
    });

    /// Returns the webhook URL with the default path appended when it has none.
    pub fn full_url(raw: &str) -> Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(raw)?;
        if url.path() == "/" || url.path().is_empty() {
            url.set_path(DEFAULT_PATH);
        }
        Ok(url)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Dispatcher retry delay duration
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Base for exponential backoff calculation
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    /// How many times `getMe` is retried while the Bot API is unreachable
    pub const STARTUP_MAX_RETRIES: u32 = 12;

    /// Delay between startup `getMe` attempts
    pub fn startup_delay() -> Duration {
        Duration::from_secs(5)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Menu layout and input limits
pub mod menu {
    use super::Duration;

    /// Buttons per row in task and group grids
    pub const GRID_COLUMNS: usize = 2;

    /// Suggested users shown when adding a member to a task
    pub const MAX_SUGGESTED_USERS: usize = 8;

    /// Telegram usernames are at most 32 characters
    pub const MAX_USERNAME_LEN: usize = 32;

    pub const MAX_TITLE_LEN: usize = 255;

    /// Seconds before short-lived notices are removed
    pub const NOTICE_DELETE_DELAY_SECS: u64 = 3;

    pub fn notice_delete_delay() -> Duration {
        Duration::from_secs(NOTICE_DELETE_DELAY_SECS)
    }

    /// Date format accepted for start and end dates
    pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
}

/// Bot API server configuration utilities
pub mod bot_api {
    /// Returns the BOT_API_URL environment variable if set.
    pub fn get_url() -> Option<String> {
        std::env::var("BOT_API_URL").ok().filter(|url| !url.trim().is_empty())
    }

    /// Returns true if the given URL points to a self-hosted Bot API server.
    pub fn is_local_url(url: &str) -> bool {
        !url.contains("api.telegram.org")
    }
}
