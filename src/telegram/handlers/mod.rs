//! Telegram bot handler tree configuration
//!
//! The same schema runs in production and in integration tests, which call
//! the public handler functions directly against a mocked Bot API.

mod commands;
mod schema;
mod text_input;
mod types;

pub use commands::{handle_command, handle_menu_button};
pub use schema::schema;
pub use text_input::handle_flow_reply;
pub use types::{admin_user, fallback_username, registered_user, HandlerDeps, HandlerError};
