//! Conversation flows: per-user state and reply validation

pub mod input;
pub mod state;

pub use input::{normalize_username, parse_date, validate_description, validate_title, InputError};
pub use state::{FlowKey, FlowState, FlowStore};
