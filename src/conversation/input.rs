//! Validation of free-text replies.

use chrono::NaiveDate;
use lazy_regex::regex_is_match;
use thiserror::Error;

use crate::core::config::menu::{DATE_INPUT_FORMAT, MAX_TITLE_LEN, MAX_USERNAME_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("input is empty")]
    Empty,
    #[error("input is longer than {max} characters")]
    TooLong { max: usize },
    #[error("date must look like YYYY-MM-DD")]
    InvalidDate,
    #[error("username may only contain letters, digits and underscores")]
    InvalidUsername,
}

impl InputError {
    /// Localization key of the message shown to the user.
    pub fn i18n_key(&self) -> &'static str {
        match self {
            InputError::Empty => "input-empty",
            InputError::TooLong { .. } => "input-too-long",
            InputError::InvalidDate => "input-invalid-date",
            InputError::InvalidUsername => "input-invalid-username",
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(text.trim(), DATE_INPUT_FORMAT).map_err(|_| InputError::InvalidDate)
}

/// Strips a leading `@` and checks the Telegram username rules.
pub fn normalize_username(text: &str) -> Result<String, InputError> {
    let name = text.trim();
    let name = name.strip_prefix('@').unwrap_or(name);
    if name.is_empty() {
        return Err(InputError::Empty);
    }
    if name.chars().count() > MAX_USERNAME_LEN {
        return Err(InputError::TooLong { max: MAX_USERNAME_LEN });
    }
    if !regex_is_match!(r"^[A-Za-z0-9_]+$", name) {
        return Err(InputError::InvalidUsername);
    }
    Ok(name.to_string())
}

pub fn validate_title(text: &str) -> Result<String, InputError> {
    let title = text.trim();
    if title.is_empty() {
        return Err(InputError::Empty);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(InputError::TooLong { max: MAX_TITLE_LEN });
    }
    Ok(title.to_string())
}

pub fn validate_description(text: &str) -> Result<String, InputError> {
    let description = text.trim();
    if description.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(description.to_string())
}
