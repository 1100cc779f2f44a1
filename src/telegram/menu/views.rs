//! Message texts for task cards and listings.

use chrono::NaiveDateTime;
use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;

use crate::i18n;
use crate::storage::{Task, User};

/// `YYYY-MM-DD`, or the localized "not set".
pub fn format_date(lang: &LanguageIdentifier, date: Option<NaiveDateTime>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => i18n::t(lang, "task-date-not-set"),
    }
}

pub fn task_card_text(lang: &LanguageIdentifier, task: &Task, admin_username: Option<&str>) -> String {
    let description = task
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| i18n::t(lang, "task-no-description"));
    let admin = admin_username
        .map(str::to_string)
        .unwrap_or_else(|| i18n::t(lang, "task-unknown-admin"));

    let mut args = FluentArgs::new();
    args.set("title", task.title.clone());
    args.set("admin", admin);
    args.set("description", description);
    args.set("start", format_date(lang, task.start_date));
    args.set("end", format_date(lang, task.end_date));
    args.set("status", i18n::t(lang, task.status.i18n_key()));
    i18n::t_args(lang, "task-card", &args)
}

/// Creator and assignees of a task.
pub fn task_users_text(lang: &LanguageIdentifier, task: &Task, admin_username: Option<&str>, users: &[User]) -> String {
    let mut args = FluentArgs::new();
    args.set("title", task.title.clone());
    args.set(
        "admin",
        admin_username
            .map(str::to_string)
            .unwrap_or_else(|| i18n::t(lang, "task-unknown-admin")),
    );
    let mut text = i18n::t_args(lang, "task-users-title", &args);

    if users.is_empty() {
        text.push('\n');
        text.push_str(&i18n::t(lang, "task-users-none"));
    } else {
        for user in users {
            text.push_str(&format!("\n• @{}", user.username));
        }
    }
    text
}

/// Listing header with a task count.
pub fn counted_title(lang: &LanguageIdentifier, key: &str, count: usize) -> String {
    let mut args = FluentArgs::new();
    args.set("count", count.to_string());
    i18n::t_args(lang, key, &args)
}

/// Prompt text followed by the `/cancel` hint.
pub fn prompt_text(lang: &LanguageIdentifier, key: &str, title: &str) -> String {
    format!(
        "{}\n\n{}",
        i18n::t_with(lang, key, "title", title),
        i18n::t(lang, "prompt-cancel-hint")
    )
}
