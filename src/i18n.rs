use std::borrow::Cow;
use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("en", "English"), ("fa", "فارسی")];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "en".parse().unwrap_or_default());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    match is_language_supported(code) {
        Some(supported) => supported.parse().unwrap_or_else(|_| DEFAULT_LANG.clone()),
        None => DEFAULT_LANG.clone(),
    }
}

/// Language for a Telegram user, taken from the client's `language_code`.
pub fn lang_for_user(user: Option<&teloxide::types::User>) -> LanguageIdentifier {
    user.and_then(|u| u.language_code.as_deref())
        .map(lang_from_code)
        .unwrap_or_else(|| DEFAULT_LANG.clone())
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    let text = LOCALES
        .try_lookup(lang, key)
        .or_else(|| LOCALES.try_lookup(&DEFAULT_LANG, key))
        .unwrap_or_else(|| key.to_string());
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<Cow<'static, str>, FluentValue> =
        args.iter().map(|(k, v)| (k.to_string().into(), v.clone())).collect();

    let text = LOCALES
        .try_lookup_with_args(lang, key, &args_map)
        .or_else(|| LOCALES.try_lookup_with_args(&DEFAULT_LANG, key, &args_map))
        .unwrap_or_else(|| key.to_string());
    text.replace("\\n", "\n")
}

/// Shorthand for messages with a single argument.
pub fn t_with(lang: &LanguageIdentifier, key: &str, name: &'static str, value: impl ToString) -> String {
    let mut args = FluentArgs::new();
    args.set(name, value.to_string());
    t_args(lang, key, &args)
}

/// Checks if a language code is supported by the bot.
/// Returns the normalized language code if supported, None otherwise.
pub fn is_language_supported(code: &str) -> Option<&'static str> {
    // "fa-IR" -> "fa"
    let normalized = code.split(['-', '_']).next().unwrap_or(code).to_lowercase();

    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&normalized))
        .map(|(c, _)| *c)
}

/// True if `text` equals the translation of `key` in any supported language.
///
/// Reply-keyboard buttons come back as plain text, so a label sent from a
/// Persian client must still match when the sender's locale changed.
pub fn matches_any_lang(text: &str, key: &str) -> bool {
    SUPPORTED_LANGS
        .iter()
        .any(|(code, _)| t(&lang_from_code(code), key) == text.trim())
}
