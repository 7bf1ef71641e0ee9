//! Internationalization (i18n) module for CoDraw.
//!
//! UI strings live in embedded `key=value` files under `locales/`.  The
//! `t!("key")` macro looks up the current language, falling back to English
//! and finally to the key itself, so lookups work even before `init()`.

use std::collections::HashMap;
use std::sync::Mutex;

static I18N: Mutex<Option<I18nState>> = Mutex::new(None);

struct I18nState {
    current_lang: String,
    /// lang_code → (key → translated_string)
    translations: HashMap<String, HashMap<String, String>>,
}

/// Supported languages: (code, native_name)
pub const LANGUAGES: &[(&str, &str)] = &[("en", "English"), ("es", "Español")];

/// Load the embedded translation tables. Call once at startup.
pub fn init() {
    let mut translations = HashMap::new();
    translations.insert(
        "en".to_string(),
        parse_translations(include_str!("../locales/en.txt")),
    );
    translations.insert(
        "es".to_string(),
        parse_translations(include_str!("../locales/es.txt")),
    );

    if let Ok(mut guard) = I18N.lock() {
        *guard = Some(I18nState {
            current_lang: "en".to_string(),
            translations,
        });
    }
}

/// Set the active language. Unknown codes fall back to "en".
pub fn set_language(code: &str) {
    if let Ok(mut guard) = I18N.lock()
        && let Some(ref mut state) = *guard
    {
        state.current_lang = if state.translations.contains_key(code) {
            code.to_string()
        } else {
            "en".to_string()
        };
    }
}

pub fn current_language() -> String {
    if let Ok(guard) = I18N.lock()
        && let Some(ref state) = *guard
    {
        return state.current_lang.clone();
    }
    "en".to_string()
}

/// Look up a translation key: current language, then English, then the key.
pub fn translate(key: &str) -> String {
    if let Ok(guard) = I18N.lock()
        && let Some(ref state) = *guard
    {
        if let Some(val) = state
            .translations
            .get(&state.current_lang)
            .and_then(|map| map.get(key))
        {
            return val.clone();
        }
        if let Some(val) = state.translations.get("en").and_then(|map| map.get(key)) {
            return val.clone();
        }
    }
    key.to_string()
}

/// Pick a supported language from `LANG` / `LC_ALL` style variables.
pub fn detect_system_language() -> String {
    for var in ["LC_ALL", "LC_MESSAGES", "LANG", "LANGUAGE"] {
        if let Ok(val) = std::env::var(var)
            && let Some(lang) = match_system_locale(&val)
        {
            return lang;
        }
    }
    "en".to_string()
}

/// Match a locale string such as "es_ES.UTF-8" to a supported language code.
fn match_system_locale(locale: &str) -> Option<String> {
    let normalized = locale.to_lowercase().replace('_', "-");
    let lang_part = normalized.split(['.', '@']).next().unwrap_or(&normalized);
    let primary = lang_part.split('-').next().unwrap_or(lang_part);
    LANGUAGES
        .iter()
        .find(|(code, _)| *code == primary)
        .map(|(code, _)| code.to_string())
}

/// Parse a `key=value` translation file. `#` starts a comment line.
fn parse_translations(data: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            map.insert(key.trim().to_string(), val.trim().to_string());
        }
    }
    map
}

/// Translation macro. Usage: `t!("toolbar.undo")` or `t!("toolbar.size", size = 5)`
#[macro_export]
macro_rules! t {
    ($key:expr) => {
        $crate::i18n::translate($key)
    };
    ($key:expr, $($name:ident = $val:expr),+ $(,)?) => {{
        let mut s = $crate::i18n::translate($key);
        $(
            s = s.replace(concat!("{", stringify!($name), "}"), &format!("{}", $val));
        )+
        s
    }};
}
