//! UI translations.
//!
//! Translation tables are embedded `key=value` files parsed on first use.
//! `t!("key")` looks the key up in the current language, then English, then
//! returns the key itself.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

type Table = HashMap<&'static str, &'static str>;

/// Supported languages: (code, native_name)
pub const LANGUAGES: &[(&str, &str)] = &[("en", "English"), ("zh-CN", "中文(简体)")];

static CATALOG: OnceLock<HashMap<&'static str, Table>> = OnceLock::new();
static CURRENT: RwLock<&'static str> = RwLock::new("en");

fn catalog() -> &'static HashMap<&'static str, Table> {
    CATALOG.get_or_init(|| {
        HashMap::from([
            ("en", parse_translations(include_str!("../locales/en.txt"))),
            ("zh-CN", parse_translations(include_str!("../locales/zh-CN.txt"))),
        ])
    })
}

/// Set the active language. Unknown codes fall back to English.
pub fn set_language(code: &str) {
    let code = LANGUAGES
        .iter()
        .map(|(c, _)| *c)
        .find(|c| *c == code)
        .unwrap_or("en");
    if let Ok(mut current) = CURRENT.write() {
        *current = code;
    }
}

/// Pick the language from a saved setting, auto-detecting when empty.
pub fn apply_language_setting(code: &str) {
    if code.is_empty() {
        set_language(&detect_system_language());
    } else {
        set_language(code);
    }
}

pub fn current_language() -> &'static str {
    CURRENT.read().map(|c| *c).unwrap_or("en")
}

pub fn translate(key: &str) -> String {
    let catalog = catalog();
    let lang = current_language();
    [lang, "en"]
        .iter()
        .find_map(|l| catalog.get(l).and_then(|table| table.get(key)))
        .map_or_else(|| key.to_string(), |v| v.replace("\\n", "\n"))
}

/// Best supported match for the `LANG`-style environment variables.
pub fn detect_system_language() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG", "LANGUAGE"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|val| match_system_locale(&val))
        .unwrap_or_else(|| "en".to_string())
}

/// Map a locale string ("zh_CN.UTF-8", "en-US", "zh") to a supported code.
fn match_system_locale(locale: &str) -> Option<String> {
    let normalized = locale.to_lowercase().replace('_', "-");
    let tag = normalized.split(['.', '@']).next().unwrap_or_default();
    if tag.is_empty() || tag == "c" || tag == "posix" {
        return None;
    }
    let primary = tag.split('-').next().unwrap_or(tag);
    LANGUAGES
        .iter()
        .find(|(code, _)| code.to_lowercase() == tag)
        .or_else(|| {
            LANGUAGES
                .iter()
                .find(|(code, _)| code.split('-').next() == Some(primary))
        })
        .map(|(code, _)| code.to_string())
}

/// One `key=value` per line; `#` starts a comment line. `\n` in a value
/// becomes a line break at lookup.
fn parse_translations(data: &'static str) -> Table {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

/// Translation macro. Usage: `t!("menu.file")` or `t!("status.selected", x = 1, y = 2)`
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_matching() {
        assert_eq!(match_system_locale("zh_CN.UTF-8").as_deref(), Some("zh-CN"));
        assert_eq!(match_system_locale("zh_TW").as_deref(), Some("zh-CN"));
        assert_eq!(match_system_locale("en_GB.UTF-8").as_deref(), Some("en"));
        assert_eq!(match_system_locale("C"), None);
        assert_eq!(match_system_locale("fr_FR"), None);
    }

    #[test]
    fn every_english_key_has_a_chinese_entry() {
        let catalog = catalog();
        let en = &catalog["en"];
        let zh = &catalog["zh-CN"];
        let missing: Vec<_> = en.keys().filter(|k| !zh.contains_key(*k)).collect();
        assert!(missing.is_empty(), "missing zh-CN keys: {missing:?}");
    }

    #[test]
    fn unknown_keys_echo_back() {
        assert_eq!(translate("no.such.key"), "no.such.key");
    }

    #[test]
    fn placeholders_are_substituted() {
        let s = t!("status.selected", x = 3, y = 4, hex = "#FFFFFF");
        assert!(s.contains('3') && s.contains('4') && s.contains("#FFFFFF"));
    }

    #[test]
    fn escaped_newlines_become_line_breaks() {
        let s = t!("dialog.missing_source.body", path = "a.png");
        assert!(s.contains("\na.png\n"));
        assert!(!s.contains("\\n"));
    }
}
