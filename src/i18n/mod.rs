use std::collections::HashMap;

use crate::util::fill_placeholders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Chinese,
}

pub const SUPPORTED_LANGUAGES: [Language; 2] = [Language::English, Language::Chinese];

impl Language {
    pub const fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Chinese => "中文",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        SUPPORTED_LANGUAGES
            .into_iter()
            .find(|language| language.code() == code)
    }
}

const LOCALE_LANGUAGE_CODES: [(&[&str], Language); 2] = [
    (&["zh", "zho", "chi"], Language::Chinese),
    (&["en", "eng"], Language::English),
];

fn parse_locale_token(token: &str) -> Option<Language> {
    let normalized = token
        .split(|c| matches!(c, '.' | '@'))
        .next()
        .unwrap_or(token)
        .replace('-', "_")
        .to_ascii_lowercase();
    let language_code = normalized.split('_').next().unwrap_or(&normalized);

    LOCALE_LANGUAGE_CODES.iter().find_map(|(codes, language)| {
        codes
            .iter()
            .any(|code| *code == language_code)
            .then_some(*language)
    })
}

pub fn detect_system_language() -> Language {
    for var in ["LC_ALL", "LANGUAGE", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            for token in value.split(':') {
                if let Some(language) = parse_locale_token(token) {
                    return language;
                }
            }
        }
    }

    Language::English
}

/// Key → string tables for every loaded language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations {
    tables: HashMap<Language, HashMap<String, String>>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, language: Language, table: HashMap<String, String>) {
        self.tables.insert(language, table);
    }

    /// Minimal strings used when the locale files cannot be loaded.
    pub fn fallback() -> Self {
        let mut translations = Self::new();
        translations.insert(
            Language::English,
            table(&[
                ("app_title", "OukaroManager"),
                ("loading", "Loading..."),
                ("error", "Error occurred"),
            ]),
        );
        translations.insert(
            Language::Chinese,
            table(&[
                ("app_title", "OukaroManager"),
                ("loading", "加载中..."),
                ("error", "发生错误"),
            ]),
        );
        translations
    }

    pub fn supports(&self, language: Language) -> bool {
        self.tables.contains_key(&language)
    }

    /// Look a key up in `language`, then English, then echo the key.
    pub fn lookup(&self, language: Language, key: &str) -> String {
        self.tables
            .get(&language)
            .and_then(|table| table.get(key))
            .filter(|value| !value.is_empty())
            .or_else(|| {
                self.tables
                    .get(&Language::English)
                    .and_then(|table| table.get(key))
                    .filter(|value| !value.is_empty())
            })
            .cloned()
            .unwrap_or_else(|| key.to_owned())
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// Choose the startup language from the saved preference or the system locale.
pub fn resolve_startup_language(
    saved: Option<&str>,
    translations: &Translations,
    system: Language,
) -> Language {
    if let Some(language) = saved.and_then(Language::from_code)
        && translations.supports(language)
    {
        return language;
    }
    if system == Language::Chinese {
        Language::Chinese
    } else {
        Language::English
    }
}

/// A translatable piece of text, rendered against the active language on every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: String,
    pub args: Vec<(String, String)>,
}

impl Message {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, name: &str, value: impl ToString) -> Self {
        self.args.push((name.to_owned(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct I18n<'a> {
    translations: &'a Translations,
    language: Language,
}

impl<'a> I18n<'a> {
    #[must_use]
    pub const fn new(translations: &'a Translations, language: Language) -> Self {
        Self {
            translations,
            language,
        }
    }

    pub fn t(self, key: &str) -> String {
        self.translations.lookup(self.language, key)
    }

    pub fn render(self, message: &Message) -> String {
        fill_placeholders(&self.t(&message.key), &message.args)
    }

    pub fn window_title(self) -> String {
        format!("{} - System App Converter", self.t("app_title"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Translations {
        let mut translations = Translations::new();
        translations.insert(
            Language::English,
            table(&[("revert", "Revert"), ("only_en", "English only")]),
        );
        translations.insert(Language::Chinese, table(&[("revert", "还原")]));
        translations
    }

    #[test]
    fn cascades_to_english_then_key() {
        let translations = sample();
        assert_eq!(translations.lookup(Language::Chinese, "revert"), "还原");
        assert_eq!(
            translations.lookup(Language::Chinese, "only_en"),
            "English only"
        );
        assert_eq!(
            translations.lookup(Language::Chinese, "missing_key"),
            "missing_key"
        );
    }

    #[test]
    fn renders_messages_with_placeholders() {
        let mut translations = Translations::new();
        translations.insert(
            Language::English,
            table(&[("app_reverted", "{app} has been reverted")]),
        );
        let i18n = I18n::new(&translations, Language::English);
        let message = Message::new("app_reverted").arg("app", "Maps");
        assert_eq!(i18n.render(&message), "Maps has been reverted");
    }

    #[test]
    fn parses_supported_languages_from_locale_tokens() {
        let samples = [
            ("en_US.UTF-8", Language::English),
            ("zh-Hans", Language::Chinese),
            ("zh_CN.UTF-8", Language::Chinese),
            ("eng_US", Language::English),
        ];

        for (token, expected) in samples {
            assert_eq!(parse_locale_token(token), Some(expected));
        }
        assert_eq!(parse_locale_token("pl_PL"), None);
    }

    #[test]
    fn startup_language_prefers_saved_choice() {
        let translations = Translations::fallback();
        assert_eq!(
            resolve_startup_language(Some("zh"), &translations, Language::English),
            Language::Chinese
        );
        assert_eq!(
            resolve_startup_language(Some("fr"), &translations, Language::Chinese),
            Language::Chinese
        );
        assert_eq!(
            resolve_startup_language(None, &translations, Language::English),
            Language::English
        );
    }

    #[test]
    fn only_known_codes_parse() {
        assert_eq!(Language::from_code("en"), Some(Language::English));
        assert_eq!(Language::from_code("zh"), Some(Language::Chinese));
        assert_eq!(Language::from_code("de"), None);
    }
}
