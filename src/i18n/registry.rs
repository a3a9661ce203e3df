//! Static table of the languages the gateway translates between.
//!
//! Built once behind a `OnceLock` and read-only afterwards. Detection rules,
//! fallback paragraphs and request validation all key off these entries.

use crate::i18n::Script;
use std::sync::OnceLock;

/// One supported language: its code, names, the script its output must be
/// written in, and the function words that betray it inside the other language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 code
    pub code: &'static str,

    pub name: &'static str,
    pub native_name: &'static str,

    /// Script every character of output in this language must belong to
    pub script: Script,

    /// Function words used by mixed-script detection when this language is
    /// *not* the target. Compared case-insensitively.
    pub function_words: &'static [&'static str],

    /// Disabled languages are rejected at request validation
    pub enabled: bool,
}

pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Lookup by code, enabled or not.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// The enabled language written in `script`.
    pub fn get_by_script(&self, script: Script) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.enabled && lang.script == script)
    }

    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }
}

const ENGLISH_FUNCTION_WORDS: &[&str] = &[
    "the", "of", "and", "to", "in", "for", "is", "with", "by", "on", "or", "from", "this",
    "that", "shall", "which", "be", "an", "as", "at", "are", "not",
];

const ARABIC_FUNCTION_WORDS: &[&str] = &[
    "في", "من", "على", "إلى", "عن", "مع", "هذا", "هذه", "التي", "الذي", "أو", "أن", "إن", "ثم",
    "قد", "لا", "ما", "كل", "بين", "عند",
];

/// Default language configurations: English (Latin script) and Arabic.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            script: Script::Latin,
            function_words: ENGLISH_FUNCTION_WORDS,
            enabled: true,
        },
        LanguageConfig {
            code: "ar",
            name: "Arabic",
            native_name: "العربية",
            script: Script::Arabic,
            function_words: ARABIC_FUNCTION_WORDS,
            enabled: true,
        },
    ]
}
