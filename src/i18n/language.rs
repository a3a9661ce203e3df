//! `Language`: a copyable handle that can only name a registered, enabled
//! language.

use crate::i18n::{dominant_script, LanguageConfig, LanguageRegistry, Script};
use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Constructed through `from_code`, `detect` or the constants, so the code
/// always resolves in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language {
    code: &'static str,
}

impl Language {
    /// English, written in Latin script.
    pub const ENGLISH: Language = Language { code: "en" };

    /// Arabic, written in Arabic script.
    pub const ARABIC: Language = Language { code: "ar" };

    /// Fails for unknown codes and for registered but disabled languages.
    pub fn from_code(code: &str) -> Result<Language> {
        let registry = LanguageRegistry::get();

        match registry.get_by_code(code) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => bail!("Language '{}' is not enabled", code),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    /// Guess the language of `text` from its dominant script.
    ///
    /// Returns `None` when the text has no letters or its dominant script
    /// belongs to no enabled language.
    pub fn detect(text: &str) -> Option<Language> {
        let script = dominant_script(text)?;
        LanguageRegistry::get()
            .get_by_script(script)
            .map(|config| Language { code: config.code })
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Registry entry for this language.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("constructed languages are registered")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    /// Script that output in this language must be written in.
    pub fn script(&self) -> Script {
        self.config().script
    }

    /// Built-in function words of this language.
    pub fn function_words(&self) -> &'static [&'static str] {
        self.config().function_words
    }

    /// All other enabled languages, i.e. the ones whose fragments count as
    /// contamination when `self` is the target.
    pub fn counterparts(&self) -> Vec<Language> {
        LanguageRegistry::get()
            .list_enabled()
            .into_iter()
            .filter(|config| config.code != self.code)
            .map(|config| Language { code: config.code })
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Language::from_code(&code).map_err(serde::de::Error::custom)
    }
}
