//! Terminology records.

use crate::error::TerminologyError;
use crate::i18n::{Language, ScriptCounts};
use crate::purity::RuleOrigin;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Area of law a term or a fallback paragraph belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalDomain {
    Family,
    Contract,
    Procedure,
    Criminal,
    Labor,
    Property,
    Commercial,
    General,
}

impl LegalDomain {
    pub const ALL: [LegalDomain; 8] = [
        LegalDomain::Family,
        LegalDomain::Contract,
        LegalDomain::Procedure,
        LegalDomain::Criminal,
        LegalDomain::Labor,
        LegalDomain::Property,
        LegalDomain::Commercial,
        LegalDomain::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LegalDomain::Family => "family",
            LegalDomain::Contract => "contract",
            LegalDomain::Procedure => "procedure",
            LegalDomain::Criminal => "criminal",
            LegalDomain::Labor => "labor",
            LegalDomain::Property => "property",
            LegalDomain::Commercial => "commercial",
            LegalDomain::General => "general",
        }
    }

    pub fn from_name(name: &str) -> Option<LegalDomain> {
        let name = name.trim().to_lowercase();
        LegalDomain::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for LegalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source term and its translation for one language pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyEntry {
    pub source_term: String,
    pub target_term: String,
    pub domain: LegalDomain,
    pub source_language: Language,
    pub target_language: Language,
}

impl TerminologyEntry {
    pub fn new(
        source_term: impl Into<String>,
        target_term: impl Into<String>,
        domain: LegalDomain,
        source_language: Language,
        target_language: Language,
    ) -> Self {
        Self {
            source_term: source_term.into(),
            target_term: target_term.into(),
            domain,
            source_language,
            target_language,
        }
    }

    /// Terms must be non-empty, the pair must differ and the target term must
    /// be written purely in the target script.
    pub fn validate(&self) -> Result<(), TerminologyError> {
        if self.source_term.trim().is_empty() || self.target_term.trim().is_empty() {
            return Err(TerminologyError::InvalidEntry("empty term".into()));
        }
        if self.source_language == self.target_language {
            return Err(TerminologyError::InvalidEntry(format!(
                "source and target are both '{}'",
                self.source_language
            )));
        }
        let counts = ScriptCounts::tally(&self.target_term, self.target_language.script());
        if counts.target_letters == 0 || counts.foreign_letters > 0 || counts.other > 0 {
            return Err(TerminologyError::InvalidEntry(format!(
                "target term '{}' is not written in {:?} script",
                self.target_term,
                self.target_language.script()
            )));
        }
        Ok(())
    }
}

/// An entry as stored: entries are appended, never replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedEntry {
    pub entry: TerminologyEntry,
    /// Dictionary version that introduced this record
    pub version: u64,
    pub origin: RuleOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_names_round_trip() {
        for domain in LegalDomain::ALL {
            assert_eq!(LegalDomain::from_name(domain.as_str()), Some(domain));
        }
        assert_eq!(LegalDomain::from_name(" Family "), Some(LegalDomain::Family));
        assert_eq!(LegalDomain::from_name("maritime"), None);
    }

    #[test]
    fn test_validate_accepts_pure_target() {
        let entry = TerminologyEntry::new(
            "court of appeal",
            "محكمة الاستئناف",
            LegalDomain::Procedure,
            Language::ENGLISH,
            Language::ARABIC,
        );
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_mixed_target() {
        let entry = TerminologyEntry::new(
            "court",
            "محكمة court",
            LegalDomain::Procedure,
            Language::ENGLISH,
            Language::ARABIC,
        );
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_pair_and_empty_terms() {
        let same = TerminologyEntry::new(
            "court",
            "tribunal",
            LegalDomain::General,
            Language::ENGLISH,
            Language::ENGLISH,
        );
        assert!(same.validate().is_err());

        let empty = TerminologyEntry::new(
            "  ",
            "محكمة",
            LegalDomain::General,
            Language::ENGLISH,
            Language::ARABIC,
        );
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_entry_json_shape() {
        let json = r#"{"source_term":"divorce","target_term":"طلاق","domain":"family",
                       "source_language":"en","target_language":"ar"}"#;
        let entry: TerminologyEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.domain, LegalDomain::Family);
        assert_eq!(entry.target_language, Language::ARABIC);
    }
}
