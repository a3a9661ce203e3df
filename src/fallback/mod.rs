//! Fallback content generator.
//!
//! When a primary translation cannot be made pure, the caller still gets
//! usable text: a curated paragraph about the legal domain the source text
//! belongs to. The paragraph is informational. It does not carry over the
//! facts of the source text.

mod intents;
mod paragraphs;

pub use intents::{classify, score_domains, IntentMatch, MIN_INTENT_SCORE};
pub use paragraphs::{paragraph_for, DomainParagraphs, PARAGRAPHS};

use crate::i18n::Language;
use crate::purity::PurityValidator;
use crate::terminology::{LegalDomain, TerminologyStore};
use crate::translation::{TranslationMethod, TranslationResult};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Quality of a fallback result. Always below 0.5, the floor of a passing
/// primary translation.
pub fn fallback_quality(confidence: f64) -> f64 {
    0.30 + 0.19 * confidence.clamp(0.0, 1.0)
}

pub struct FallbackGenerator {
    terminology: Arc<TerminologyStore>,
    validator: Arc<PurityValidator>,
}

impl FallbackGenerator {
    pub fn new(terminology: Arc<TerminologyStore>, validator: Arc<PurityValidator>) -> Self {
        Self {
            terminology,
            validator,
        }
    }

    /// Legal domain of `source_text`. A hint always wins.
    pub fn classify(
        &self,
        source_text: &str,
        source: Language,
        target: Language,
        hint: Option<LegalDomain>,
    ) -> IntentMatch {
        if let Some(domain) = hint {
            return IntentMatch::from_hint(domain);
        }
        let hits = self.terminology.matching_entries(source_text, source, target);
        intents::classify(source_text, source, &hits)
    }

    pub fn generate(
        &self,
        source_text: &str,
        source: Language,
        target: Language,
        hint: Option<LegalDomain>,
    ) -> TranslationResult {
        let intent = self.classify(source_text, source, target, hint);
        let mut confidence = intent.confidence;
        let mut text = paragraph_for(intent.domain, target);

        if !self.validator.is_clean(text, target) {
            warn!(
                domain = %intent.domain,
                language = %target,
                "Curated paragraph failed validation, using the general paragraph"
            );
            confidence = 0.0;
            text = paragraph_for(LegalDomain::General, target);
        }

        let purity = self.validator.check(text, target);
        if !purity.passes {
            error!(language = %target, ?purity, "General fallback paragraph failed validation");
        }

        debug!(domain = %intent.domain, confidence, "Generated fallback content");
        TranslationResult {
            text: text.to_string(),
            method: TranslationMethod::Fallback,
            purity,
            quality_score: fallback_quality(confidence),
        }
    }

    /// Every curated paragraph with its language.
    pub fn curated_samples() -> Vec<(Language, &'static str)> {
        PARAGRAPHS
            .iter()
            .flat_map(|p| [(Language::ENGLISH, p.english), (Language::ARABIC, p.arabic)])
            .collect()
    }
}
