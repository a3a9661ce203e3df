//! Request and result types of the translation pipeline.

use crate::error::TranslateError;
use crate::i18n::Language;
use crate::purity::PurityScore;
use crate::terminology::LegalDomain;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A validated, immutable translation request.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    id: Uuid,
    source_text: String,
    source_language: Language,
    target_language: Language,
    domain_hint: Option<LegalDomain>,
}

impl TranslationRequest {
    /// Validate and build a request.
    ///
    /// Fails with `InvalidInput` for blank text, unknown or disabled language
    /// codes and for a pair whose two sides are the same language.
    pub fn new(
        source_text: impl Into<String>,
        source_code: &str,
        target_code: &str,
        domain_hint: Option<LegalDomain>,
    ) -> Result<Self, TranslateError> {
        let source_text = source_text.into();
        if source_text.trim().is_empty() {
            return Err(TranslateError::InvalidInput("empty source text".into()));
        }
        let source_language = Language::from_code(source_code)
            .map_err(|e| TranslateError::InvalidInput(e.to_string()))?;
        let target_language = Language::from_code(target_code)
            .map_err(|e| TranslateError::InvalidInput(e.to_string()))?;
        if source_language == target_language {
            return Err(TranslateError::InvalidInput(format!(
                "unsupported language pair {} -> {}",
                source_language, target_language
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            source_text,
            source_language,
            target_language,
            domain_hint,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn source_language(&self) -> Language {
        self.source_language
    }

    pub fn target_language(&self) -> Language {
        self.target_language
    }

    pub fn domain_hint(&self) -> Option<LegalDomain> {
        self.domain_hint
    }
}

/// How a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslationMethod {
    Primary,
    Fallback,
    CacheHit,
}

/// The only artifact handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub text: String,
    pub method: TranslationMethod,
    pub purity: PurityScore,
    pub quality_score: f64,
}

impl TranslationResult {
    /// Same result, re-labelled as served from the cache.
    pub fn as_cache_hit(&self) -> Self {
        Self {
            method: TranslationMethod::CacheHit,
            ..self.clone()
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.method == TranslationMethod::Fallback
    }
}
