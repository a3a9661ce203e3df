//! Error taxonomy.
//!
//! Only [`TranslateError`] ever reaches a caller of the gateway. Engine errors
//! are converted into fallback generation and feedback errors stay inside the
//! improvement loop.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors a caller of `TranslationGateway::translate` can observe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// Empty text or an unsupported language pair. Returned before the
    /// engine is touched.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller cancelled the request.
    #[error("translation cancelled by caller")]
    Cancelled,
}

/// Failures of the external engine. Never surfaced to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed engine response: {0}")]
    Malformed(String),

    #[error("engine call cancelled")]
    Cancelled,
}

impl EngineError {
    /// 429 and 5xx responses and transport failures are worth one more try.
    /// Other 4xx responses, malformed bodies, timeouts and cancellations are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Api { status, .. } => *status == 429 || *status >= 500,
            EngineError::Unavailable(_) => true,
            EngineError::Timeout(_) | EngineError::Malformed(_) | EngineError::Cancelled => false,
        }
    }
}

/// Errors inside the feedback and improvement loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeedbackError {
    #[error("unknown feedback report {0}")]
    UnknownReport(Uuid),

    #[error("unknown enhancement {0}")]
    UnknownEnhancement(Uuid),

    /// A dry run found previously passing samples that the enhancement breaks.
    #[error("enhancement {enhancement} blocked: {regressions} held-out sample(s) regressed")]
    EnhancementRegressionDetected { enhancement: Uuid, regressions: usize },

    #[error("invalid investigation transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("enhancement {0} is not deployed")]
    NotDeployed(Uuid),

    /// Another snapshot was published between reading and publishing.
    #[error("rule set changed underneath (expected version {expected}, found {found})")]
    StaleRuleSet { expected: u64, found: u64 },

    #[error(transparent)]
    Terminology(#[from] TerminologyError),
}

/// A terminology entry that cannot be stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerminologyError {
    #[error("invalid terminology entry: {0}")]
    InvalidEntry(String),
}

/// Errors reading the terminology reference dataset at startup.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read reference dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse reference dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid dataset entry {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_retryable_statuses() {
        let err = |status| EngineError::Api {
            status,
            body: String::new(),
        };
        assert!(err(500).is_retryable());
        assert!(err(503).is_retryable());
        assert!(err(429).is_retryable());
        assert!(!err(400).is_retryable());
        assert!(!err(401).is_retryable());
        assert!(!err(403).is_retryable());
    }

    #[test]
    fn test_engine_error_non_http_retryability() {
        assert!(EngineError::Unavailable("connection refused".into()).is_retryable());
        assert!(!EngineError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!EngineError::Malformed("no choices".into()).is_retryable());
        assert!(!EngineError::Cancelled.is_retryable());
    }

    #[test]
    fn test_translate_error_display() {
        let err = TranslateError::InvalidInput("empty source text".into());
        assert_eq!(err.to_string(), "invalid input: empty source text");
    }

    #[test]
    fn test_regression_error_display() {
        let id = Uuid::nil();
        let err = FeedbackError::EnhancementRegressionDetected {
            enhancement: id,
            regressions: 3,
        };
        assert!(err.to_string().contains("3 held-out sample(s) regressed"));
    }
}
