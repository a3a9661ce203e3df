//! Purity validation module.
//!
//! This module scores a candidate string by the share of its visible
//! characters that belong to the target language's script, and decides
//! whether it may be delivered.

use crate::i18n::{Language, ScriptCounts};
use crate::purity::detector::PatternDetector;
use crate::purity::rules::{RuleSet, Severity};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// No configuration may lower the pass threshold below this.
pub const PURITY_FLOOR: f64 = 0.70;

/// Pass threshold when nothing else is configured.
pub const DEFAULT_THRESHOLD: f64 = 0.90;

/// Script-share breakdown of a candidate string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PurityScore {
    /// Target-script letters plus neutral characters over visible characters
    pub target_script_ratio: f64,

    /// Letters of any other known script over visible characters
    pub foreign_script_ratio: f64,

    /// Emoji, symbols and control characters over visible characters
    pub other_ratio: f64,

    /// Whether the string may be delivered
    pub passes: bool,
}

impl PurityScore {
    /// Score of a string with no visible characters.
    pub fn empty() -> Self {
        Self {
            target_script_ratio: 0.0,
            foreign_script_ratio: 0.0,
            other_ratio: 0.0,
            passes: false,
        }
    }
}

/// Validator for output purity.
pub struct PurityValidator {
    detector: Arc<PatternDetector>,
    /// f64 bits of the configured threshold
    threshold: AtomicU64,
}

impl PurityValidator {
    pub fn new(detector: Arc<PatternDetector>, threshold: f64) -> Self {
        Self {
            detector,
            threshold: AtomicU64::new(effective_threshold(threshold).to_bits()),
        }
    }

    /// Validate against an explicit threshold, clamped to the floor.
    pub fn validate(&self, text: &str, target: Language, threshold: f64) -> PurityScore {
        let rules = self.detector.snapshot();
        Self::score_with(&rules, text, target, threshold)
    }

    /// Validate against the configured threshold.
    pub fn check(&self, text: &str, target: Language) -> PurityScore {
        self.validate(text, target, self.threshold())
    }

    /// Score against a specific rule snapshot.
    ///
    /// A string passes when it contains at least one target-script letter,
    /// its target share reaches the effective threshold and no critical
    /// pattern remains.
    pub fn score_with(rules: &RuleSet, text: &str, target: Language, threshold: f64) -> PurityScore {
        let counts = ScriptCounts::tally(text, target.script());
        let visible = counts.visible();
        if visible == 0 {
            return PurityScore::empty();
        }

        let visible = visible as f64;
        let target_script_ratio = (counts.target_letters + counts.neutral) as f64 / visible;
        let foreign_script_ratio = counts.foreign_letters as f64 / visible;
        let other_ratio = counts.other as f64 / visible;

        let has_critical = rules
            .detect(text, target)
            .iter()
            .any(|p| p.severity == Severity::Critical);

        PurityScore {
            target_script_ratio,
            foreign_script_ratio,
            other_ratio,
            passes: counts.target_letters > 0
                && target_script_ratio >= effective_threshold(threshold)
                && !has_critical,
        }
    }

    /// Passes under the configured threshold and has no findings at all.
    pub fn is_clean(&self, text: &str, target: Language) -> bool {
        let rules = self.detector.snapshot();
        Self::is_clean_with(&rules, text, target, self.threshold())
    }

    /// [`is_clean`](Self::is_clean) against a specific snapshot and threshold.
    pub fn is_clean_with(rules: &RuleSet, text: &str, target: Language, threshold: f64) -> bool {
        Self::score_with(rules, text, target, threshold).passes && rules.detect(text, target).is_empty()
    }

    /// Version of the rule set validation currently runs against.
    pub fn rules_version(&self) -> u64 {
        self.detector.version()
    }

    pub fn threshold(&self) -> f64 {
        f64::from_bits(self.threshold.load(Ordering::Acquire))
    }

    /// Change the configured threshold. Values below the floor are clamped.
    /// Returns the threshold actually in force.
    pub fn set_threshold(&self, threshold: f64) -> f64 {
        let effective = effective_threshold(threshold);
        if effective > threshold || threshold.is_nan() {
            warn!(requested = threshold, effective, "Purity threshold clamped");
        }
        let previous = f64::from_bits(self.threshold.swap(effective.to_bits(), Ordering::AcqRel));
        info!(previous, current = effective, "Purity threshold updated");
        effective
    }
}

/// Clamp to `[PURITY_FLOOR, 1.0]`; NaN falls back to the default.
pub fn effective_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        return DEFAULT_THRESHOLD;
    }
    threshold.clamp(PURITY_FLOOR, 1.0)
}
