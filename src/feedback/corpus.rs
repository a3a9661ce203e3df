//! Held-out regression corpus.
//!
//! Recently accepted primary translations plus every curated fallback
//! paragraph. A candidate rule change is replayed against it before it may be
//! deployed.

use crate::fallback::FallbackGenerator;
use crate::i18n::Language;
use crate::purity::{PurityValidator, RuleSet};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeldOutSample {
    pub text: String,
    pub language: Language,
    /// Hand-authored fallback content rather than an accepted translation
    pub curated: bool,
}

/// Outcome of replaying the corpus under a candidate configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRunReport {
    pub samples: usize,
    pub regressions: Vec<HeldOutSample>,
}

impl DryRunReport {
    pub fn is_safe(&self) -> bool {
        self.regressions.is_empty()
    }
}

pub struct HeldOutCorpus {
    accepted: Mutex<VecDeque<HeldOutSample>>,
    capacity: usize,
}

impl HeldOutCorpus {
    pub fn new(capacity: usize) -> Self {
        Self {
            accepted: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Remember an accepted translation, dropping the oldest when full.
    pub fn record(&self, text: impl Into<String>, language: Language) {
        let sample = HeldOutSample {
            text: text.into(),
            language,
            curated: false,
        };
        let mut accepted = self.accepted.lock();
        if accepted.iter().any(|s| s.text == sample.text && s.language == language) {
            return;
        }
        if accepted.len() >= self.capacity {
            accepted.pop_front();
        }
        accepted.push_back(sample);
    }

    /// Forget an accepted translation that was later reported as bad.
    /// Returns whether anything was removed.
    pub fn retract(&self, text: &str) -> bool {
        let text = text.trim();
        let mut accepted = self.accepted.lock();
        let before = accepted.len();
        accepted.retain(|s| s.text.trim() != text);
        accepted.len() != before
    }

    pub fn accepted_len(&self) -> usize {
        self.accepted.lock().len()
    }

    /// Accepted translations followed by the curated paragraphs.
    pub fn samples(&self) -> Vec<HeldOutSample> {
        let mut samples: Vec<HeldOutSample> = self.accepted.lock().iter().cloned().collect();
        samples.extend(
            FallbackGenerator::curated_samples()
                .into_iter()
                .map(|(language, text)| HeldOutSample {
                    text: text.to_string(),
                    language,
                    curated: true,
                }),
        );
        samples
    }

    /// Replay every sample. A sample regresses when it was clean under the
    /// current rules and threshold and is not clean under the candidate ones.
    ///
    /// Works on a copy of the samples, so no lock is held while scanning.
    pub fn dry_run(
        &self,
        current: &RuleSet,
        current_threshold: f64,
        candidate: &RuleSet,
        candidate_threshold: f64,
    ) -> DryRunReport {
        let samples = self.samples();
        let regressions = samples
            .iter()
            .filter(|s| {
                PurityValidator::is_clean_with(current, &s.text, s.language, current_threshold)
                    && !PurityValidator::is_clean_with(candidate, &s.text, s.language, candidate_threshold)
            })
            .cloned()
            .collect();
        DryRunReport {
            samples: samples.len(),
            regressions,
        }
    }
}
