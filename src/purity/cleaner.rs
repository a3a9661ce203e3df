//! Content cleaner: strips every detected pattern and normalizes whitespace.

use crate::i18n::Language;
use crate::purity::detector::PatternDetector;
use crate::purity::rules::{ProblematicPattern, RuleSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub cleaned_text: String,
    /// Every removed pattern. Positions refer to the text of the pass that
    /// removed them, which for the first pass is the original text.
    pub removed: Vec<ProblematicPattern>,
    /// Length in characters.
    pub original_length: usize,
    /// Length in characters.
    pub cleaned_length: usize,
    /// 1.0 minus a severity-weighted penalty per removal, never below 0.
    pub confidence: f64,
}

impl CleaningReport {
    pub fn removed_anything(&self) -> bool {
        !self.removed.is_empty()
    }
}

pub struct ContentCleaner {
    detector: Arc<PatternDetector>,
}

impl ContentCleaner {
    pub fn new(detector: Arc<PatternDetector>) -> Self {
        Self { detector }
    }

    /// Clean against the rules currently in force.
    pub fn clean(&self, text: &str, target: Language) -> CleaningReport {
        let rules = self.detector.snapshot();
        Self::clean_with(&rules, text, target)
    }

    /// Clean against a specific snapshot.
    ///
    /// Repeats until a pass finds nothing, so the output is always clean
    /// under `rules` and cleaning it again is a no-op.
    pub fn clean_with(rules: &RuleSet, text: &str, target: Language) -> CleaningReport {
        let mut current = collapse_whitespace(text);
        let mut removed = Vec::new();

        loop {
            let findings = rules.detect(&current, target);
            if findings.is_empty() {
                break;
            }
            // Each pass removes at least one visible character, so this terminates
            current = collapse_whitespace(&strip_spans(&current, &findings));
            removed.extend(findings);
        }

        let penalty: f64 = removed
            .iter()
            .map(|p| p.severity.confidence_penalty())
            .sum();
        let confidence = (1.0 - penalty).max(0.0);

        if !removed.is_empty() {
            debug!(
                removed = removed.len(),
                confidence,
                language = %target,
                "Cleaned contaminated text"
            );
        }

        CleaningReport {
            original_length: text.chars().count(),
            cleaned_length: current.chars().count(),
            cleaned_text: current,
            removed,
            confidence,
        }
    }
}

/// Replace every span with a single space. Spans are sorted and disjoint.
fn strip_spans(text: &str, spans: &[ProblematicPattern]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.position]);
        out.push(' ');
        cursor = span.end();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Collapse whitespace runs: a run containing two or more newlines becomes a
/// paragraph break, one newline stays a line break, anything else one space.
/// Leading and trailing whitespace is dropped.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run: Option<usize> = None;

    for c in text.chars() {
        if c.is_whitespace() {
            let newlines = run.get_or_insert(0);
            if c == '\n' {
                *newlines += 1;
            }
            continue;
        }
        if let Some(newlines) = run.take() {
            if !out.is_empty() {
                out.push_str(match newlines {
                    0 => " ",
                    1 => "\n",
                    _ => "\n\n",
                });
            }
        }
        out.push(c);
    }
    out
}
