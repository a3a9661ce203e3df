//! Pattern detector: holds the current [`RuleSet`] snapshot.
//!
//! Readers grab an `Arc` of the current snapshot and work on it without
//! holding any lock, so an in-flight request keeps one consistent rule
//! version from start to finish. Writers publish a whole new snapshot.

use crate::error::FeedbackError;
use crate::i18n::Language;
use crate::purity::rules::{ProblematicPattern, RuleSet};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct PatternDetector {
    current: RwLock<Arc<RuleSet>>,
    history: Mutex<Vec<Arc<RuleSet>>>,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::with_rules(RuleSet::builtin())
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
            history: Mutex::new(Vec::new()),
        }
    }

    /// The rule set currently in force.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read())
    }

    pub fn version(&self) -> u64 {
        self.current.read().version()
    }

    /// Detect against the current snapshot.
    pub fn detect(&self, text: &str, target: Language) -> Vec<ProblematicPattern> {
        self.snapshot().detect(text, target)
    }

    /// Replace the current snapshot with `next`.
    ///
    /// `next` must have been derived from the snapshot in force, i.e. carry
    /// exactly the next version number.
    pub fn publish(&self, next: RuleSet) -> Result<u64, FeedbackError> {
        let mut current = self.current.write();
        let expected = current.version() + 1;
        if next.version() != expected {
            return Err(FeedbackError::StaleRuleSet {
                expected,
                found: next.version(),
            });
        }

        let version = next.version();
        let previous = std::mem::replace(&mut *current, Arc::new(next));
        self.history.lock().push(previous);
        info!(version, "Published detection rules");
        Ok(version)
    }

    /// Publish a snapshot with every rule added by `enhancement` masked out.
    pub fn rollback_enhancement(&self, enhancement: Uuid) -> Result<u64, FeedbackError> {
        let next = self.snapshot().without_enhancement(enhancement);
        self.publish(next)
    }

    /// Versions that were superseded, oldest first.
    pub fn history_versions(&self) -> Vec<u64> {
        self.history.lock().iter().map(|r| r.version()).collect()
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purity::rules::{RuleChange, RuleOrigin, Severity};

    fn share_button() -> RuleChange {
        RuleChange::AddUiArtifact {
            token: "Share this answer".to_string(),
            severity: Severity::High,
        }
    }

    #[test]
    fn test_publish_next_version() {
        let detector = PatternDetector::new();
        let text = "The claim is dismissed. Share this answer";
        assert!(detector.detect(text, Language::ENGLISH).is_empty());

        let next = detector
            .snapshot()
            .with_change(&share_button(), RuleOrigin::Enhancement(Uuid::new_v4()));
        let version = detector.publish(next).unwrap();

        assert_eq!(version, 2);
        assert_eq!(detector.version(), 2);
        assert_eq!(detector.detect(text, Language::ENGLISH).len(), 1);
        assert_eq!(detector.history_versions(), vec![1]);
    }

    #[test]
    fn test_publish_rejects_stale_snapshot() {
        let detector = PatternDetector::new();
        let base = detector.snapshot();
        let first = base.with_change(&share_button(), RuleOrigin::Seed);
        let second = base.with_change(&share_button(), RuleOrigin::Seed);

        detector.publish(first).unwrap();
        let err = detector.publish(second).unwrap_err();
        assert_eq!(
            err,
            FeedbackError::StaleRuleSet {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_in_flight_snapshot_is_unaffected_by_publish() {
        let detector = PatternDetector::new();
        let held = detector.snapshot();
        let next = held.with_change(&share_button(), RuleOrigin::Seed);
        detector.publish(next).unwrap();

        assert_eq!(held.version(), 1);
        assert!(!held.has_ui_artifact("Share this answer"));
    }

    #[test]
    fn test_rollback_enhancement() {
        let detector = PatternDetector::new();
        let id = Uuid::new_v4();
        let next = detector
            .snapshot()
            .with_change(&share_button(), RuleOrigin::Enhancement(id));
        detector.publish(next).unwrap();

        let version = detector.rollback_enhancement(id).unwrap();
        assert_eq!(version, 3);
        assert!(!detector.snapshot().has_ui_artifact("Share this answer"));
        assert_eq!(detector.history_versions(), vec![1, 2]);
    }
}
