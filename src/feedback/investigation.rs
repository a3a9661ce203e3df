//! Investigation of a single report: reproduction and root-cause analysis.

use crate::error::FeedbackError;
use crate::feedback::enhancement::EnhancementChange;
use crate::feedback::report::{FeedbackReport, IssueKind};
use crate::i18n::{dominant_script, Language};
use crate::purity::{
    ContentCleaner, ProblematicPattern, PurityScore, PurityValidator, RuleChange, RuleSet,
    Severity,
};
use crate::terminology::{TerminologyEntry, TerminologyStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Investigation stages. Investigations only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestigationStage {
    Initiated,
    InProgress,
    FindingsAnalyzed,
    ResolutionPlanned,
    ResolutionImplemented,
    Monitoring,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTransition {
    pub stage: InvestigationStage,
    pub at: DateTime<Utc>,
}

/// Which rule family let the reported problem through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RootCause {
    UncaughtArtifact { token: String, severity: Severity },
    UncaughtCorruption { sequence: String },
    /// Foreign runs are removed either way; registering the word only turns
    /// its `FOREIGN_SCRIPT` finding into a `FOREIGN_FRAGMENT` one, which feeds
    /// the per-kind metrics and report grouping. Cleaned output is identical.
    UnlistedFunctionWord { language: Language, word: String },
    MissingTerm { entry: TerminologyEntry },
    ThresholdTooLow { current: f64, proposed: f64 },
    /// The rules in force already remove the pattern
    AlreadyCovered { pattern: String },
    NotReproducible,
}

impl RootCause {
    pub fn proposed_change(&self) -> Option<EnhancementChange> {
        match self {
            RootCause::UncaughtArtifact { token, severity } => {
                Some(EnhancementChange::Rule(RuleChange::AddUiArtifact {
                    token: token.clone(),
                    severity: *severity,
                }))
            }
            RootCause::UncaughtCorruption { sequence } => {
                Some(EnhancementChange::Rule(RuleChange::AddCorruptionSequence {
                    sequence: sequence.clone(),
                }))
            }
            RootCause::UnlistedFunctionWord { language, word } => {
                Some(EnhancementChange::Rule(RuleChange::AddFunctionWord {
                    language: *language,
                    word: word.clone(),
                }))
            }
            RootCause::MissingTerm { entry } => Some(EnhancementChange::AddTerm(entry.clone())),
            RootCause::ThresholdTooLow { current, proposed } => {
                Some(EnhancementChange::RaiseThreshold {
                    from: *current,
                    to: *proposed,
                })
            }
            RootCause::AlreadyCovered { .. } | RootCause::NotReproducible => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Investigation {
    pub stage: InvestigationStage,
    pub history: Vec<StageTransition>,
    /// What the rules in force find in the reported text
    pub findings: Vec<ProblematicPattern>,
    pub score: Option<PurityScore>,
    pub root_cause: Option<RootCause>,
    pub enhancement: Option<Uuid>,
    pub notes: Vec<String>,
}

impl Investigation {
    pub fn start() -> Self {
        Self {
            stage: InvestigationStage::Initiated,
            history: vec![StageTransition {
                stage: InvestigationStage::Initiated,
                at: Utc::now(),
            }],
            findings: Vec::new(),
            score: None,
            root_cause: None,
            enhancement: None,
            notes: Vec::new(),
        }
    }

    /// Move to a later stage. Stages may be skipped but never revisited.
    pub fn advance(&mut self, to: InvestigationStage) -> Result<(), FeedbackError> {
        if to <= self.stage {
            return Err(FeedbackError::InvalidTransition {
                from: format!("{:?}", self.stage),
                to: format!("{:?}", to),
            });
        }
        self.stage = to;
        self.history.push(StageTransition { stage: to, at: Utc::now() });
        Ok(())
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn is_closed(&self) -> bool {
        self.stage == InvestigationStage::Closed
    }
}

/// Result of replaying a report against the rules in force.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub target: Language,
    pub findings: Vec<ProblematicPattern>,
    pub score: PurityScore,
    pub root_cause: RootCause,
}

/// Reproduce the report and name the rule family that missed it.
pub fn diagnose(
    report: &FeedbackReport,
    target: Language,
    rules: &RuleSet,
    threshold: f64,
    terminology: &TerminologyStore,
) -> Diagnosis {
    let findings = rules.detect(&report.reported_text, target);
    let score = PurityValidator::score_with(rules, &report.reported_text, target, threshold);

    let root_cause = match report.issue.cited() {
        Some(cited) => diagnose_cited(report, cited, target, rules, terminology),
        None => diagnose_uncited(report, &findings, &score, threshold),
    };

    Diagnosis {
        target,
        findings,
        score,
        root_cause,
    }
}

fn diagnose_cited(
    report: &FeedbackReport,
    cited: &str,
    target: Language,
    rules: &RuleSet,
    terminology: &TerminologyStore,
) -> RootCause {
    // A citation the report does not contain reproduces nothing. Terms are
    // cited from the source side, everything else from the output.
    let reproduced = match report.issue.kind {
        IssueKind::Terminology => contains_ignore_case(&report.original_text, cited),
        _ => report.reported_text.contains(cited),
    };
    if !reproduced {
        return RootCause::NotReproducible;
    }

    let covered = || RootCause::AlreadyCovered {
        pattern: cited.to_string(),
    };

    match report.issue.kind {
        IssueKind::Terminology => {
            let correction = report
                .issue
                .correction
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty());
            let source = report.source_language().filter(|s| *s != target);
            return match (correction, source) {
                (Some(correction), Some(source)) => {
                    if terminology.lookup(cited, source, target).as_deref() == Some(correction) {
                        covered()
                    } else {
                        let hits = terminology.matching_entries(&report.original_text, source, target);
                        let domain = crate::fallback::classify(&report.original_text, source, &hits).domain;
                        RootCause::MissingTerm {
                            entry: TerminologyEntry::new(cited, correction, domain, source, target),
                        }
                    }
                }
                _ => RootCause::NotReproducible,
            };
        }
        IssueKind::EncodingCorruption => {
            return if rules.has_corruption_sequence(cited) {
                covered()
            } else {
                RootCause::UncaughtCorruption {
                    sequence: cited.to_string(),
                }
            };
        }
        _ => {}
    }

    match dominant_script(cited) {
        Some(script) if script != target.script() => {
            // Foreign letters are always removed; the only gap is a function
            // word the fragment rule doesn't know yet
            match Language::detect(cited) {
                Some(language)
                    if language != target
                        && !cited.contains(char::is_whitespace)
                        && !rules.has_function_word(language, cited) =>
                {
                    RootCause::UnlistedFunctionWord {
                        language,
                        word: cited.to_string(),
                    }
                }
                _ => covered(),
            }
        }
        _ => {
            let cleaned = ContentCleaner::clean_with(rules, cited, target);
            if rules.has_ui_artifact(cited) || !cleaned.cleaned_text.contains(cited) {
                covered()
            } else {
                RootCause::UncaughtArtifact {
                    token: cited.to_string(),
                    severity: report.severity,
                }
            }
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn diagnose_uncited(
    report: &FeedbackReport,
    findings: &[ProblematicPattern],
    score: &PurityScore,
    threshold: f64,
) -> RootCause {
    let contamination_issue = matches!(
        report.issue.kind,
        IssueKind::ForeignScript | IssueKind::MixedLanguage
    );
    if contamination_issue && score.passes && score.foreign_script_ratio > 0.0 {
        let proposed = (score.target_script_ratio + 0.01).min(1.0);
        if proposed > threshold {
            return RootCause::ThresholdTooLow {
                current: threshold,
                proposed,
            };
        }
    }
    match findings.first() {
        Some(finding) => RootCause::AlreadyCovered {
            pattern: finding.pattern.clone(),
        },
        None => RootCause::NotReproducible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::report::Issue;
    use crate::purity::{PatternKind, DEFAULT_THRESHOLD};
    use crate::terminology::BuiltinDataset;

    fn store() -> TerminologyStore {
        TerminologyStore::bootstrap(&BuiltinDataset).unwrap()
    }

    fn run(report: &FeedbackReport) -> Diagnosis {
        let target = report.resolved_target().unwrap();
        diagnose(report, target, &RuleSet::builtin(), DEFAULT_THRESHOLD, &store())
    }

    // ==================== Stage Tests ====================

    #[test]
    fn test_stages_move_forward_only() {
        let mut investigation = Investigation::start();
        investigation.advance(InvestigationStage::InProgress).unwrap();
        investigation.advance(InvestigationStage::ResolutionPlanned).unwrap();
        let err = investigation
            .advance(InvestigationStage::FindingsAnalyzed)
            .unwrap_err();
        assert!(matches!(err, FeedbackError::InvalidTransition { .. }));
        assert_eq!(investigation.history.len(), 3);
        assert!(investigation.advance(InvestigationStage::ResolutionPlanned).is_err());
    }

    #[test]
    fn test_history_is_timestamped_in_order() {
        let mut investigation = Investigation::start();
        investigation.advance(InvestigationStage::InProgress).unwrap();
        investigation.advance(InvestigationStage::Closed).unwrap();
        assert!(investigation.is_closed());
        assert!(investigation
            .history
            .windows(2)
            .all(|w| w[0].at <= w[1].at && w[0].stage < w[1].stage));
    }

    // ==================== Diagnosis Tests ====================

    #[test]
    fn test_uncaught_button_label() {
        let report = FeedbackReport::new(
            "رفضت المحكمة الاستئناف",
            "The court dismissed the appeal. Share this answer",
            Issue::new(IssueKind::UiArtifact, "leftover button").citing("Share this answer"),
            Some(Language::ENGLISH),
        );
        let diagnosis = run(&report);
        assert!(diagnosis.findings.is_empty());
        assert_eq!(
            diagnosis.root_cause,
            RootCause::UncaughtArtifact {
                token: "Share this answer".to_string(),
                severity: Severity::High,
            }
        );
    }

    #[test]
    fn test_citation_absent_from_output_is_not_reproducible() {
        let report = FeedbackReport::new(
            "رفضت المحكمة الاستئناف",
            "The court dismissed the appeal.",
            Issue::new(IssueKind::UiArtifact, "").citing("Witness"),
            Some(Language::ENGLISH),
        );
        let diagnosis = run(&report);
        assert_eq!(diagnosis.root_cause, RootCause::NotReproducible);
        assert!(diagnosis.root_cause.proposed_change().is_none());
    }

    #[test]
    fn test_artifact_citation_is_case_sensitive() {
        let report = FeedbackReport::new(
            "x",
            "The court dismissed the appeal. share this answer",
            Issue::new(IssueKind::UiArtifact, "").citing("Share this answer"),
            Some(Language::ENGLISH),
        );
        assert_eq!(run(&report).root_cause, RootCause::NotReproducible);
    }

    #[test]
    fn test_term_citation_must_appear_in_source() {
        let absent = FeedbackReport::new(
            "The lease was granted",
            "منح الكراء",
            Issue::new(IssueKind::Terminology, "").citing("usufruct").with_correction("حق الانتفاع"),
            Some(Language::ARABIC),
        );
        assert_eq!(run(&absent).root_cause, RootCause::NotReproducible);

        let capitalised = FeedbackReport::new(
            "Usufruct was granted",
            "منح حق الاستعمال",
            Issue::new(IssueKind::Terminology, "").citing("usufruct").with_correction("حق الانتفاع"),
            Some(Language::ARABIC),
        );
        assert!(matches!(run(&capitalised).root_cause, RootCause::MissingTerm { .. }));
    }

    #[test]
    fn test_known_artifact_is_covered() {
        let report = FeedbackReport::new(
            "محامي",
            "Lawyer Pro",
            Issue::new(IssueKind::UiArtifact, "").citing("Pro"),
            Some(Language::ENGLISH),
        );
        assert!(matches!(run(&report).root_cause, RootCause::AlreadyCovered { .. }));
    }

    #[test]
    fn test_unlisted_function_word() {
        let report = FeedbackReport::new(
            "The lease",
            "عقد الكراء whereas",
            Issue::new(IssueKind::MixedLanguage, "").citing("whereas"),
            Some(Language::ARABIC),
        );
        let diagnosis = run(&report);
        assert_eq!(
            diagnosis.root_cause,
            RootCause::UnlistedFunctionWord {
                language: Language::ENGLISH,
                word: "whereas".to_string(),
            }
        );
        assert_eq!(diagnosis.findings.len(), 1);
        assert_eq!(diagnosis.findings[0].kind, PatternKind::ForeignScript);
    }

    #[test]
    fn test_function_word_only_relabels() {
        let text = "عقد الكراء whereas";
        let builtin = RuleSet::builtin();
        let change = RootCause::UnlistedFunctionWord {
            language: Language::ENGLISH,
            word: "whereas".to_string(),
        }
        .proposed_change();
        let Some(EnhancementChange::Rule(rule)) = change else {
            panic!("expected a rule change, got {:?}", change);
        };
        let extended = builtin.with_change(&rule, crate::purity::RuleOrigin::Builtin);

        assert_eq!(
            extended.detect(text, Language::ARABIC)[0].kind,
            PatternKind::ForeignFragment
        );
        assert_eq!(
            ContentCleaner::clean_with(&extended, text, Language::ARABIC).cleaned_text,
            ContentCleaner::clean_with(&builtin, text, Language::ARABIC).cleaned_text
        );
    }

    #[test]
    fn test_uncaught_corruption() {
        let report = FeedbackReport::new(
            "x",
            "The cafÃ£ contract",
            Issue::new(IssueKind::EncodingCorruption, "").citing("Ã£"),
            Some(Language::ENGLISH),
        );
        assert_eq!(
            run(&report).root_cause,
            RootCause::UncaughtCorruption {
                sequence: "Ã£".to_string()
            }
        );
    }

    #[test]
    fn test_missing_term() {
        let report = FeedbackReport::new(
            "The usufruct was granted",
            "منح حق الاستعمال",
            Issue::new(IssueKind::Terminology, "").citing("usufruct").with_correction("حق الانتفاع"),
            Some(Language::ARABIC),
        );
        match run(&report).root_cause {
            RootCause::MissingTerm { entry } => {
                assert_eq!(entry.source_term, "usufruct");
                assert_eq!(entry.target_term, "حق الانتفاع");
                assert_eq!(entry.source_language, Language::ENGLISH);
                assert_eq!(entry.target_language, Language::ARABIC);
            }
            other => panic!("unexpected root cause {:?}", other),
        }
    }

    #[test]
    fn test_known_term_is_covered() {
        let report = FeedbackReport::new(
            "The lawyer",
            "المحامي",
            Issue::new(IssueKind::Terminology, "").citing("lawyer").with_correction("محامي"),
            Some(Language::ARABIC),
        );
        assert!(matches!(run(&report).root_cause, RootCause::AlreadyCovered { .. }));
    }

    #[test]
    fn test_threshold_too_low() {
        // 19 target letters and one foreign one: passes at 0.90
        let report = FeedbackReport::new(
            "x",
            "abcdefghijklmnopqrs ж",
            Issue::new(IssueKind::ForeignScript, "stray letter"),
            Some(Language::ENGLISH),
        );
        let diagnosis = run(&report);
        assert!(diagnosis.score.passes);
        match diagnosis.root_cause {
            RootCause::ThresholdTooLow { current, proposed } => {
                assert_eq!(current, DEFAULT_THRESHOLD);
                assert!((proposed - 0.96).abs() < 1e-9);
            }
            other => panic!("unexpected root cause {:?}", other),
        }
    }

    #[test]
    fn test_clean_text_without_citation_is_not_reproducible() {
        let report = FeedbackReport::new(
            "x",
            "The court dismissed the appeal.",
            Issue::new(IssueKind::Other, "looks wrong"),
            Some(Language::ENGLISH),
        );
        assert_eq!(run(&report).root_cause, RootCause::NotReproducible);
    }

    #[test]
    fn test_proposed_changes() {
        let cause = RootCause::UncaughtCorruption {
            sequence: "Ã£".to_string(),
        };
        assert!(matches!(
            cause.proposed_change(),
            Some(EnhancementChange::Rule(RuleChange::AddCorruptionSequence { .. }))
        ));
        assert!(RootCause::NotReproducible.proposed_change().is_none());
    }
}
