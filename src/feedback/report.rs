//! User reports of bad translations.

use crate::feedback::investigation::Investigation;
use crate::i18n::Language;
use crate::purity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Letters of another alphabet in the output
    ForeignScript,
    /// Button labels, product names and similar interface text
    UiArtifact,
    /// Words of the source language left in the output
    MixedLanguage,
    /// Mojibake or broken escape sequences
    EncodingCorruption,
    /// A legal term translated wrongly
    Terminology,
    Other,
}

impl IssueKind {
    pub fn default_severity(self) -> Severity {
        match self {
            IssueKind::EncodingCorruption => Severity::Critical,
            IssueKind::ForeignScript | IssueKind::UiArtifact => Severity::High,
            IssueKind::MixedLanguage | IssueKind::Terminology => Severity::Medium,
            IssueKind::Other => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    #[serde(default)]
    pub description: String,
    /// The offending text as the reporter saw it. For terminology issues,
    /// the source term that was mistranslated.
    #[serde(default)]
    pub cited_pattern: Option<String>,
    /// What the text should have said, for terminology issues
    #[serde(default)]
    pub correction: Option<String>,
}

impl Issue {
    pub fn new(kind: IssueKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            cited_pattern: None,
            correction: None,
        }
    }

    pub fn citing(mut self, pattern: impl Into<String>) -> Self {
        self.cited_pattern = Some(pattern.into());
        self
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }

    /// Cited pattern with surrounding whitespace removed, if non-empty.
    pub fn cited(&self) -> Option<&str> {
        self.cited_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    New,
    Investigating,
    Resolved,
    Monitoring,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackReport {
    pub id: Uuid,
    pub original_text: String,
    pub reported_text: String,
    pub issue: Issue,
    pub severity: Severity,
    pub status: ReportStatus,
    /// Language the reported text was supposed to be in
    pub target_language: Option<Language>,
    pub created_at: DateTime<Utc>,
    pub investigation: Option<Investigation>,
}

impl FeedbackReport {
    pub fn new(
        original_text: impl Into<String>,
        reported_text: impl Into<String>,
        issue: Issue,
        target_language: Option<Language>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_text: original_text.into(),
            reported_text: reported_text.into(),
            severity: issue.kind.default_severity(),
            issue,
            status: ReportStatus::New,
            target_language,
            created_at: Utc::now(),
            investigation: None,
        }
    }

    /// Declared target language, else the language the reported text is
    /// mostly written in, else the counterpart of the original's language.
    pub fn resolved_target(&self) -> Option<Language> {
        self.target_language
            .or_else(|| Language::detect(&self.reported_text))
            .or_else(|| {
                Language::detect(&self.original_text)
                    .and_then(|source| source.counterparts().into_iter().next())
            })
    }

    /// Language of the original text, if it can be told.
    pub fn source_language(&self) -> Option<Language> {
        Language::detect(&self.original_text).or_else(|| {
            self.resolved_target()
                .and_then(|target| target.counterparts().into_iter().next())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_new() {
        let report = FeedbackReport::new(
            "رفضت المحكمة الاستئناف",
            "The court dismissed the appeal. Share this answer",
            Issue::new(IssueKind::UiArtifact, "button text").citing("Share this answer"),
            None,
        );
        assert_eq!(report.status, ReportStatus::New);
        assert_eq!(report.severity, Severity::High);
        assert!(report.investigation.is_none());
        assert_eq!(report.resolved_target(), Some(Language::ENGLISH));
        assert_eq!(report.source_language(), Some(Language::ARABIC));
    }

    #[test]
    fn test_declared_target_wins() {
        let report = FeedbackReport::new(
            "text",
            "نص",
            Issue::new(IssueKind::Other, ""),
            Some(Language::ENGLISH),
        );
        assert_eq!(report.resolved_target(), Some(Language::ENGLISH));
    }

    #[test]
    fn test_cited_trims_and_drops_empty() {
        assert_eq!(Issue::new(IssueKind::Other, "").citing("  Pro ").cited(), Some("Pro"));
        assert_eq!(Issue::new(IssueKind::Other, "").citing("   ").cited(), None);
    }

    #[test]
    fn test_issue_deserializes_with_defaults() {
        let issue: Issue = serde_json::from_str(r#"{"kind":"ui_artifact"}"#).unwrap();
        assert_eq!(issue.kind, IssueKind::UiArtifact);
        assert!(issue.cited_pattern.is_none());
    }

    #[test]
    fn test_status_order_is_forward() {
        assert!(ReportStatus::New < ReportStatus::Investigating);
        assert!(ReportStatus::Monitoring < ReportStatus::Closed);
    }
}
