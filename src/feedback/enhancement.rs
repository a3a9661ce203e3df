//! Proposed and deployed improvements to the pipeline.

use crate::purity::{RuleChange, Severity};
use crate::terminology::TerminologyEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetComponent {
    PatternDetector,
    ContentCleaner,
    TerminologyStore,
    PurityValidator,
}

/// The concrete change an enhancement makes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EnhancementChange {
    Rule(RuleChange),
    AddTerm(TerminologyEntry),
    RaiseThreshold { from: f64, to: f64 },
}

impl EnhancementChange {
    pub fn target_component(&self) -> TargetComponent {
        match self {
            // Corruption sequences only ever matter to the cleaner's output
            EnhancementChange::Rule(RuleChange::AddCorruptionSequence { .. }) => {
                TargetComponent::ContentCleaner
            }
            EnhancementChange::Rule(_) => TargetComponent::PatternDetector,
            EnhancementChange::AddTerm(_) => TargetComponent::TerminologyStore,
            EnhancementChange::RaiseThreshold { .. } => TargetComponent::PurityValidator,
        }
    }
}

impl fmt::Display for EnhancementChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhancementChange::Rule(RuleChange::AddUiArtifact { token, severity }) => {
                write!(f, "deny interface artifact '{}' ({})", token, severity_name(*severity))
            }
            EnhancementChange::Rule(RuleChange::AddCorruptionSequence { sequence }) => {
                write!(f, "deny corrupted sequence '{}'", sequence.escape_unicode())
            }
            EnhancementChange::Rule(RuleChange::AddFunctionWord { language, word }) => {
                write!(
                    f,
                    "register {} function word '{}' (relabels findings, output unchanged)",
                    language.name(),
                    word
                )
            }
            EnhancementChange::AddTerm(entry) => write!(
                f,
                "add term '{}' => '{}' ({} -> {})",
                entry.source_term, entry.target_term, entry.source_language, entry.target_language
            ),
            EnhancementChange::RaiseThreshold { from, to } => {
                write!(f, "raise purity threshold {:.2} -> {:.2}", from, to)
            }
        }
    }
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnhancementStatus {
    Proposed,
    Tested,
    Deployed,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enhancement {
    pub id: Uuid,
    pub target_component: TargetComponent,
    pub description: String,
    pub change: EnhancementChange,
    pub status: EnhancementStatus,
    /// Held-out samples the change broke in its dry run
    pub regressions: usize,
    /// Report the enhancement was derived from
    pub report: Uuid,
    pub created_at: DateTime<Utc>,
    /// Rule-set or dictionary version it went live in. Threshold changes
    /// are unversioned.
    pub deployed_version: Option<u64>,
}

impl Enhancement {
    pub fn propose(change: EnhancementChange, report: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_component: change.target_component(),
            description: change.to_string(),
            change,
            status: EnhancementStatus::Proposed,
            regressions: 0,
            report,
            created_at: Utc::now(),
            deployed_version: None,
        }
    }
}
