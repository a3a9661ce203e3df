//! Feedback and improvement loop.
//!
//! Reports of bad translations are investigated in the background: the
//! reported text is replayed against the rules in force, the rule family
//! that let the problem through is identified, and an enhancement is
//! proposed. Enhancements are replayed against a held-out corpus before they
//! go live, and deployed by publishing a new snapshot, so translations in
//! flight never wait on the loop.

mod corpus;
mod enhancement;
mod investigation;
mod report;

pub use corpus::{DryRunReport, HeldOutCorpus, HeldOutSample};
pub use enhancement::{Enhancement, EnhancementChange, EnhancementStatus, TargetComponent};
pub use investigation::{
    diagnose, Diagnosis, Investigation, InvestigationStage, RootCause, StageTransition,
};
pub use report::{FeedbackReport, Issue, IssueKind, ReportStatus};

use crate::config::Config;
use crate::error::FeedbackError;
use crate::gateway::Pipeline;
use crate::i18n::Language;
use crate::purity::{PurityValidator, RuleOrigin};
use crate::terminology::LegalDomain;
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outcome of one scheduled pass over pending reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub investigated: usize,
    pub closed: usize,
    /// Still being monitored or awaiting a decision
    pub open: usize,
    pub blocked: usize,
    pub failed: usize,
    pub deployed: usize,
    /// Patterns cited or found in more than one report
    pub systemic_patterns: Vec<String>,
    pub spiking_domains: Vec<LegalDomain>,
}

pub struct FeedbackLoop {
    pipeline: Pipeline,
    reports: RwLock<HashMap<Uuid, FeedbackReport>>,
    enhancements: RwLock<Vec<Enhancement>>,
    /// Serialises deployments and rollbacks
    deploy: tokio::sync::Mutex<()>,
    spike_rate: f64,
    spike_min_samples: usize,
    /// Cap on retained reports and on retained enhancements not in force
    retention: usize,
}

impl FeedbackLoop {
    pub fn new(pipeline: Pipeline, config: &Config) -> Self {
        Self {
            pipeline,
            reports: RwLock::new(HashMap::new()),
            enhancements: RwLock::new(Vec::new()),
            deploy: tokio::sync::Mutex::new(()),
            spike_rate: config.fallback_spike_rate,
            spike_min_samples: config.fallback_spike_min_samples,
            retention: config.feedback_retention.max(1),
        }
    }

    /// Record a report without investigating it yet.
    pub fn submit(
        &self,
        original_text: impl Into<String>,
        reported_text: impl Into<String>,
        issue: Issue,
        target_language: Option<Language>,
    ) -> Uuid {
        let report = FeedbackReport::new(original_text, reported_text, issue, target_language);
        let id = report.id;
        info!(report = %id, kind = ?report.issue.kind, "Feedback report received");
        // A reported output is no longer evidence of what passing text looks like
        if self.pipeline.corpus.retract(&report.reported_text) {
            debug!(report = %id, "Reported text retracted from held-out corpus");
        }
        self.reports.write().insert(id, report);
        self.prune();
        id
    }

    /// Record a report and investigate it in the background. Returns at once.
    pub fn report_bad_translation(
        self: &Arc<Self>,
        original_text: impl Into<String>,
        reported_text: impl Into<String>,
        issue: Issue,
        target_language: Option<Language>,
    ) -> Uuid {
        let id = self.submit(original_text, reported_text, issue, target_language);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.investigate(id).await {
                Ok(status) => debug!(report = %id, ?status, "Investigation finished"),
                Err(e) => warn!(report = %id, error = %e, "Investigation stopped"),
            }
        });
        id
    }

    pub fn report(&self, id: Uuid) -> Option<FeedbackReport> {
        self.reports.read().get(&id).cloned()
    }

    /// Every report, oldest first.
    pub fn reports(&self) -> Vec<FeedbackReport> {
        let mut reports: Vec<FeedbackReport> = self.reports.read().values().cloned().collect();
        reports.sort_by_key(|r| r.created_at);
        reports
    }

    pub fn enhancement(&self, id: Uuid) -> Option<Enhancement> {
        self.enhancements.read().iter().find(|e| e.id == id).cloned()
    }

    /// Every enhancement in the order it was proposed.
    pub fn enhancements(&self) -> Vec<Enhancement> {
        self.enhancements.read().clone()
    }

    /// Investigate a report from reproduction to closure.
    ///
    /// Reports that are not `New` are left alone and their status returned.
    /// Fails with `EnhancementRegressionDetected` when the proposed fix would
    /// break held-out samples; the enhancement then stays proposed.
    pub async fn investigate(&self, id: Uuid) -> Result<ReportStatus, FeedbackError> {
        let report = {
            let mut reports = self.reports.write();
            let report = reports.get_mut(&id).ok_or(FeedbackError::UnknownReport(id))?;
            if report.status != ReportStatus::New {
                return Ok(report.status);
            }
            let mut investigation = Investigation::start();
            investigation.advance(InvestigationStage::InProgress)?;
            report.status = ReportStatus::Investigating;
            report.investigation = Some(investigation);
            report.clone()
        };

        let Some(target) = report.resolved_target() else {
            return self.close(id, "target language could not be determined");
        };

        let rules = self.pipeline.detector.snapshot();
        let threshold = self.pipeline.validator.threshold();
        let diagnosis = investigation::diagnose(
            &report,
            target,
            &rules,
            threshold,
            &self.pipeline.terminology,
        );
        debug!(report = %id, root_cause = ?diagnosis.root_cause, "Report reproduced");

        self.update(id, |_, investigation| {
            investigation.findings = diagnosis.findings.clone();
            investigation.score = Some(diagnosis.score);
            investigation.root_cause = Some(diagnosis.root_cause.clone());
            investigation.advance(InvestigationStage::FindingsAnalyzed)
        })?;

        let change = match (&diagnosis.root_cause, diagnosis.root_cause.proposed_change()) {
            (_, Some(change)) => change,
            (RootCause::AlreadyCovered { pattern }, None) => {
                let note = format!("'{}' is already handled by the rules in force", pattern);
                self.update(id, |status, investigation| {
                    investigation.note(note);
                    *status = ReportStatus::Resolved;
                    Ok(())
                })?;
                return self.monitor_resolution(&report, target, &diagnosis.root_cause);
            }
            (_, None) => return self.close(id, "could not reproduce the reported problem"),
        };

        let enhancement = Enhancement::propose(change, id);
        let enhancement_id = enhancement.id;
        info!(
            report = %id,
            enhancement = %enhancement_id,
            component = ?enhancement.target_component,
            description = %enhancement.description,
            "Enhancement proposed"
        );
        self.enhancements.write().push(enhancement);
        self.update(id, |_, investigation| {
            investigation.enhancement = Some(enhancement_id);
            investigation.advance(InvestigationStage::ResolutionPlanned)
        })?;

        if let Err(e) = self.deploy(enhancement_id).await {
            let note = e.to_string();
            self.update(id, |_, investigation| {
                investigation.note(note);
                Ok(())
            })?;
            return Err(e);
        }

        self.update(id, |status, investigation| {
            *status = ReportStatus::Resolved;
            investigation.advance(InvestigationStage::ResolutionImplemented)
        })?;
        self.monitor_resolution(&report, target, &diagnosis.root_cause)
    }

    /// Dry-run an enhancement against the held-out corpus and, if nothing
    /// regresses, put it live. Returns the version it went live in, if the
    /// target component is versioned.
    async fn deploy(&self, id: Uuid) -> Result<Option<u64>, FeedbackError> {
        let _guard = self.deploy.lock().await;
        let enhancement = self
            .enhancement(id)
            .ok_or(FeedbackError::UnknownEnhancement(id))?;
        let origin = RuleOrigin::Enhancement(id);

        let rules = self.pipeline.detector.snapshot();
        let threshold = self.pipeline.validator.threshold();
        let regressions = match &enhancement.change {
            EnhancementChange::Rule(change) => {
                let candidate = rules.with_change(change, origin);
                self.pipeline
                    .corpus
                    .dry_run(&rules, threshold, &candidate, threshold)
                    .regressions
                    .len()
            }
            EnhancementChange::AddTerm(entry) => {
                entry.validate()?;
                let clean = PurityValidator::is_clean_with(
                    &rules,
                    &entry.target_term,
                    entry.target_language,
                    threshold,
                );
                usize::from(!clean)
            }
            EnhancementChange::RaiseThreshold { to, .. } => self
                .pipeline
                .corpus
                .dry_run(&rules, threshold, &rules, *to)
                .regressions
                .len(),
        };

        if regressions > 0 {
            self.update_enhancement(id, |e| e.regressions = regressions)?;
            warn!(
                enhancement = %id,
                regressions,
                description = %enhancement.description,
                "Enhancement blocked by held-out regressions"
            );
            return Err(FeedbackError::EnhancementRegressionDetected {
                enhancement: id,
                regressions,
            });
        }
        self.update_enhancement(id, |e| e.status = EnhancementStatus::Tested)?;

        let version = match &enhancement.change {
            EnhancementChange::Rule(change) => {
                let next = rules.with_change(change, origin);
                Some(self.pipeline.detector.publish(next)?)
            }
            EnhancementChange::AddTerm(entry) => {
                let version = self.pipeline.terminology.append(entry.clone(), origin)?;
                self.pipeline.cache.invalidate_all();
                Some(version)
            }
            EnhancementChange::RaiseThreshold { to, .. } => {
                self.pipeline.validator.set_threshold(*to);
                None
            }
        };

        self.update_enhancement(id, |e| {
            e.status = EnhancementStatus::Deployed;
            e.deployed_version = version;
        })?;
        info!(
            enhancement = %id,
            ?version,
            description = %enhancement.description,
            "Enhancement deployed"
        );
        Ok(version)
    }

    /// Undo a deployed enhancement.
    pub async fn rollback(&self, id: Uuid) -> Result<Enhancement, FeedbackError> {
        let _guard = self.deploy.lock().await;
        let enhancement = self
            .enhancement(id)
            .ok_or(FeedbackError::UnknownEnhancement(id))?;
        if enhancement.status != EnhancementStatus::Deployed {
            return Err(FeedbackError::NotDeployed(id));
        }

        match &enhancement.change {
            EnhancementChange::Rule(_) => {
                self.pipeline.detector.rollback_enhancement(id)?;
            }
            EnhancementChange::AddTerm(_) => {
                self.pipeline.terminology.rollback_enhancement(id);
                self.pipeline.cache.invalidate_all();
            }
            EnhancementChange::RaiseThreshold { from, .. } => {
                self.pipeline.validator.set_threshold(*from);
            }
        }

        let rolled_back = self.update_enhancement(id, |e| e.status = EnhancementStatus::RolledBack)?;
        info!(enhancement = %id, description = %rolled_back.description, "Enhancement rolled back");
        Ok(rolled_back)
    }

    /// Periodic bulk pass over every `New` report.
    ///
    /// Reports are grouped by the pattern they cite (or the first pattern the
    /// rules find in them). Patterns shared by several reports go first, then
    /// reports from domains whose fallback rate is spiking, then by severity
    /// and age.
    pub async fn run_cycle(&self) -> CycleSummary {
        let spiking = self
            .pipeline
            .monitor
            .fallback_spikes(self.spike_rate, self.spike_min_samples);
        if !spiking.is_empty() {
            warn!(domains = ?spiking, "Fallback rate spiking");
        }

        let rules = self.pipeline.detector.snapshot();
        let pending: Vec<FeedbackReport> = self
            .reports()
            .into_iter()
            .filter(|r| r.status == ReportStatus::New)
            .collect();
        info!(pending = pending.len(), "Starting feedback cycle");

        let keys: Vec<Option<String>> = pending
            .iter()
            .map(|report| {
                report
                    .issue
                    .cited()
                    .map(str::to_lowercase)
                    .or_else(|| {
                        let target = report.resolved_target()?;
                        rules
                            .detect(&report.reported_text, target)
                            .first()
                            .map(|p| p.pattern.to_lowercase())
                    })
            })
            .collect();

        let mut group_sizes: HashMap<&str, usize> = HashMap::new();
        for key in keys.iter().flatten() {
            *group_sizes.entry(key.as_str()).or_insert(0) += 1;
        }
        let mut systemic_patterns: Vec<String> = group_sizes
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(key, _)| key.to_string())
            .collect();
        systemic_patterns.sort();

        let mut queue: Vec<(usize, bool, _, _, Uuid)> = pending
            .iter()
            .zip(&keys)
            .map(|(report, key)| {
                let group = key
                    .as_deref()
                    .and_then(|k| group_sizes.get(k).copied())
                    .unwrap_or(1);
                let spike = !spiking.is_empty() && self.domain_of(report).is_some_and(|d| spiking.contains(&d));
                (group, spike, report.severity, Reverse(report.created_at), report.id)
            })
            .collect();
        queue.sort_by_key(|(group, spike, severity, age, _)| Reverse((*group, *spike, *severity, *age)));

        let deployed_before = self.deployed_count();
        let mut summary = CycleSummary {
            systemic_patterns,
            spiking_domains: spiking,
            ..CycleSummary::default()
        };

        for (_, _, _, _, id) in queue {
            summary.investigated += 1;
            match self.investigate(id).await {
                Ok(ReportStatus::Closed) => summary.closed += 1,
                Ok(_) => summary.open += 1,
                Err(FeedbackError::EnhancementRegressionDetected { .. }) => summary.blocked += 1,
                Err(e) => {
                    error!(report = %id, error = %e, "Investigation failed");
                    summary.failed += 1;
                }
            }
        }
        summary.deployed = self.deployed_count().saturating_sub(deployed_before);

        info!(
            investigated = summary.investigated,
            closed = summary.closed,
            deployed = summary.deployed,
            blocked = summary.blocked,
            "Feedback cycle finished"
        );
        self.prune();
        summary
    }

    /// Once over the retention cap, drop the oldest closed reports and the
    /// oldest enhancements that are not deployed. Open reports and deployed
    /// enhancements are always kept.
    fn prune(&self) {
        let evicted_reports = {
            let mut reports = self.reports.write();
            let excess = reports.len().saturating_sub(self.retention);
            if excess == 0 {
                0
            } else {
                let mut closed: Vec<_> = reports
                    .values()
                    .filter(|r| r.status == ReportStatus::Closed)
                    .map(|r| (r.created_at, r.id))
                    .collect();
                closed.sort();
                closed
                    .into_iter()
                    .take(excess)
                    .filter(|(_, id)| reports.remove(id).is_some())
                    .count()
            }
        };

        let evicted_enhancements = {
            let mut enhancements = self.enhancements.write();
            let mut excess = enhancements.len().saturating_sub(self.retention);
            let before = enhancements.len();
            // Kept in proposal order, so the oldest go first
            enhancements.retain(|e| {
                if excess > 0 && e.status != EnhancementStatus::Deployed {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
            before - enhancements.len()
        };

        if evicted_reports + evicted_enhancements > 0 {
            debug!(
                reports = evicted_reports,
                enhancements = evicted_enhancements,
                "Pruned feedback history"
            );
        }
    }

    fn deployed_count(&self) -> usize {
        self.enhancements
            .read()
            .iter()
            .filter(|e| e.status == EnhancementStatus::Deployed)
            .count()
    }

    fn domain_of(&self, report: &FeedbackReport) -> Option<LegalDomain> {
        let source = report.source_language()?;
        let target = report.resolved_target()?;
        Some(
            self.pipeline
                .fallback
                .classify(&report.original_text, source, target, None)
                .domain,
        )
    }

    /// Move to monitoring and close once the reported problem no longer
    /// shows up under the current configuration.
    fn monitor_resolution(
        &self,
        report: &FeedbackReport,
        target: Language,
        root_cause: &RootCause,
    ) -> Result<ReportStatus, FeedbackError> {
        self.update(report.id, |status, investigation| {
            *status = ReportStatus::Monitoring;
            investigation.advance(InvestigationStage::Monitoring)
        })?;

        if !self.verify(report, target, root_cause) {
            warn!(report = %report.id, "Reported problem still reproduces, keeping report under monitoring");
            return Ok(ReportStatus::Monitoring);
        }

        self.update(report.id, |status, investigation| {
            *status = ReportStatus::Closed;
            investigation.advance(InvestigationStage::Closed)
        })?;
        info!(report = %report.id, "Report closed");
        Ok(ReportStatus::Closed)
    }

    fn verify(&self, report: &FeedbackReport, target: Language, root_cause: &RootCause) -> bool {
        match root_cause {
            RootCause::MissingTerm { entry } => {
                self.pipeline
                    .terminology
                    .lookup(&entry.source_term, entry.source_language, entry.target_language)
                    .as_deref()
                    == Some(entry.target_term.as_str())
            }
            RootCause::ThresholdTooLow { .. } => {
                !self
                    .pipeline
                    .validator
                    .check(&report.reported_text, target)
                    .passes
            }
            _ => {
                let cleaned = self.pipeline.cleaner.clean(&report.reported_text, target);
                match report.issue.cited() {
                    Some(cited) => !cleaned.cleaned_text.contains(cited),
                    None => self.pipeline.detector.detect(&cleaned.cleaned_text, target).is_empty(),
                }
            }
        }
    }

    fn close(&self, id: Uuid, reason: &str) -> Result<ReportStatus, FeedbackError> {
        self.update(id, |status, investigation| {
            investigation.note(reason);
            *status = ReportStatus::Closed;
            investigation.advance(InvestigationStage::Closed)
        })?;
        info!(report = %id, reason, "Report closed without enhancement");
        Ok(ReportStatus::Closed)
    }

    fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ReportStatus, &mut Investigation) -> Result<T, FeedbackError>,
    ) -> Result<T, FeedbackError> {
        let mut reports = self.reports.write();
        let report = reports.get_mut(&id).ok_or(FeedbackError::UnknownReport(id))?;
        let investigation = report.investigation.get_or_insert_with(Investigation::start);
        f(&mut report.status, investigation)
    }

    fn update_enhancement(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Enhancement),
    ) -> Result<Enhancement, FeedbackError> {
        let mut enhancements = self.enhancements.write();
        let enhancement = enhancements
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(FeedbackError::UnknownEnhancement(id))?;
        f(enhancement);
        Ok(enhancement.clone())
    }
}
