//! Translation gateway.
//!
//! The single entry point for translations. Every result it hands out has
//! been cleaned and validated against the target script; when the engine
//! cannot produce such a result the caller gets curated fallback content
//! instead of an error.

use crate::cache::TranslationCache;
use crate::config::Config;
use crate::engine::{EnginePrompt, TranslationEngine};
use crate::error::{EngineError, TranslateError};
use crate::fallback::FallbackGenerator;
use crate::feedback::HeldOutCorpus;
use crate::monitor::QualityMonitor;
use crate::purity::{ContentCleaner, PatternDetector, PurityScore, PurityValidator};
use crate::terminology::TerminologyStore;
use crate::translation::{TranslationMethod, TranslationRequest, TranslationResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Shared pipeline components.
///
/// Built once at startup and handed to both the gateway and the feedback
/// loop, so an enhancement deployed by one is seen by the other.
#[derive(Clone)]
pub struct Pipeline {
    pub detector: Arc<PatternDetector>,
    pub cleaner: Arc<ContentCleaner>,
    pub validator: Arc<PurityValidator>,
    pub terminology: Arc<TerminologyStore>,
    pub fallback: Arc<FallbackGenerator>,
    pub cache: Arc<TranslationCache>,
    pub monitor: Arc<QualityMonitor>,
    pub corpus: Arc<HeldOutCorpus>,
}

impl Pipeline {
    pub fn new(config: &Config, terminology: TerminologyStore) -> Self {
        let detector = Arc::new(PatternDetector::new());
        let validator = Arc::new(PurityValidator::new(
            Arc::clone(&detector),
            config.purity_threshold,
        ));
        let terminology = Arc::new(terminology);
        Self {
            cleaner: Arc::new(ContentCleaner::new(Arc::clone(&detector))),
            fallback: Arc::new(FallbackGenerator::new(
                Arc::clone(&terminology),
                Arc::clone(&validator),
            )),
            cache: Arc::new(TranslationCache::new(
                config.cache_capacity,
                config.cache_shards,
                config.fallback_ttl,
                Arc::clone(&validator),
            )),
            monitor: Arc::new(QualityMonitor::new(config.fallback_spike_min_samples.max(1) * 5)),
            corpus: Arc::new(HeldOutCorpus::new(config.held_out_capacity)),
            detector,
            validator,
            terminology,
        }
    }
}

/// Per-request pipeline stages, traced on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    CacheCheck,
    CacheHit,
    PreClean,
    PrimaryTranslate,
    Validate,
    Pass,
    Fail,
    FallbackGenerate,
    CacheWrite,
    Done,
}

/// Why a primary translation was not delivered. Never leaves the gateway.
#[derive(Debug, Error)]
enum PurityFailure {
    #[error("source text is empty after cleaning")]
    EmptySource,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("output rejected (target ratio {:.3})", .0.target_script_ratio)]
    Rejected(PurityScore),

    #[error("cancelled by caller")]
    Cancelled,
}

pub struct TranslationGateway {
    engine: Arc<dyn TranslationEngine>,
    pipeline: Pipeline,
    engine_timeout: Duration,
    worker_concurrency: usize,
}

impl TranslationGateway {
    pub fn new(engine: Arc<dyn TranslationEngine>, pipeline: Pipeline, config: &Config) -> Self {
        info!(
            engine = engine.name(),
            timeout_secs = config.engine_timeout.as_secs_f64(),
            concurrency = config.worker_concurrency,
            "Translation gateway ready"
        );
        Self {
            engine,
            pipeline,
            engine_timeout: config.engine_timeout,
            worker_concurrency: config.worker_concurrency.max(1),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn monitor(&self) -> &QualityMonitor {
        &self.pipeline.monitor
    }

    /// Translate one request.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslateError> {
        self.translate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Translate one request, giving up with `Cancelled` once `cancel` fires.
    pub async fn translate_with_cancel(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, TranslateError> {
        let started = Instant::now();
        let id = request.id();
        let source = request.source_language();
        let target = request.target_language();
        enter(id, Stage::Received);

        if cancel.is_cancelled() {
            return Err(TranslateError::Cancelled);
        }

        enter(id, Stage::CacheCheck);
        let key = TranslationCache::key(request.source_text(), source, target);
        if let Some(hit) = self.pipeline.cache.get(&key) {
            enter(id, Stage::CacheHit);
            self.pipeline.monitor.record(&hit, started.elapsed(), None);
            enter(id, Stage::Done);
            return Ok(hit);
        }

        enter(id, Stage::PreClean);
        let source_report = self.pipeline.cleaner.clean(request.source_text(), source);
        let outcome = if source_report.cleaned_text.is_empty() {
            Err(PurityFailure::EmptySource)
        } else {
            self.primary(request, &source_report.cleaned_text, cancel)
                .await
        };

        let mut result = match outcome {
            Ok(result) => {
                enter(id, Stage::Pass);
                self.pipeline.corpus.record(result.text.clone(), target);
                result
            }
            Err(PurityFailure::Cancelled) => {
                debug!(request = %id, "Translation cancelled by caller");
                return Err(TranslateError::Cancelled);
            }
            Err(failure) => {
                enter(id, Stage::Fail);
                warn!(request = %id, reason = %failure, "Primary translation failed, using fallback");
                self.fallback(request)
            }
        };

        // Nothing leaves the gateway without passing validation
        if !self.pipeline.validator.check(&result.text, target).passes {
            if result.method == TranslationMethod::Fallback {
                error!(request = %id, language = %target, "Fallback content failed final validation");
            } else {
                warn!(request = %id, "Result failed final validation, using fallback");
                result = self.fallback(request);
            }
        }

        enter(id, Stage::CacheWrite);
        self.pipeline.cache.put(key, target, result.clone());

        let domain = self
            .pipeline
            .fallback
            .classify(request.source_text(), source, target, request.domain_hint())
            .domain;
        self.pipeline
            .monitor
            .record(&result, started.elapsed(), Some(domain));

        enter(id, Stage::Done);
        Ok(result)
    }

    /// Translate many requests with bounded concurrency. Results keep the
    /// order of `requests`.
    pub async fn translate_batch(
        &self,
        requests: &[TranslationRequest],
    ) -> Vec<Result<TranslationResult, TranslateError>> {
        let mut results: Vec<(usize, Result<TranslationResult, TranslateError>)> =
            stream::iter(requests.iter().enumerate())
                .map(|(i, request)| async move { (i, self.translate(request).await) })
                .buffer_unordered(self.worker_concurrency)
                .collect()
                .await;
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, r)| r).collect()
    }

    /// The only engine call of a request, followed by repair, cleaning and
    /// validation of its output.
    async fn primary(
        &self,
        request: &TranslationRequest,
        source_text: &str,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, PurityFailure> {
        let id = request.id();
        let source = request.source_language();
        let target = request.target_language();

        let hints = self
            .pipeline
            .terminology
            .matching_entries(source_text, source, target);
        let prompt = EnginePrompt::for_translation(source_text, source, target, &hints);

        enter(id, Stage::PrimaryTranslate);
        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PurityFailure::Cancelled),
            outcome = tokio::time::timeout(self.engine_timeout, self.engine.generate_or_translate(&prompt)) => {
                match outcome {
                    Ok(output) => output?,
                    Err(_) => return Err(EngineError::Timeout(self.engine_timeout).into()),
                }
            }
        };

        enter(id, Stage::Validate);
        let repaired = self.pipeline.terminology.bulk_apply(&raw, source, target);
        let report = self.pipeline.cleaner.clean(&repaired, target);
        self.pipeline.monitor.record_cleaning(&report);

        let purity = self.pipeline.validator.check(&report.cleaned_text, target);
        if !purity.passes {
            return Err(PurityFailure::Rejected(purity));
        }

        let quality_score =
            (0.5 + 0.5 * purity.target_script_ratio * report.confidence).clamp(0.0, 1.0);
        Ok(TranslationResult {
            text: report.cleaned_text,
            method: TranslationMethod::Primary,
            purity,
            quality_score,
        })
    }

    fn fallback(&self, request: &TranslationRequest) -> TranslationResult {
        enter(request.id(), Stage::FallbackGenerate);
        self.pipeline.fallback.generate(
            request.source_text(),
            request.source_language(),
            request.target_language(),
            request.domain_hint(),
        )
    }
}

fn enter(request: Uuid, stage: Stage) {
    debug!(%request, ?stage, "Gateway stage");
}
