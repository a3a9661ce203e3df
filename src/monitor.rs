//! Quality monitoring module.
//!
//! Rolling counters over delivered results: purity-pass rate, fallback rate,
//! cache-hit rate, latency percentiles and a per-domain window of fallback
//! outcomes that the feedback loop uses to spot spikes.

use crate::purity::{CleaningReport, PatternKind};
use crate::terminology::LegalDomain;
use crate::translation::{TranslationMethod, TranslationResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Latency samples kept for percentiles.
const LATENCY_SAMPLES: usize = 1024;

/// Fixed-capacity ring buffer of latency samples in milliseconds.
struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            pos: 0,
            count: 0,
        }
    }

    fn push(&mut self, value: f64) {
        let capacity = self.samples.len();
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % capacity;
        if self.count < capacity {
            self.count += 1;
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples[..self.count].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        sorted[idx.min(self.count - 1)]
    }
}

pub struct QualityMonitor {
    requests: AtomicUsize,
    purity_passes: AtomicUsize,
    primary: AtomicUsize,
    fallbacks: AtomicUsize,
    cache_hits: AtomicUsize,
    cleaned: AtomicUsize,
    patterns_removed: Mutex<BTreeMap<PatternKind, usize>>,
    latencies: Mutex<SampleRing>,
    /// Most recent fallback outcomes per domain, `true` meaning fallback
    domain_windows: Mutex<HashMap<LegalDomain, VecDeque<bool>>>,
    window_size: usize,
}

impl QualityMonitor {
    pub fn new(window_size: usize) -> Self {
        Self {
            requests: AtomicUsize::new(0),
            purity_passes: AtomicUsize::new(0),
            primary: AtomicUsize::new(0),
            fallbacks: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            cleaned: AtomicUsize::new(0),
            patterns_removed: Mutex::new(BTreeMap::new()),
            latencies: Mutex::new(SampleRing::new(LATENCY_SAMPLES)),
            domain_windows: Mutex::new(HashMap::new()),
            window_size: window_size.max(1),
        }
    }

    /// Record a delivered result.
    ///
    /// `domain` is the classified legal domain of the source text; pass `None`
    /// for cache hits so they don't dilute the per-domain fallback windows.
    pub fn record(&self, result: &TranslationResult, latency: Duration, domain: Option<LegalDomain>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if result.purity.passes {
            self.purity_passes.fetch_add(1, Ordering::Relaxed);
        }
        match result.method {
            TranslationMethod::Primary => self.primary.fetch_add(1, Ordering::Relaxed),
            TranslationMethod::Fallback => self.fallbacks.fetch_add(1, Ordering::Relaxed),
            TranslationMethod::CacheHit => self.cache_hits.fetch_add(1, Ordering::Relaxed),
        };
        self.latencies.lock().push(latency.as_secs_f64() * 1000.0);

        if let Some(domain) = domain {
            let mut windows = self.domain_windows.lock();
            let window = windows.entry(domain).or_default();
            window.push_back(result.is_fallback());
            while window.len() > self.window_size {
                window.pop_front();
            }
        }
    }

    /// Record what a cleaning pass removed.
    pub fn record_cleaning(&self, report: &CleaningReport) {
        if report.removed.is_empty() {
            return;
        }
        self.cleaned.fetch_add(1, Ordering::Relaxed);
        let mut removed = self.patterns_removed.lock();
        for pattern in &report.removed {
            *removed.entry(pattern.kind).or_insert(0) += 1;
        }
    }

    /// Domains whose recent fallback rate is at least `rate` over at least
    /// `min_samples` outcomes, highest rate first.
    pub fn fallback_spikes(&self, rate: f64, min_samples: usize) -> Vec<LegalDomain> {
        let mut spikes: Vec<(LegalDomain, f64)> = self
            .domain_windows
            .lock()
            .iter()
            .filter(|(_, window)| !window.is_empty() && window.len() >= min_samples)
            .map(|(domain, window)| (*domain, fallback_rate(window)))
            .filter(|(_, r)| *r >= rate)
            .collect();
        spikes.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        spikes.into_iter().map(|(d, _)| d).collect()
    }

    /// Read-only view of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let purity_passes = self.purity_passes.load(Ordering::Relaxed);
        let fallbacks = self.fallbacks.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);

        let (latency_p50_ms, latency_p95_ms) = {
            let ring = self.latencies.lock();
            (ring.percentile(50.0), ring.percentile(95.0))
        };

        let mut domains: Vec<DomainFallbackRate> = self
            .domain_windows
            .lock()
            .iter()
            .map(|(domain, window)| DomainFallbackRate {
                domain: *domain,
                samples: window.len(),
                fallback_rate: fallback_rate(window),
            })
            .collect();
        domains.sort_by_key(|d| d.domain);

        MetricsSnapshot {
            requests,
            purity_passes,
            purity_pass_rate: percentage(purity_passes, requests),
            primary: self.primary.load(Ordering::Relaxed),
            fallbacks,
            fallback_rate: percentage(fallbacks, requests),
            cache_hits,
            cache_hit_rate: percentage(cache_hits, requests),
            latency_p50_ms,
            latency_p95_ms,
            cleaned_outputs: self.cleaned.load(Ordering::Relaxed),
            patterns_removed: self.patterns_removed.lock().clone(),
            domains,
        }
    }
}

impl Default for QualityMonitor {
    fn default() -> Self {
        Self::new(100)
    }
}

fn fallback_rate(window: &VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().filter(|f| **f).count() as f64 / window.len() as f64
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Recent fallback rate of one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainFallbackRate {
    pub domain: LegalDomain,
    pub samples: usize,
    /// Fraction (0-1) of the window that fell back
    pub fallback_rate: f64,
}

/// Metrics snapshot containing current pipeline statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Number of delivered results
    pub requests: usize,

    /// Results whose purity score passed
    pub purity_passes: usize,

    /// Purity pass rate as a percentage (0-100)
    pub purity_pass_rate: f64,

    /// Results delivered from a validated primary translation
    pub primary: usize,

    /// Results delivered from fallback content
    pub fallbacks: usize,

    /// Fallback rate as a percentage (0-100)
    pub fallback_rate: f64,

    /// Results served from the cache
    pub cache_hits: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,

    /// Engine outputs that needed cleaning
    pub cleaned_outputs: usize,

    /// Removed patterns by kind
    pub patterns_removed: BTreeMap<PatternKind, usize>,

    /// Per-domain fallback windows
    pub domains: Vec<DomainFallbackRate>,
}
