//! Sharded translation cache.
//!
//! Keys are blake3 hashes of the normalized source text and the language
//! pair. Each shard is its own `RwLock<HashMap>`, so reads run concurrently
//! and writes only serialize with writes to the same shard. Entries are
//! stamped with the purity threshold and rule-set version they were last
//! validated against and are re-checked lazily when either changes.

use crate::i18n::Language;
use crate::purity::PurityValidator;
use crate::translation::TranslationResult;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Quality below which an entry is evicted before any LRU choice.
const LOW_QUALITY: f64 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Key for `text` translated from `source` to `target`.
    pub fn new(text: &str, source: Language, target: Language) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(normalize(text).as_bytes());
        hasher.update(b"|");
        hasher.update(source.code().as_bytes());
        hasher.update(b"|");
        hasher.update(target.code().as_bytes());
        CacheKey(*hasher.finalize().as_bytes())
    }

    fn shard(&self, shards: usize) -> usize {
        self.0[0] as usize % shards
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Lowercase, collapse whitespace runs to one space, trim.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Threshold bits and rule-set version an entry was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValidationStamp {
    threshold_bits: u64,
    rules_version: u64,
}

struct CacheEntry {
    result: TranslationResult,
    target: Language,
    created_at: DateTime<Utc>,
    inserted: Instant,
    hit_count: AtomicU64,
    last_access: AtomicU64,
    threshold_bits: AtomicU64,
    rules_version: AtomicU64,
}

impl CacheEntry {
    fn stamp(&self) -> ValidationStamp {
        ValidationStamp {
            threshold_bits: self.threshold_bits.load(Ordering::Acquire),
            rules_version: self.rules_version.load(Ordering::Acquire),
        }
    }

    fn restamp(&self, stamp: ValidationStamp) {
        self.threshold_bits
            .store(stamp.threshold_bits, Ordering::Release);
        self.rules_version
            .store(stamp.rules_version, Ordering::Release);
    }

    fn is_low_quality(&self) -> bool {
        self.result.is_fallback() || self.result.quality_score < LOW_QUALITY
    }

    fn is_expired(&self, fallback_ttl: Duration) -> bool {
        self.result.is_fallback() && self.inserted.elapsed() >= fallback_ttl
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

/// Metadata of a cached entry, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryInfo {
    pub created_at: DateTime<Utc>,
    pub hit_count: u64,
    pub quality_score: f64,
}

pub struct TranslationCache {
    shards: Vec<RwLock<HashMap<CacheKey, CacheEntry>>>,
    shard_capacity: usize,
    fallback_ttl: Duration,
    validator: Arc<PurityValidator>,
    /// Logical clock for LRU ordering
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl TranslationCache {
    pub fn new(
        capacity: usize,
        shards: usize,
        fallback_ttl: Duration,
        validator: Arc<PurityValidator>,
    ) -> Self {
        let shards = shards.max(1);
        let shard_capacity = capacity.max(1).div_ceil(shards);
        Self {
            shards: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
            shard_capacity,
            fallback_ttl,
            validator,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn key(text: &str, source: Language, target: Language) -> CacheKey {
        CacheKey::new(text, source, target)
    }

    fn current_stamp(&self) -> ValidationStamp {
        ValidationStamp {
            threshold_bits: self.validator.threshold().to_bits(),
            rules_version: self.validator.rules_version(),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    /// Cached result for `key`, re-labelled as a cache hit.
    ///
    /// Expired fallback entries and entries that no longer pass validation
    /// under the current rules are evicted instead of returned.
    pub fn get(&self, key: &CacheKey) -> Option<TranslationResult> {
        let shard = &self.shards[key.shard(self.shards.len())];
        let stale_since = {
            let entries = shard.read();
            let Some(entry) = entries.get(key) else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            };

            let current = self.current_stamp();
            let fresh = !entry.is_expired(self.fallback_ttl)
                && (entry.stamp() == current
                    || self.validator.is_clean(&entry.result.text, entry.target));

            if fresh {
                entry.restamp(current);
                entry.hit_count.fetch_add(1, Ordering::Relaxed);
                entry.last_access.store(self.next_tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.result.as_cache_hit());
            }
            entry.inserted
        };

        // Only drop the entry we judged stale, not one written since
        let mut entries = shard.write();
        if entries.get(key).map(|e| e.inserted) == Some(stale_since) {
            entries.remove(key);
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(?key, "Evicted stale cache entry");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a result. Results that are not clean under the current rules
    /// are refused. Returns whether the result was stored.
    pub fn put(&self, key: CacheKey, target: Language, result: TranslationResult) -> bool {
        if !self.validator.is_clean(&result.text, target) {
            debug!(?key, "Refusing to cache result that is not clean");
            return false;
        }

        let stamp = self.current_stamp();
        let entry = CacheEntry {
            result,
            target,
            created_at: Utc::now(),
            inserted: Instant::now(),
            hit_count: AtomicU64::new(0),
            last_access: AtomicU64::new(self.next_tick()),
            threshold_bits: AtomicU64::new(stamp.threshold_bits),
            rules_version: AtomicU64::new(stamp.rules_version),
        };

        let mut entries = self.shards[key.shard(self.shards.len())].write();
        if !entries.contains_key(&key) && entries.len() >= self.shard_capacity {
            if let Some(victim) = self.pick_victim(&entries) {
                entries.remove(&victim);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.insert(key, entry);
        true
    }

    /// Expired entries first, then low-quality ones, then least recently used.
    fn pick_victim(&self, entries: &HashMap<CacheKey, CacheEntry>) -> Option<CacheKey> {
        entries
            .iter()
            .min_by_key(|(_, e)| {
                (
                    !e.is_expired(self.fallback_ttl),
                    !e.is_low_quality(),
                    e.last_access.load(Ordering::Relaxed),
                )
            })
            .map(|(k, _)| *k)
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut dropped = 0;
        for shard in &self.shards {
            let mut entries = shard.write();
            dropped += entries.len();
            entries.clear();
        }
        self.invalidations
            .fetch_add(dropped as u64, Ordering::Relaxed);
        debug!(dropped, "Invalidated translation cache");
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry_info(&self, key: &CacheKey) -> Option<CacheEntryInfo> {
        let entries = self.shards[key.shard(self.shards.len())].read();
        entries.get(key).map(|e| CacheEntryInfo {
            created_at: e.created_at,
            hit_count: e.hit_count.load(Ordering::Relaxed),
            quality_score: e.result.quality_score,
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
