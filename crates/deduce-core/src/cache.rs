//! Memoization of inference results keyed by canonical game state.

use crate::inference::{
    Constraint, EngineKind, InferenceContext, InferenceEngine, InferenceResult, Truncation,
};
use crate::model::KeywordIndex;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::{Level, event};

/// Canonical form of an [`InferenceContext`]. Player ids are dropped since
/// no engine reads them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    keyword_count: usize,
    answer_count: usize,
    revealed_answers: Vec<KeywordIndex>,
    revealed_wrongs: Vec<KeywordIndex>,
    own_hints: Vec<KeywordIndex>,
    other_hints: Vec<KeywordIndex>,
    history: Vec<(Vec<KeywordIndex>, usize)>,
    extra: Vec<Constraint>,
}

impl CacheKey {
    pub fn from_context(ctx: &InferenceContext) -> Self {
        Self {
            keyword_count: ctx.keyword_count,
            answer_count: ctx.answer_count,
            revealed_answers: ctx.revealed_answers.iter().copied().collect(),
            revealed_wrongs: ctx.revealed_wrongs.iter().copied().collect(),
            own_hints: ctx.own_hints.iter().copied().collect(),
            other_hints: ctx.other_hints.iter().copied().collect(),
            history: ctx
                .history
                .iter()
                .map(|record| (record.guessed.clone(), record.correct_count))
                .collect(),
            extra: ctx.extra_constraints.clone(),
        }
    }

    pub fn canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub capacity: usize,
    pub ttl: Duration,
    /// Ticks of recency forgiven per recorded hit when picking a victim.
    pub hit_bonus: u64,
}

impl PoolSettings {
    pub const fn logical() -> Self {
        Self {
            capacity: 50,
            ttl: Duration::from_secs(120),
            hit_bonus: 8,
        }
    }

    pub const fn probabilistic() -> Self {
        Self {
            capacity: 30,
            ttl: Duration::from_secs(30),
            hit_bonus: 8,
        }
    }

    pub const fn for_engine(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Logical => Self::logical(),
            EngineKind::Probabilistic => Self::probabilistic(),
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_access: u64,
    hits: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub lookups: u64,
    pub hits: u64,
    pub hit_rate: f64,
    pub avg_hits: f64,
    pub evictions: u64,
}

/// Bounded map with TTL expiry. The eviction victim maximizes
/// `ticks since last access - hits * hit_bonus`.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    settings: PoolSettings,
    tick: u64,
    next_seq: u64,
    lookups: u64,
    hits: u64,
    evictions: u64,
}

impl<K: Hash + Eq + Clone, V> MemoCache<K, V> {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            entries: HashMap::new(),
            settings,
            tick: 0,
            next_seq: 0,
            lookups: 0,
            hits: 0,
            evictions: 0,
        }
    }

    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.tick += 1;
        self.lookups += 1;
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.settings.ttl);
        if expired {
            self.entries.remove(key);
            return None;
        }
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        entry.last_access = tick;
        self.hits += 1;
        Some(&entry.value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.settings.capacity == 0 {
            return;
        }
        self.tick += 1;
        if !self.entries.contains_key(&key) {
            self.purge_expired();
            while self.entries.len() >= self.settings.capacity {
                if !self.evict_one() {
                    break;
                }
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                last_access: self.tick,
                hits: 0,
                seq,
            },
        );
    }

    pub fn purge_expired(&mut self) {
        let ttl = self.settings.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    fn evict_one(&mut self) -> bool {
        let tick = self.tick as i64;
        let bonus = self.settings.hit_bonus as i64;
        let victim = self
            .entries
            .iter()
            .max_by(|(_, a), (_, b)| {
                let score_a = tick - a.last_access as i64 - a.hits as i64 * bonus;
                let score_b = tick - b.last_access as i64 - b.hits as i64 * bonus;
                score_a.cmp(&score_b).then(b.seq.cmp(&a.seq))
            })
            .map(|(key, _)| key.clone());
        match victim {
            Some(key) => {
                self.entries.remove(&key);
                self.evictions += 1;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entry_hits: u64 = self.entries.values().map(|entry| entry.hits).sum();
        CacheStats {
            size: self.entries.len(),
            capacity: self.settings.capacity,
            lookups: self.lookups,
            hits: self.hits,
            hit_rate: if self.lookups == 0 {
                0.0
            } else {
                self.hits as f64 / self.lookups as f64
            },
            avg_hits: if self.entries.is_empty() {
                0.0
            } else {
                entry_hits as f64 / self.entries.len() as f64
            },
            evictions: self.evictions,
        }
    }
}

/// Caching decorator around any [`InferenceEngine`].
#[derive(Debug)]
pub struct Memoized<E> {
    inner: E,
    cache: MemoCache<CacheKey, InferenceResult>,
    enabled: bool,
}

impl<E: InferenceEngine> Memoized<E> {
    pub fn new(inner: E) -> Self {
        let settings = PoolSettings::for_engine(inner.kind());
        Self::with_settings(inner, settings)
    }

    pub fn with_settings(inner: E, settings: PoolSettings) -> Self {
        Self {
            inner,
            cache: MemoCache::new(settings),
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<E: InferenceEngine> InferenceEngine for Memoized<E> {
    fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    fn infer(&mut self, ctx: &InferenceContext) -> InferenceResult {
        if !self.enabled {
            return self.inner.infer(ctx);
        }
        let key = CacheKey::from_context(ctx);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let result = self.inner.infer(ctx);
        // Timeouts depend on wall-clock speed, so they never enter the cache.
        if result.truncation != Some(Truncation::Timeout) {
            self.cache.insert(key, result.clone());
        } else if tracing::enabled!(Level::DEBUG) {
            event!(
                target: "deduce_core::cache",
                Level::DEBUG,
                engine = ?self.inner.kind(),
                key = %key.canonical(),
                message = "skipping cache for timed-out inference"
            );
        }
        result
    }

    fn reset(&mut self) {
        self.cache.clear();
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{LogicalInference, ProbabilisticInference};

    fn settings(capacity: usize) -> PoolSettings {
        PoolSettings {
            capacity,
            ttl: Duration::from_secs(60),
            hit_bonus: 8,
        }
    }

    #[test]
    fn cache_respects_capacity() {
        let mut cache: MemoCache<u32, &str> = MemoCache::new(settings(2));
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get(&3).is_some());
    }

    #[test]
    fn frequently_hit_entries_survive_eviction() {
        let mut cache: MemoCache<u32, &str> = MemoCache::new(settings(2));
        cache.insert(1, "hot");
        for _ in 0..5 {
            assert!(cache.get(&1).is_some());
        }
        cache.insert(2, "cold");
        cache.insert(3, "new");
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let mut cache: MemoCache<u32, &str> = MemoCache::new(PoolSettings {
            capacity: 4,
            ttl: Duration::ZERO,
            hit_bonus: 8,
        });
        cache.insert(1, "a");
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_report_hit_rate() {
        let mut cache: MemoCache<u32, &str> = MemoCache::new(settings(4));
        cache.insert(1, "a");
        cache.get(&1);
        cache.get(&2);
        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert!((stats.hit_rate - 0.5).abs() < 1e-12);
        assert!((stats.avg_hits - 1.0).abs() < 1e-12);
    }

    #[test]
    fn key_ignores_player_ids_but_not_history() {
        let a = InferenceContext::new(10, 3).with_guess(1, &[1, 2, 3], 1);
        let b = InferenceContext::new(10, 3).with_guess(2, &[3, 2, 1], 1);
        let c = InferenceContext::new(10, 3).with_guess(1, &[1, 2, 3], 2);
        assert_eq!(CacheKey::from_context(&a), CacheKey::from_context(&b));
        assert_ne!(CacheKey::from_context(&a), CacheKey::from_context(&c));
        assert!(CacheKey::from_context(&a).canonical().contains("history"));
    }

    #[test]
    fn memoized_engines_return_identical_results() {
        let ctx = InferenceContext::new(10, 3)
            .with_guess(1, &[1, 4, 9], 2)
            .with_guess(2, &[2, 4, 7], 2);
        let mut plain = LogicalInference::default();
        let mut cached = Memoized::new(LogicalInference::default());
        let first = cached.infer(&ctx);
        let second = cached.infer(&ctx);
        assert_eq!(first, plain.infer(&ctx));
        assert_eq!(first, second);
        assert_eq!(cached.stats().hits, 1);

        let mut bayes = Memoized::new(ProbabilisticInference::default()).enabled(false);
        assert_eq!(bayes.infer(&ctx), ProbabilisticInference::default().infer(&ctx));
        assert_eq!(bayes.stats().lookups, 0);
    }
}
