//! Bounded keyed store with pluggable eviction.
//!
//! Recency is tracked with a monotonically increasing access tick rather than
//! wall-clock time, so LRU order is exact even when several accesses land in
//! the same clock reading. Wall-clock [`Instant`]s are kept only for TTL expiry
//! and the optimize score. Every time-dependent operation has an `_at`
//! variant taking an explicit `now`.

use std::time::{Duration, Instant};

use orbis_config::{CacheConfig, EvictionPolicy};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use crate::{CacheError, CacheKey, CacheStats, CacheWeight};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Entry-count and byte budgets. Both are enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_bytes: usize,
}

impl CacheLimits {
    #[must_use]
    pub fn entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            max_bytes: usize::MAX,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    priority: f64,
    bytes: usize,
    inserted_at: Instant,
    last_access: Instant,
    access_tick: u64,
    access_count: u64,
    seq: u64,
}

/// Keyed cache bounded by [`CacheLimits`], evicting by [`EvictionPolicy`].
pub struct PolicyCache<K, V> {
    entries: FxHashMap<K, Entry<V>>,
    policy: EvictionPolicy,
    limits: CacheLimits,
    ttl: Duration,
    optimize_target: f64,
    enabled: bool,
    bytes: usize,
    tick: u64,
    seq: u64,
    rng: ChaCha8Rng,
    stats: CacheStats,
}

impl<K: CacheKey, V: CacheWeight> PolicyCache<K, V> {
    /// Cache with the given policy and limits, a 300 s TTL and a 0.8 optimize target.
    #[must_use]
    pub fn new(policy: EvictionPolicy, limits: CacheLimits) -> Self {
        Self {
            entries: FxHashMap::default(),
            policy,
            limits,
            ttl: Duration::from_secs(300),
            optimize_target: 0.8,
            enabled: true,
            bytes: 0,
            tick: 0,
            seq: 0,
            rng: ChaCha8Rng::seed_from_u64(0),
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(
            config.policy,
            CacheLimits {
                max_entries: config.max_entries,
                max_bytes: config.max_bytes,
            },
        );
        cache.ttl = Duration::from_secs_f64(config.ttl.max(0.0));
        cache.optimize_target = config.optimize_target;
        cache.enabled = config.enabled;
        cache.rng = ChaCha8Rng::seed_from_u64(config.random_seed);
        cache
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_optimize_target(mut self, target: f64) -> Self {
        self.optimize_target = target.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Idle time after which an entry counts as expired.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    #[must_use]
    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.bytes
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        self.stats.hit_rate()
    }

    #[must_use]
    pub fn efficiency(&self) -> f64 {
        self.stats.efficiency(self.len(), self.limits.max_entries)
    }

    /// The fuller of the entry and byte budgets, as a fraction.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        let by_count = if self.limits.max_entries == 0 {
            1.0
        } else {
            self.len() as f64 / self.limits.max_entries as f64
        };
        let by_bytes = if self.limits.max_bytes == 0 {
            1.0
        } else {
            self.bytes as f64 / self.limits.max_bytes as f64
        };
        by_count.max(by_bytes)
    }

    /// Disabled caches miss every lookup without counting it and refuse every put.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_policy(&mut self, policy: EvictionPolicy) {
        self.policy = policy;
    }

    /// Change the budgets, evicting by policy until the cache fits. Returns the evicted keys.
    pub fn set_limits(&mut self, limits: CacheLimits) -> Vec<K> {
        self.limits = limits;
        let mut evicted = Vec::new();
        while self.len() > limits.max_entries || self.bytes > limits.max_bytes {
            match self.evict_one() {
                Some(key) => evicted.push(key),
                None => break,
            }
        }
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "cache resized");
        }
        evicted
    }

    /// Look up `key`, counting a hit or miss and refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    /// [`Self::get`] with an explicit clock. Entries idle past the TTL are
    /// dropped and reported as misses.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<&V> {
        if !self.enabled {
            return None;
        }
        let expired = match self.entries.get(key) {
            None => {
                self.stats.misses += 1;
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.last_access) > self.ttl,
        };
        if expired {
            self.take(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }

        self.tick += 1;
        self.stats.hits += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.access_tick = tick;
        entry.access_count += 1;
        entry.last_access = now;
        Some(&entry.value)
    }

    /// Read without touching stats or recency.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace `key`, evicting by policy to make room.
    ///
    /// `priority` in `[0, 1]` shields an entry from [`Self::optimize`]. Returns
    /// the keys evicted. On error nothing changed.
    pub fn put(&mut self, key: K, value: V, priority: f64) -> Result<Vec<K>, CacheError> {
        self.put_at(key, value, priority, Instant::now())
    }

    /// [`Self::put`] with an explicit clock.
    pub fn put_at(&mut self, key: K, value: V, priority: f64, now: Instant) -> Result<Vec<K>, CacheError> {
        if !self.enabled {
            return Err(CacheError::Disabled);
        }
        if !key.is_valid() {
            tracing::warn!(?key, "rejected invalid cache key");
            return Err(CacheError::InvalidKey(format!("{key:?}")));
        }
        let bytes = value.estimated_bytes();
        if bytes > self.limits.max_bytes || self.limits.max_entries == 0 {
            self.stats.rejections += 1;
            tracing::warn!(?key, bytes, budget = self.limits.max_bytes, "entry can never fit in cache");
            return Err(CacheError::CapacityExceeded {
                needed: bytes,
                budget: self.limits.max_bytes,
            });
        }

        let previous = self.take(&key);
        let mut evicted = Vec::new();
        while self.len() >= self.limits.max_entries || self.bytes + bytes > self.limits.max_bytes {
            match self.evict_one() {
                Some(k) => evicted.push(k),
                None => break,
            }
        }

        self.tick += 1;
        self.seq += 1;
        let (access_count, inserted_at, seq) = match previous {
            Some(old) => {
                self.stats.updates += 1;
                (old.access_count + 1, old.inserted_at, old.seq)
            }
            None => {
                self.stats.insertions += 1;
                (0, now, self.seq)
            }
        };
        self.bytes += bytes;
        self.entries.insert(
            key,
            Entry {
                value,
                priority: priority.clamp(0.0, 1.0),
                bytes,
                inserted_at,
                last_access: now,
                access_tick: self.tick,
                access_count,
                seq,
            },
        );
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), policy = ?self.policy, "cache evicted entries");
        }
        Ok(evicted)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.take(key).map(|e| e.value);
        if value.is_some() {
            self.stats.removals += 1;
        }
        value
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }

    /// Drop every entry idle longer than `max_age`. Returns how many went.
    pub fn cleanup_expired(&mut self, max_age: Duration) -> usize {
        self.cleanup_expired_at(max_age, Instant::now())
    }

    pub fn cleanup_expired_at(&mut self, max_age: Duration, now: Instant) -> usize {
        let stale: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_access) > max_age)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            self.take(key);
        }
        self.stats.expirations += stale.len() as u64;
        stale.len()
    }

    /// Remove every entry matching `pred`, returning the removed keys.
    pub fn remove_if(&mut self, mut pred: impl FnMut(&K, &V) -> bool) -> Vec<K> {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, e)| pred(k, &e.value))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.take(key);
        }
        self.stats.removals += doomed.len() as u64;
        doomed
    }

    /// Evict by policy until at most `max_len` entries remain.
    pub fn trim_to(&mut self, max_len: usize) -> Vec<K> {
        let mut evicted = Vec::new();
        while self.len() > max_len {
            match self.evict_one() {
                Some(k) => evicted.push(k),
                None => break,
            }
        }
        evicted
    }

    /// Proactively shed the entries least worth keeping until utilization
    /// reaches the optimize target.
    ///
    /// Score is `idle seconds × (1 / access count) × (1 - priority) × size in MB`;
    /// highest goes first, ties fall back to least recently used.
    pub fn optimize(&mut self) -> Vec<K> {
        self.optimize_at(Instant::now())
    }

    pub fn optimize_at(&mut self, now: Instant) -> Vec<K> {
        if self.utilization() <= self.optimize_target {
            return Vec::new();
        }
        let mut scored: Vec<(f64, u64, K)> = self
            .entries
            .iter()
            .map(|(k, e)| {
                let idle = now.saturating_duration_since(e.last_access).as_secs_f64();
                let frequency = if e.access_count == 0 {
                    1.0
                } else {
                    1.0 / e.access_count as f64
                };
                let size_mb = e.bytes as f64 / BYTES_PER_MB;
                (idle * frequency * (1.0 - e.priority) * size_mb, e.access_tick, k.clone())
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut removed = Vec::new();
        for (_, _, key) in scored {
            if self.utilization() <= self.optimize_target {
                break;
            }
            self.take(&key);
            self.stats.evictions += 1;
            removed.push(key);
        }
        tracing::debug!(removed = removed.len(), "cache optimized");
        removed
    }

    /// Up to `n` keys with the highest access counts.
    #[must_use]
    pub fn most_accessed(&self, n: usize) -> Vec<(K, u64)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|(k, e)| (e.access_count, e.seq, k))
            .collect();
        all.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(n).map(|(c, _, k)| (k.clone(), c)).collect()
    }

    /// Up to `n` keys with the largest estimated size.
    #[must_use]
    pub fn largest(&self, n: usize) -> Vec<(K, usize)> {
        let mut all: Vec<_> = self.entries.iter().map(|(k, e)| (e.bytes, e.seq, k)).collect();
        all.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(n).map(|(b, _, k)| (k.clone(), b)).collect()
    }

    /// Up to `n` keys inserted longest ago, with their age at `now`.
    #[must_use]
    pub fn oldest(&self, n: usize, now: Instant) -> Vec<(K, Duration)> {
        let mut all: Vec<_> = self.entries.iter().map(|(k, e)| (e.seq, e.inserted_at, k)).collect();
        all.sort_by_key(|&(seq, _, _)| seq);
        all.into_iter()
            .take(n)
            .map(|(_, at, k)| (k.clone(), now.saturating_duration_since(at)))
            .collect()
    }

    fn take(&mut self, key: &K) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.bytes -= entry.bytes;
        Some(entry)
    }

    fn evict_one(&mut self) -> Option<K> {
        let victim = self.pick_victim()?;
        self.take(&victim);
        self.stats.evictions += 1;
        Some(victim)
    }

    fn pick_victim(&mut self) -> Option<K> {
        let candidates = self.entries.iter();
        match self.policy {
            EvictionPolicy::Lru => candidates.min_by_key(|(_, e)| e.access_tick).map(|(k, _)| k.clone()),
            EvictionPolicy::Lfu => candidates
                .min_by_key(|(_, e)| (e.access_count, e.seq))
                .map(|(k, _)| k.clone()),
            EvictionPolicy::Random => {
                let mut keys: Vec<(u64, &K)> = candidates.map(|(k, e)| (e.seq, k)).collect();
                if keys.is_empty() {
                    return None;
                }
                keys.sort_by_key(|&(seq, _)| seq);
                let pick = self.rng.random_range(0..keys.len());
                Some(keys[pick].1.clone())
            }
        }
    }
}
