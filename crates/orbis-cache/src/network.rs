//! Position-keyed cache for chunks exchanged with peers.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use glam::DVec3;
use orbis_config::{EvictionPolicy, NetworkCacheConfig};
use serde::{Deserialize, Serialize};

use crate::{CacheError, CacheLimits, CacheWeight, PolicyCache, PositionKey};

/// Milliseconds since the unix epoch, 0 if the clock is before it.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries stored or refreshed.
    pub synchronized: u64,
    pub removed: u64,
    /// Wall time spent inside cache operations.
    pub total_op_time: Duration,
}

impl NetworkStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

struct Synced<V> {
    value: V,
    synced_at_ms: u64,
}

impl<V: CacheWeight> CacheWeight for Synced<V> {
    fn estimated_bytes(&self) -> usize {
        self.value.estimated_bytes() + size_of::<u64>()
    }
}

/// Chunks keyed by world position, each stamped with the time it was last
/// synchronized so peers can tell whether their copy is stale.
pub struct NetworkChunkCache<V> {
    inner: PolicyCache<PositionKey, Synced<V>>,
    max_age: Duration,
    stats: NetworkStats,
}

impl<V: CacheWeight> NetworkChunkCache<V> {
    #[must_use]
    pub fn new(policy: EvictionPolicy, max_entries: usize, max_age: Duration) -> Self {
        Self {
            inner: PolicyCache::new(policy, CacheLimits::entries(max_entries)).with_ttl(Duration::MAX),
            max_age,
            stats: NetworkStats::default(),
        }
    }

    #[must_use]
    pub fn from_config(policy: EvictionPolicy, config: &NetworkCacheConfig) -> Self {
        Self::new(
            policy,
            config.max_entries,
            Duration::from_secs_f64(config.max_age.max(0.0)),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.inner.limits().max_entries
    }

    #[must_use]
    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Store `value` at `position`, stamped with `synced_at_ms`.
    pub fn store_at(&mut self, position: DVec3, value: V, synced_at_ms: u64) -> Result<(), CacheError> {
        let started = Instant::now();
        let key = PositionKey::new(position).inspect_err(|e| tracing::warn!(%e, "network cache store rejected"))?;
        let result = self.inner.put(key, Synced { value, synced_at_ms }, 0.5);
        self.stats.total_op_time += started.elapsed();
        let evicted = result?;
        self.stats.synchronized += 1;
        self.stats.removed += evicted.len() as u64;
        Ok(())
    }

    /// Store `value` at `position`, stamped now.
    pub fn store(&mut self, position: DVec3, value: V) -> Result<(), CacheError> {
        self.store_at(position, value, unix_millis())
    }

    pub fn get(&mut self, position: DVec3) -> Option<&V> {
        let started = Instant::now();
        let Ok(key) = PositionKey::new(position) else {
            tracing::warn!(%position, "network cache lookup with non-finite position");
            self.stats.misses += 1;
            return None;
        };
        let found = self.inner.get(&key);
        self.stats.total_op_time += started.elapsed();
        match found {
            Some(entry) => {
                self.stats.hits += 1;
                Some(&entry.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// The sync stamp stored for `position`, if cached.
    #[must_use]
    pub fn sync_stamp(&self, position: DVec3) -> Option<u64> {
        let key = PositionKey::new(position).ok()?;
        self.inner.peek(&key).map(|e| e.synced_at_ms)
    }

    /// True when we hold nothing for `position` or a peer's copy is newer.
    #[must_use]
    pub fn needs_refetch(&self, position: DVec3, peer_stamp_ms: u64) -> bool {
        self.sync_stamp(position).is_none_or(|ours| peer_stamp_ms > ours)
    }

    pub fn remove(&mut self, position: DVec3) -> Option<V> {
        let key = PositionKey::new(position).ok()?;
        let removed = self.inner.remove(&key).map(|e| e.value);
        if removed.is_some() {
            self.stats.removed += 1;
        }
        removed
    }

    /// Drop entries not synchronized within `max_age` of `now_ms`.
    pub fn cleanup_old_at(&mut self, max_age: Duration, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(max_age.as_millis() as u64);
        let stale = self.inner.remove_if(|_, e| e.synced_at_ms < cutoff);
        self.stats.removed += stale.len() as u64;
        if !stale.is_empty() {
            tracing::debug!(removed = stale.len(), "network cache dropped stale chunks");
        }
        stale.len()
    }

    pub fn cleanup_old(&mut self, max_age: Duration) -> usize {
        self.cleanup_old_at(max_age, unix_millis())
    }

    /// Drop stale entries, then trim to 80% of capacity by policy.
    pub fn optimize(&mut self) -> usize {
        let started = Instant::now();
        let mut removed = self.cleanup_old(self.max_age);
        let target = self.max_entries() * 4 / 5;
        let trimmed = self.inner.trim_to(target).len();
        self.stats.removed += trimmed as u64;
        removed += trimmed;
        self.stats.total_op_time += started.elapsed();
        removed
    }

    /// Hit rate scaled by fill fraction.
    #[must_use]
    pub fn efficiency(&self) -> f64 {
        let max = self.max_entries();
        if max == 0 {
            return 0.0;
        }
        self.stats.hit_rate() * (self.len() as f64 / max as f64)
    }

    pub fn clear(&mut self) {
        self.stats.removed += self.inner.len() as u64;
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max: usize) -> NetworkChunkCache<Vec<u8>> {
        NetworkChunkCache::new(EvictionPolicy::Lru, max, Duration::from_secs(300))
    }

    #[test]
    fn test_store_and_get() {
        let mut c = cache(4);
        let p = DVec3::new(10.0, 0.0, -5.0);
        c.store(p, vec![1, 2, 3]).unwrap();
        assert_eq!(c.get(p), Some(&vec![1, 2, 3]));
        assert_eq!(c.get(DVec3::ZERO), None);
        assert_eq!(c.stats().hits, 1);
        assert_eq!(c.stats().misses, 1);
        assert_eq!(c.stats().synchronized, 1);
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut c = cache(4);
        let err = c.store(DVec3::new(f64::NAN, 0.0, 0.0), vec![]).unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey(_)));
        assert!(c.is_empty());
        assert_eq!(c.get(DVec3::splat(f64::INFINITY)), None);
    }

    #[test]
    fn test_needs_refetch() {
        let mut c = cache(4);
        let p = DVec3::X;
        assert!(c.needs_refetch(p, 0), "nothing cached yet");
        c.store_at(p, vec![0], 1_000).unwrap();
        assert!(!c.needs_refetch(p, 1_000));
        assert!(!c.needs_refetch(p, 500));
        assert!(c.needs_refetch(p, 1_001));
        assert_eq!(c.sync_stamp(p), Some(1_000));
    }

    #[test]
    fn test_cleanup_old() {
        let mut c = cache(8);
        c.store_at(DVec3::X, vec![0], 1_000).unwrap();
        c.store_at(DVec3::Y, vec![0], 9_000).unwrap();
        let removed = c.cleanup_old_at(Duration::from_secs(5), 10_000);
        assert_eq!(removed, 1);
        assert!(c.sync_stamp(DVec3::X).is_none());
        assert!(c.sync_stamp(DVec3::Y).is_some());
        assert_eq!(c.stats().removed, 1);
    }

    #[test]
    fn test_optimize_trims_to_eighty_percent() {
        let mut c = cache(10);
        for i in 0..10 {
            c.store(DVec3::new(i as f64, 0.0, 0.0), vec![0]).unwrap();
        }
        let removed = c.optimize();
        assert_eq!(removed, 2);
        assert_eq!(c.len(), 8);
        // LRU: the first two stored are gone.
        assert!(c.sync_stamp(DVec3::ZERO).is_none());
        assert!(c.sync_stamp(DVec3::X).is_none());
    }

    #[test]
    fn test_eviction_counts_as_removed() {
        let mut c = cache(2);
        for i in 0..3 {
            c.store(DVec3::new(0.0, i as f64, 0.0), vec![0]).unwrap();
        }
        assert_eq!(c.len(), 2);
        assert_eq!(c.stats().removed, 1);
    }

    #[test]
    fn test_efficiency() {
        let mut c = cache(4);
        c.store(DVec3::X, vec![0]).unwrap();
        c.get(DVec3::X);
        c.get(DVec3::Y);
        assert_eq!(c.efficiency(), 0.5 * 0.25);
    }
}
