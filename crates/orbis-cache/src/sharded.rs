//! Lock-sharded wrapper over [`PolicyCache`] for use from worker threads.

use std::hash::BuildHasher;
use std::sync::{Mutex, MutexGuard, PoisonError};

use orbis_config::{CacheConfig, EvictionPolicy};
use rustc_hash::FxBuildHasher;

use crate::{CacheError, CacheKey, CacheLimits, CacheStats, CacheWeight, PolicyCache};

/// `shards` independent caches, each owning a slice of the key space.
///
/// Limits are split evenly (rounded up), so eviction is per shard and the
/// total can briefly sit a few entries under the global budget.
pub struct ShardedCache<K, V> {
    shards: Box<[Mutex<PolicyCache<K, V>>]>,
    hasher: FxBuildHasher,
}

fn split(total: usize, shards: usize) -> usize {
    if total == usize::MAX {
        total
    } else {
        total.div_ceil(shards)
    }
}

impl<K: CacheKey, V: CacheWeight> ShardedCache<K, V> {
    #[must_use]
    pub fn new(policy: EvictionPolicy, limits: CacheLimits, shards: usize) -> Self {
        let shards = shards.max(1);
        let per_shard = CacheLimits {
            max_entries: split(limits.max_entries, shards),
            max_bytes: split(limits.max_bytes, shards),
        };
        Self {
            shards: (0..shards)
                .map(|i| Mutex::new(PolicyCache::new(policy, per_shard).with_random_seed(i as u64)))
                .collect(),
            hasher: FxBuildHasher,
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let shards = config.shards.max(1);
        let mut per_shard = config.clone();
        per_shard.max_entries = split(config.max_entries, shards);
        per_shard.max_bytes = split(config.max_bytes, shards);
        Self {
            shards: (0..shards)
                .map(|i| {
                    per_shard.random_seed = config.random_seed.wrapping_add(i as u64);
                    Mutex::new(PolicyCache::from_config(&per_shard))
                })
                .collect(),
            hasher: FxBuildHasher,
        }
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) % self.shards.len()
    }

    fn lock(&self, key: &K) -> MutexGuard<'_, PolicyCache<K, V>> {
        self.shards[self.shard_index(key)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn each<T>(&self, mut f: impl FnMut(&mut PolicyCache<K, V>) -> T) -> Vec<T> {
        self.shards
            .iter()
            .map(|s| f(&mut s.lock().unwrap_or_else(PoisonError::into_inner)))
            .collect()
    }

    /// Clone of the cached value, refreshing recency.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.lock(key).get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock(key).contains(key)
    }

    pub fn put(&self, key: K, value: V, priority: f64) -> Result<Vec<K>, CacheError> {
        self.lock(&key).put(key, value, priority)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock(key).remove(key)
    }

    pub fn len(&self) -> usize {
        self.each(|s| s.len()).into_iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes_used(&self) -> usize {
        self.each(|s| s.bytes_used()).into_iter().sum()
    }

    pub fn clear(&self) {
        self.each(PolicyCache::clear);
    }

    /// Counters summed over every shard.
    pub fn stats(&self) -> CacheStats {
        self.each(|s| *s.stats())
            .into_iter()
            .fold(CacheStats::default(), CacheStats::merged)
    }

    pub fn cleanup_expired(&self, max_age: std::time::Duration) -> usize {
        self.each(|s| s.cleanup_expired(max_age)).into_iter().sum()
    }

    pub fn optimize(&self) -> Vec<K> {
        self.each(PolicyCache::optimize).into_iter().flatten().collect()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.each(|s| s.set_enabled(enabled));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_put_get_across_shards() {
        let cache: ShardedCache<String, Vec<u8>> =
            ShardedCache::new(EvictionPolicy::Lru, CacheLimits::entries(1024), 4);
        for i in 0..32 {
            cache.put(format!("k{i}"), vec![i as u8], 0.5).unwrap();
        }
        assert_eq!(cache.len(), 32);
        for i in 0..32 {
            assert_eq!(cache.get(&format!("k{i}")), Some(vec![i as u8]), "key k{i}");
        }
        assert_eq!(cache.stats().hits, 32);
        assert_eq!(cache.stats().insertions, 32);
    }

    #[test]
    fn test_shard_limits_bound_total() {
        let cache: ShardedCache<String, Vec<u8>> =
            ShardedCache::new(EvictionPolicy::Lfu, CacheLimits::entries(8), 4);
        for i in 0..100 {
            cache.put(format!("k{i}"), vec![0], 0.0).unwrap();
        }
        assert!(cache.len() <= 8, "len {}", cache.len());
        assert_eq!(cache.stats().evictions as usize, 100 - cache.len());
    }

    #[test]
    fn test_concurrent_writers() {
        let cache: Arc<ShardedCache<String, Vec<u8>>> =
            Arc::new(ShardedCache::new(EvictionPolicy::Lru, CacheLimits::entries(4096), 8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(format!("t{t}-{i}"), vec![t as u8], 0.0).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
        assert_eq!(cache.get(&"t3-99".to_string()), Some(vec![3]));
    }

    #[test]
    fn test_same_key_same_shard() {
        let cache: ShardedCache<String, Vec<u8>> =
            ShardedCache::new(EvictionPolicy::Lru, CacheLimits::entries(16), 4);
        let key = "stable".to_string();
        assert_eq!(cache.shard_index(&key), cache.shard_index(&key.clone()));
        cache.put(key.clone(), vec![1], 0.0).unwrap();
        cache.put(key.clone(), vec![2], 0.0).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key), Some(vec![2]));
    }
}
