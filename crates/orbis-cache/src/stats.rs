use serde::{Deserialize, Serialize};

/// Counters for one cache. Every lookup is exactly one hit or one miss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    /// Puts that replaced an existing key.
    pub updates: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Puts refused because the entry could never fit.
    pub rejections: u64,
    pub removals: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or 0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    /// Hit rate scaled by how full the cache is.
    #[must_use]
    pub fn efficiency(&self, len: usize, max_entries: usize) -> f64 {
        if max_entries == 0 {
            return 0.0;
        }
        self.hit_rate() * (len as f64 / max_entries as f64)
    }

    /// Field-wise sum, for aggregating shards.
    #[must_use]
    pub fn merged(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            insertions: self.insertions + other.insertions,
            updates: self.updates + other.updates,
            evictions: self.evictions + other.evictions,
            expirations: self.expirations + other.expirations,
            rejections: self.rejections + other.rejections,
            removals: self.removals + other.removals,
        }
    }
}
