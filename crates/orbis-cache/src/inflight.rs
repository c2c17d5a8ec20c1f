//! Claims that keep two workers from building the same key.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::CacheKey;

/// Registry of keys currently being generated.
///
/// Cloning shares the registry.
#[derive(Debug)]
pub struct InFlightRegistry<K: CacheKey> {
    claims: Arc<DashMap<K, Arc<AtomicBool>>>,
}

impl<K: CacheKey> Clone for InFlightRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
        }
    }
}

impl<K: CacheKey> Default for InFlightRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey> InFlightRegistry<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            claims: Arc::new(DashMap::new()),
        }
    }

    /// Claim `key`, or `None` if another holder already has it.
    pub fn try_claim(&self, key: K) -> Option<InFlightGuard<K>> {
        let flag = Arc::new(AtomicBool::new(false));
        match self.claims.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&flag));
                Some(InFlightGuard {
                    key,
                    flag,
                    claims: Arc::clone(&self.claims),
                })
            }
        }
    }

    #[must_use]
    pub fn is_claimed(&self, key: &K) -> bool {
        self.claims.contains_key(key)
    }

    /// Ask the holder of `key` to abandon its work. Returns false if unclaimed.
    pub fn cancel(&self, key: &K) -> bool {
        match self.claims.get(key) {
            Some(flag) => {
                flag.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Exclusive claim on a key; released on drop.
#[derive(Debug)]
pub struct InFlightGuard<K: CacheKey> {
    key: K,
    flag: Arc<AtomicBool>,
    claims: Arc<DashMap<K, Arc<AtomicBool>>>,
}

impl<K: CacheKey> InFlightGuard<K> {
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// The shared flag, for handing to code that only polls for cancellation.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl<K: CacheKey> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        self.claims
            .remove_if(&self.key, |_, flag| Arc::ptr_eq(flag, &self.flag));
    }
}
