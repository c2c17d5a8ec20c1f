//! Chunk caching.
//!
//! [`PolicyCache`] is a single-threaded keyed store bounded by entry count and
//! byte budget, evicting by LRU, LFU or a seeded random pick, with TTL expiry
//! and a proactive budget-aware [`PolicyCache::optimize`] pass.
//! [`NetworkChunkCache`] wraps it for position-keyed chunks exchanged with
//! peers, [`ShardedCache`] spreads it over lock shards for worker threads, and
//! [`InFlightRegistry`] makes sure only one worker builds a given key at a time.

mod error;
mod inflight;
mod key;
mod network;
mod policy_cache;
mod sharded;
mod stats;

pub use error::CacheError;
pub use inflight::{InFlightGuard, InFlightRegistry};
pub use key::{CacheKey, CacheWeight, ChunkKey, POSITION_QUANTUM, PositionKey, UV_SUBCELL_BITS};
pub use network::{NetworkChunkCache, NetworkStats, unix_millis};
pub use orbis_config::EvictionPolicy;
pub use policy_cache::{CacheLimits, PolicyCache};
pub use sharded::ShardedCache;
pub use stats::CacheStats;
