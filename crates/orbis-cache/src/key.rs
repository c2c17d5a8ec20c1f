//! Cache keys and size estimation.

use std::sync::Arc;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::CacheError;

/// Network positions compare equal when they agree to within this step.
pub const POSITION_QUANTUM: f64 = 1e-3;

/// UV bounds are stored on a grid this many bits finer than the patch size
/// at the key's level.
pub const UV_SUBCELL_BITS: u8 = 10;

/// Finest UV grid exponent; keeps quantized bounds exact in an `f64`.
const MAX_UV_EXPONENT: i32 = 52;

fn quantize(v: f64) -> i64 {
    (v / POSITION_QUANTUM).round() as i64
}

/// Quanta per unit of UV at `level`.
fn uv_scale(level: u8) -> f64 {
    let exponent = (i32::from(level) + i32::from(UV_SUBCELL_BITS)).min(MAX_UV_EXPONENT);
    2f64.powi(exponent)
}

/// A value usable as a cache key.
pub trait CacheKey: std::hash::Hash + Eq + Clone + std::fmt::Debug {
    /// Keys failing this are rejected at the call boundary.
    fn is_valid(&self) -> bool;
}

impl CacheKey for String {
    fn is_valid(&self) -> bool {
        !self.is_empty()
    }
}

impl CacheKey for &str {
    fn is_valid(&self) -> bool {
        !self.is_empty()
    }
}

/// Approximate heap footprint used for byte budgets.
pub trait CacheWeight {
    fn estimated_bytes(&self) -> usize;
}

impl CacheWeight for Vec<u8> {
    fn estimated_bytes(&self) -> usize {
        self.len()
    }
}

impl CacheWeight for String {
    fn estimated_bytes(&self) -> usize {
        self.len()
    }
}

impl<T: CacheWeight + ?Sized> CacheWeight for Arc<T> {
    fn estimated_bytes(&self) -> usize {
        (**self).estimated_bytes()
    }
}

/// Identity of a generated patch: face, level, UV bounds and seed.
///
/// UV bounds are stored on a grid `2^UV_SUBCELL_BITS` times finer than a
/// patch at `level`, so equality within the tolerance and hashing agree and
/// neighbouring patches never collapse onto the same bounds at any depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub face: u8,
    pub level: u8,
    uv_min: [i64; 2],
    uv_max: [i64; 2],
    pub seed: u32,
}

impl ChunkKey {
    /// Rejects non-finite bounds.
    pub fn new(face: u8, level: u8, uv_min: DVec2, uv_max: DVec2, seed: u32) -> Result<Self, CacheError> {
        if !(uv_min.is_finite() && uv_max.is_finite()) {
            return Err(CacheError::InvalidKey(format!(
                "non-finite bounds {uv_min} .. {uv_max}"
            )));
        }
        let scale = uv_scale(level);
        let cell = |v: f64| (v * scale).round() as i64;
        Ok(Self {
            face,
            level,
            uv_min: [cell(uv_min.x), cell(uv_min.y)],
            uv_max: [cell(uv_max.x), cell(uv_max.y)],
            seed,
        })
    }

    #[must_use]
    pub fn uv_min(&self) -> DVec2 {
        DVec2::new(self.uv_min[0] as f64, self.uv_min[1] as f64) / uv_scale(self.level)
    }

    #[must_use]
    pub fn uv_max(&self) -> DVec2 {
        DVec2::new(self.uv_max[0] as f64, self.uv_max[1] as f64) / uv_scale(self.level)
    }
}

impl CacheKey for ChunkKey {
    fn is_valid(&self) -> bool {
        self.face < 6 && self.uv_min[0] < self.uv_max[0] && self.uv_min[1] < self.uv_max[1]
    }
}

/// A world position quantized to [`POSITION_QUANTUM`] for network lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey([i64; 3]);

impl PositionKey {
    /// Rejects non-finite positions.
    pub fn new(position: DVec3) -> Result<Self, CacheError> {
        if !position.is_finite() {
            return Err(CacheError::InvalidKey(format!("non-finite position {position}")));
        }
        Ok(Self([
            quantize(position.x),
            quantize(position.y),
            quantize(position.z),
        ]))
    }

    #[must_use]
    pub fn position(&self) -> DVec3 {
        DVec3::new(self.0[0] as f64, self.0[1] as f64, self.0[2] as f64) * POSITION_QUANTUM
    }
}

impl CacheKey for PositionKey {
    fn is_valid(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheLimits, EvictionPolicy, PolicyCache};

    #[test]
    fn test_chunk_key_equal_within_tolerance() {
        let a = ChunkKey::new(0, 2, DVec2::new(0.25, 0.5), DVec2::new(0.5, 0.75), 9).unwrap();
        let b = ChunkKey::new(0, 2, DVec2::new(0.2500001, 0.4999999), DVec2::new(0.5, 0.75), 9)
            .unwrap();
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_chunk_key_components_matter() {
        let base = ChunkKey::new(0, 1, DVec2::ZERO, DVec2::splat(0.5), 1).unwrap();
        assert_ne!(base, ChunkKey::new(1, 1, DVec2::ZERO, DVec2::splat(0.5), 1).unwrap());
        assert_ne!(base, ChunkKey::new(0, 2, DVec2::ZERO, DVec2::splat(0.5), 1).unwrap());
        assert_ne!(base, ChunkKey::new(0, 1, DVec2::ZERO, DVec2::splat(0.5), 2).unwrap());
        assert_ne!(base, ChunkKey::new(0, 1, DVec2::ZERO, DVec2::splat(0.502), 1).unwrap());
    }

    #[test]
    fn test_chunk_key_rejects_nan() {
        let err = ChunkKey::new(0, 0, DVec2::new(f64::NAN, 0.0), DVec2::ONE, 0).unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey(_)));
    }

    #[test]
    fn test_chunk_key_validity() {
        assert!(ChunkKey::new(5, 0, DVec2::ZERO, DVec2::ONE, 0).unwrap().is_valid());
        assert!(!ChunkKey::new(6, 0, DVec2::ZERO, DVec2::ONE, 0).unwrap().is_valid());
        assert!(!ChunkKey::new(0, 0, DVec2::ONE, DVec2::ZERO, 0).unwrap().is_valid());
    }

    #[test]
    fn test_deep_level_keys_stay_distinct() {
        let level = 12;
        let cells = 1u32 << level;
        let size = 1.0 / f64::from(cells);
        let mut cache: PolicyCache<ChunkKey, Vec<u8>> =
            PolicyCache::new(EvictionPolicy::Lru, CacheLimits::entries(cells as usize));
        for i in 0..cells {
            let min = DVec2::new(f64::from(i) * size, 0.5);
            let key = ChunkKey::new(2, level, min, min + DVec2::splat(size), 7).unwrap();
            assert!(key.is_valid(), "cell {i} collapsed: {key:?}");
            assert!((key.uv_min() - min).length() < 1e-12);
            cache.put(key, vec![0; 4], 1.0).unwrap();
        }
        assert_eq!(cache.len(), cells as usize, "every level-12 cell has its own key");

        let level10 = ChunkKey::new(
            0,
            10,
            DVec2::new(21.0 / 1024.0, 0.0),
            DVec2::new(22.0 / 1024.0, 1.0 / 1024.0),
            1,
        )
        .unwrap();
        assert!(level10.is_valid());
    }

    #[test]
    fn test_position_key() {
        let p = DVec3::new(1.0, -2.5, 3.25);
        assert!((PositionKey::new(p).unwrap().position() - p).length() < 1e-9);
        assert!(PositionKey::new(DVec3::new(f64::INFINITY, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_string_keys() {
        assert!(!String::new().is_valid());
        assert!("chunk".is_valid());
    }
}
