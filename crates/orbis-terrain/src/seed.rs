//! Per-patch seed derivation.
//!
//! A patch seed depends only on the patch's level and UV bounds, so the same
//! patch regenerated anywhere (another thread, another peer) gets the same
//! random stream for erosion and scatter.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::DVec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// 32-bit seed for the patch at `level` covering `[uv_min, uv_max]`.
///
/// Hashes the exact bit patterns of the bounds with SipHash and folds the
/// 64-bit digest into 32 bits.
#[must_use]
pub fn patch_seed(level: u8, uv_min: DVec2, uv_max: DVec2) -> u32 {
    let mut hasher = DefaultHasher::new();
    level.hash(&mut hasher);
    for c in [uv_min.x, uv_min.y, uv_max.x, uv_max.y] {
        c.to_bits().hash(&mut hasher);
    }
    let digest = hasher.finish();
    (digest ^ (digest >> 32)) as u32
}

/// Reproducible random stream for a patch.
#[must_use]
pub fn patch_rng(seed: u32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(u64::from(seed))
}
