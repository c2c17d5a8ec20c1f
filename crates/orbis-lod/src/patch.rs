//! Identity of one quadtree patch.

use glam::DVec3;
use orbis_cubesphere::{CubeFace, UvRect, face_uv_to_direction};
use orbis_terrain::patch_seed;
use serde::{Deserialize, Serialize};

/// Fewest grid cells per patch edge.
pub const MIN_PATCH_RESOLUTION: u32 = 2;
/// Most grid cells per patch edge.
pub const MAX_PATCH_RESOLUTION: u32 = 16;

/// Grid cells per edge for a patch at `level`: `base >> level`, clamped to
/// `[MIN_PATCH_RESOLUTION, MAX_PATCH_RESOLUTION]`.
#[must_use]
pub fn patch_resolution(base_resolution: u32, level: u8) -> u32 {
    base_resolution
        .checked_shr(u32::from(level))
        .unwrap_or(0)
        .clamp(MIN_PATCH_RESOLUTION, MAX_PATCH_RESOLUTION)
}

/// A rectangle of one cube face at one subdivision level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub face: CubeFace,
    pub level: u8,
    pub bounds: UvRect,
}

impl Patch {
    /// Level-0 patch covering all of `face`.
    #[must_use]
    pub fn root(face: CubeFace) -> Self {
        Self {
            face,
            level: 0,
            bounds: UvRect::FULL,
        }
    }

    /// Seed for every random stream used while building this patch.
    #[must_use]
    pub fn seed(&self) -> u32 {
        patch_seed(self.level, self.bounds.min, self.bounds.max)
    }

    /// The four quadrant patches one level down, in bottom-left, bottom-right,
    /// top-left, top-right order. `None` at the deepest representable level.
    #[must_use]
    pub fn try_children(&self) -> Option<[Patch; 4]> {
        let level = self.level.checked_add(1)?;
        Some(self.bounds.quadrants().map(|bounds| Patch {
            face: self.face,
            level,
            bounds,
        }))
    }

    /// Like [`try_children`](Self::try_children) for patches known to be
    /// splittable. At `u8::MAX` the quadrants keep the parent's level.
    #[must_use]
    pub fn children(&self) -> [Patch; 4] {
        self.try_children().unwrap_or_else(|| {
            self.bounds.quadrants().map(|bounds| Patch {
                face: self.face,
                level: self.level,
                bounds,
            })
        })
    }

    /// Unit direction through the middle of the patch.
    #[must_use]
    pub fn center_direction(&self) -> DVec3 {
        let mid = self.bounds.mid();
        face_uv_to_direction(self.face, mid.x, mid.y)
    }

    /// Point on a sphere of `radius` under the middle of the patch.
    #[must_use]
    pub fn center(&self, radius: f64) -> DVec3 {
        self.center_direction() * radius
    }

    #[must_use]
    pub fn resolution(&self, base_resolution: u32) -> u32 {
        patch_resolution(base_resolution, self.level)
    }
}
