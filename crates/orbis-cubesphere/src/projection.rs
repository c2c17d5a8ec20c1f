//! Tangent-warp projection between face UV coordinates and unit directions.
//!
//! Remapping each face coordinate through `tan(s * π/4)` before normalizing
//! evens out cell areas compared to plain cube normalization.

use std::f64::consts::FRAC_PI_4;

use glam::DVec3;

use crate::CubeFace;

/// Unit direction for the point `(u, v)` in `[0, 1]²` on `face`.
///
/// `(0.5, 0.5)` maps to the face normal.
#[inline]
#[must_use]
pub fn face_uv_to_direction(face: CubeFace, u: f64, v: f64) -> DVec3 {
    let ws = ((2.0 * u - 1.0) * FRAC_PI_4).tan();
    let wt = ((2.0 * v - 1.0) * FRAC_PI_4).tan();
    (face.normal() + ws * face.tangent() + wt * face.bitangent()).normalize()
}

/// Inverse of [`face_uv_to_direction`]. `dir` need not be normalized but must be non-zero.
#[must_use]
pub fn direction_to_face_uv(dir: DVec3) -> (CubeFace, f64, f64) {
    let face = CubeFace::from_direction(dir);
    let cube = dir / dir.dot(face.normal());
    let s = cube.dot(face.tangent());
    let t = cube.dot(face.bitangent());
    let u = (s.atan() / FRAC_PI_4 + 1.0) * 0.5;
    let v = (t.atan() / FRAC_PI_4 + 1.0) * 0.5;
    (face, u.clamp(0.0, 1.0), v.clamp(0.0, 1.0))
}
