//! Regular grid topology shared by every patch.

use glam::Vec2;

/// Triangle indices for a `resolution × resolution` cell grid of
/// `(resolution + 1)²` row-major vertices.
///
/// Each cell `(x, y)` with corners `i0 = y·(N+1)+x`, `i1 = i0+1`,
/// `i2 = i0+N+1`, `i3 = i2+1` emits `[i0, i2, i1]` and `[i1, i2, i3]`.
#[must_use]
pub fn grid_indices(resolution: u32) -> Vec<u32> {
    let side = resolution + 1;
    let mut indices = Vec::with_capacity((resolution * resolution * 6) as usize);
    for y in 0..resolution {
        for x in 0..resolution {
            let i0 = y * side + x;
            let i1 = i0 + 1;
            let i2 = i0 + side;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    indices
}

/// Texture coordinates `(x / N, y / N)` for every grid vertex.
#[must_use]
pub fn grid_uvs(resolution: u32) -> Vec<Vec2> {
    let side = resolution + 1;
    let inv = 1.0 / resolution.max(1) as f32;
    (0..side)
        .flat_map(|y| (0..side).map(move |x| Vec2::new(x as f32 * inv, y as f32 * inv)))
        .collect()
}
