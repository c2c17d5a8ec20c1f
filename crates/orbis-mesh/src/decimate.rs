//! Stride decimation for coarse LODs.
//!
//! These keep every Kth vertex or triangle. They are cheap and do not
//! preserve topology; that is acceptable for distant patches.

/// Vertex budget never decimated below.
pub const MIN_LOD_VERTICES: usize = 100;

/// Triangle budget never simplified below.
pub const MIN_LOD_TRIANGLES: usize = 100;

/// Keep `max(100, n / 2^lod)` vertices (never more than `n`), sampling
/// `v[floor(i * n / target)]`. `lod == 0` returns a copy.
#[must_use]
pub fn decimate_vertices<T: Copy>(vertices: &[T], lod: u32) -> Vec<T> {
    if lod == 0 || vertices.is_empty() {
        return vertices.to_vec();
    }
    let n = vertices.len();
    let target = (n >> lod.min(usize::BITS - 1)).max(MIN_LOD_VERTICES).min(n);
    let step = n as f64 / target as f64;
    (0..target)
        .map(|i| vertices[((i as f64 * step) as usize).min(n - 1)])
        .collect()
}

/// Keep roughly `target` triangles by taking every `max(1, len / (3·target))`th one.
///
/// Index buffers already at or below `target` triangles are returned unchanged.
#[must_use]
pub fn simplify_triangles(indices: &[u32], target: usize) -> Vec<u32> {
    let triangles = indices.len() / 3;
    if triangles <= target {
        return indices[..triangles * 3].to_vec();
    }
    if target == 0 {
        return Vec::new();
    }
    let step = (indices.len() / (target * 3)).max(1);
    indices
        .chunks_exact(3)
        .step_by(step)
        .flatten()
        .copied()
        .collect()
}

/// Triangle budget for `lod`: `max(100, triangles / 2^lod)`.
#[must_use]
pub fn lod_triangle_target(triangles: usize, lod: u32) -> usize {
    (triangles >> lod.min(usize::BITS - 1)).max(MIN_LOD_TRIANGLES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lod_zero_is_identity() {
        let v: Vec<u32> = (0..500).collect();
        assert_eq!(decimate_vertices(&v, 0), v);
    }

    #[test]
    fn test_halving_takes_every_other() {
        let v: Vec<u32> = (0..1000).collect();
        let out = decimate_vertices(&v, 1);
        assert_eq!(out.len(), 500);
        assert!(out.iter().enumerate().all(|(i, &x)| x == 2 * i as u32));
    }

    #[test]
    fn test_floor_of_vertex_budget() {
        let v: Vec<u32> = (0..150).collect();
        let out = decimate_vertices(&v, 3);
        assert_eq!(out.len(), 100);
        assert_eq!(out[1], 1);
        assert_eq!(out[2], 3);

        let small: Vec<u32> = (0..40).collect();
        assert_eq!(decimate_vertices(&small, 4), small);
    }

    #[test]
    fn test_simplify_below_target_is_copy() {
        let idx: Vec<u32> = (0..30).collect();
        assert_eq!(simplify_triangles(&idx, 10), idx);
        assert_eq!(simplify_triangles(&idx, 50), idx);
    }

    #[test]
    fn test_simplify_strides_whole_triangles() {
        let idx: Vec<u32> = (0..60).collect(); // 20 triangles
        let out = simplify_triangles(&idx, 5);
        // step = 60 / 15 = 4 triangles
        assert_eq!(out, vec![0, 1, 2, 12, 13, 14, 24, 25, 26, 36, 37, 38, 48, 49, 50]);
        assert!(simplify_triangles(&idx, 0).is_empty());
    }

    #[test]
    fn test_triangle_target() {
        assert_eq!(lod_triangle_target(1000, 0), 1000);
        assert_eq!(lod_triangle_target(1000, 2), 250);
        assert_eq!(lod_triangle_target(1000, 5), 100);
    }
}
