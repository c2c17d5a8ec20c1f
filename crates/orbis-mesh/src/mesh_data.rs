//! Renderable mesh arrays and their derivation from positions and UVs.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::{TerrainVertex, grid_indices, grid_uvs, lod_triangle_target, simplify_triangles};

/// UV-space determinants smaller than this are treated as degenerate.
const DEGENERATE_UV_DET: f32 = 1e-12;

/// Parallel vertex arrays plus a triangle list, as handed to a renderer.
///
/// Triangles wind clockwise seen from outside the planet; the face normal of
/// `[a, b, c]` is `(c - a) × (b - a)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// xyz is the tangent, w the bitangent handedness (±1).
    pub tangents: Vec<Vec4>,
}

/// Assemble a mesh, deriving normals and tangents.
///
/// Indices referencing missing vertices are dropped along with their triangle.
/// Missing UVs are filled with zero.
#[must_use]
pub fn build_mesh(positions: Vec<Vec3>, mut uvs: Vec<Vec2>, indices: Vec<u32>) -> MeshData {
    let n = positions.len();
    uvs.resize(n, Vec2::ZERO);
    let indices: Vec<u32> = indices
        .chunks_exact(3)
        .filter(|t| t.iter().all(|&i| (i as usize) < n))
        .flatten()
        .copied()
        .collect();

    let normals = compute_normals(&positions, &indices);
    let tangents = compute_tangents(&positions, &uvs, &normals, &indices);
    MeshData {
        positions,
        indices,
        normals,
        uvs,
        tangents,
    }
}

/// Mesh for a `(resolution + 1)²` row-major vertex grid.
#[must_use]
pub fn build_grid_mesh(positions: Vec<Vec3>, resolution: u32) -> MeshData {
    build_mesh(positions, grid_uvs(resolution), grid_indices(resolution))
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (c - a).cross(b - a).normalize_or_zero()
}

/// Sum of unit face normals around each vertex, renormalized.
#[must_use]
pub fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let n = face_normal(positions[a], positions[b], positions[c]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

/// Per-vertex tangents from each triangle's UV Jacobian.
#[must_use]
pub fn compute_tangents(positions: &[Vec3], uvs: &[Vec2], normals: &[Vec3], indices: &[u32]) -> Vec<Vec4> {
    let mut tan = vec![Vec3::ZERO; positions.len()];
    let mut bitan = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let e1 = positions[b] - positions[a];
        let e2 = positions[c] - positions[a];
        let d1 = uvs[b] - uvs[a];
        let d2 = uvs[c] - uvs[a];
        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < DEGENERATE_UV_DET {
            continue;
        }
        let r = 1.0 / det;
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let bt = (e2 * d1.x - e1 * d2.x) * r;
        for i in [a, b, c] {
            tan[i] += t;
            bitan[i] += bt;
        }
    }

    normals
        .iter()
        .zip(tan.iter().zip(&bitan))
        .map(|(&n, (&t, &b))| {
            // Gram-Schmidt against the normal.
            let mut t = (t - n * n.dot(t)).normalize_or_zero();
            if t == Vec3::ZERO {
                t = if n == Vec3::ZERO {
                    Vec3::X
                } else {
                    n.any_orthonormal_vector()
                };
            }
            let w = if n.cross(t).dot(b) < 0.0 { -1.0 } else { 1.0 };
            t.extend(w)
        })
        .collect()
}

const UNUSED: u32 = u32::MAX;

fn remapped<T: Copy + Default>(values: &[T], remap: &[u32], len: usize) -> Vec<T> {
    let mut out = vec![T::default(); len];
    for (old, &new) in remap.iter().enumerate() {
        if new != UNUSED
            && let Some(&v) = values.get(old)
        {
            out[new as usize] = v;
        }
    }
    out
}

impl MeshData {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Coarser copy for `lod`: stride-simplified triangles, unused vertices dropped.
    #[must_use]
    pub fn for_lod(&self, lod: u32) -> MeshData {
        if lod == 0 {
            return self.clone();
        }
        let target = lod_triangle_target(self.triangle_count(), lod);
        let mut coarse = MeshData {
            indices: simplify_triangles(&self.indices, target),
            ..self.clone()
        };
        coarse.compact();
        coarse
    }

    /// Drop vertices no triangle references and remap indices.
    pub fn compact(&mut self) {
        let mut remap = vec![UNUSED; self.positions.len()];
        let mut next = 0u32;
        for &i in &self.indices {
            let slot = &mut remap[i as usize];
            if *slot == UNUSED {
                *slot = next;
                next += 1;
            }
        }
        if next as usize == self.positions.len() {
            return;
        }

        let len = next as usize;
        self.positions = remapped(&self.positions, &remap, len);
        self.normals = remapped(&self.normals, &remap, len);
        self.uvs = remapped(&self.uvs, &remap, len);
        self.tangents = remapped(&self.tangents, &remap, len);
        for i in &mut self.indices {
            *i = remap[*i as usize];
        }
    }

    /// Interleave into the packed upload format.
    #[must_use]
    pub fn packed(&self) -> Vec<TerrainVertex> {
        (0..self.positions.len())
            .map(|i| {
                TerrainVertex::new(
                    self.positions[i],
                    self.normals.get(i).copied().unwrap_or(Vec3::ZERO),
                    self.uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                    self.tangents.get(i).copied().unwrap_or(Vec4::X),
                )
            })
            .collect()
    }
}
