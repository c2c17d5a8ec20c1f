//! Raw patch geometry: noise heights on a UV grid, lifted onto the sphere.

use glam::DVec3;
use orbis_cubesphere::face_uv_to_direction;
use orbis_mesh::{MeshData, build_grid_mesh};
use orbis_terrain::{HeightGrid, NoiseSynthesizer};
use serde::{Deserialize, Serialize};

use crate::Patch;

/// Unit directions of the `(resolution + 1)²` grid samples, row-major.
///
/// Sample `(x, y)` sits at `bounds.lerp(x / resolution, y / resolution)`.
#[must_use]
pub fn sample_directions(patch: &Patch, resolution: u32) -> Vec<DVec3> {
    let side = resolution as usize + 1;
    let step = 1.0 / f64::from(resolution.max(1));
    let mut directions = Vec::with_capacity(side * side);
    for y in 0..side {
        for x in 0..side {
            let uv = patch.bounds.lerp(x as f64 * step, y as f64 * step);
            directions.push(face_uv_to_direction(patch.face, uv.x, uv.y));
        }
    }
    directions
}

/// Noise height at every direction of a `resolution` grid.
#[must_use]
pub fn sample_heights(directions: &[DVec3], resolution: u32, noise: &NoiseSynthesizer) -> HeightGrid {
    let side = resolution as usize + 1;
    HeightGrid::from_fn(resolution as usize, |x, y| noise.height(directions[y * side + x]))
}

/// Heights, sample directions and the derived mesh of one patch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchGeometry {
    pub resolution: u32,
    pub directions: Vec<DVec3>,
    pub heights: HeightGrid,
    pub mesh: MeshData,
}

impl PatchGeometry {
    /// Sample noise over `patch` and build its mesh, with no further shaping.
    #[must_use]
    pub fn generate(patch: &Patch, base_resolution: u32, radius: f64, noise: &NoiseSynthesizer) -> Self {
        let resolution = patch.resolution(base_resolution);
        let directions = sample_directions(patch, resolution);
        let heights = sample_heights(&directions, resolution, noise);
        Self::from_heights(directions, heights, radius)
    }

    /// Mesh `heights` with every vertex at `direction * (radius + height)`.
    #[must_use]
    pub fn from_heights(directions: Vec<DVec3>, heights: HeightGrid, radius: f64) -> Self {
        let resolution = heights.resolution() as u32;
        let positions = directions
            .iter()
            .zip(heights.heights())
            .map(|(dir, &h)| (*dir * (radius + h)).as_vec3())
            .collect();
        Self {
            resolution,
            mesh: build_grid_mesh(positions, resolution),
            directions,
            heights,
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    /// World-space vertex position in double precision.
    #[must_use]
    pub fn position(&self, index: usize, radius: f64) -> Option<DVec3> {
        let dir = self.directions.get(index)?;
        Some(*dir * (radius + self.heights.heights().get(index)?))
    }
}

#[cfg(test)]
mod tests {
    use orbis_config::NoiseConfig;
    use orbis_cubesphere::CubeFace;

    use super::*;

    fn noise() -> NoiseSynthesizer {
        NoiseSynthesizer::new(&NoiseConfig {
            seed: 1337,
            ..NoiseConfig::default()
        })
    }

    #[test]
    fn test_vertex_count_matches_resolution() {
        let noise = noise();
        for level in 0..4u8 {
            let mut patch = Patch::root(CubeFace::PosZ);
            for _ in 0..level {
                patch = patch.children()[0];
            }
            let geometry = PatchGeometry::generate(&patch, 8, 1000.0, &noise);
            let n = patch.resolution(8) as usize;
            assert_eq!(geometry.vertex_count(), (n + 1) * (n + 1), "level {level}");
            assert_eq!(geometry.mesh.triangle_count(), 2 * n * n);
        }
    }

    #[test]
    fn test_vertices_sit_at_radius_plus_height() {
        let noise = noise();
        let patch = Patch::root(CubeFace::NegY);
        let geometry = PatchGeometry::generate(&patch, 4, 500.0, &noise);
        for (i, dir) in geometry.directions.iter().enumerate() {
            let h = noise.height(*dir);
            let expected = *dir * (500.0 + h);
            let got = geometry.position(i, 500.0).unwrap();
            assert!((got - expected).length() < 1e-9);
            assert!((geometry.mesh.positions[i].as_dvec3() - expected).length() < 1e-2);
        }
    }

    #[test]
    fn test_grid_corners_follow_bounds() {
        let patch = Patch::root(CubeFace::PosX).children()[3];
        let dirs = sample_directions(&patch, 2);
        assert_eq!(dirs.len(), 9);
        let first = face_uv_to_direction(CubeFace::PosX, 0.5, 0.5);
        let last = face_uv_to_direction(CubeFace::PosX, 1.0, 1.0);
        assert!((dirs[0] - first).length() < 1e-12);
        assert!((dirs[8] - last).length() < 1e-12);
    }

    #[test]
    fn test_regeneration_is_identical() {
        let noise = noise();
        let patch = Patch::root(CubeFace::PosY).children()[1];
        let a = PatchGeometry::generate(&patch, 8, 1000.0, &noise);
        let b = PatchGeometry::generate(&patch, 8, 1000.0, &noise);
        assert_eq!(a, b);
    }
}
