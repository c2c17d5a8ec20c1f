//! The generated-data unit for one patch.

use std::mem::size_of;

use glam::{DVec3, Vec2, Vec3, Vec4};
use orbis_cache::{CacheError, CacheWeight, ChunkKey};
use orbis_lod::{Patch, PatchGeometry};
use orbis_mesh::{TerrainVertex, decimate_vertices};
use orbis_terrain::{Biome, ErosionReport, HeightBrush, VegetationInstance, WaterBody};
use serde::{Deserialize, Serialize};

/// Heights, biome labels, scatter and water for one patch at one LOD.
///
/// `biomes` runs parallel to `geometry.heights`. A changed configuration
/// produces new chunks; only [`Chunk::apply_brush`] edits one in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub patch: Patch,
    pub seed: u32,
    /// Patch center on the base sphere.
    pub center: DVec3,
    pub lod: u8,
    pub geometry: PatchGeometry,
    pub biomes: Vec<Biome>,
    /// Empty when vegetation is disabled.
    pub vegetation: Vec<VegetationInstance>,
    /// `None` when water extraction is disabled.
    pub water: Option<WaterBody>,
    /// `None` when no erosion pass ran.
    pub erosion: Option<ErosionReport>,
    pub generation_time_us: u64,
}

/// What the rendering sink uploads for one chunk at one detail step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderSection {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    /// Sea-surface points, thinned with the mesh.
    pub ocean_points: Vec<DVec3>,
}

impl Chunk {
    /// Cache identity of the chunk built for `patch`.
    pub fn key_for(patch: &Patch) -> Result<ChunkKey, CacheError> {
        ChunkKey::new(
            patch.face.index() as u8,
            patch.level,
            patch.bounds.min,
            patch.bounds.max,
            patch.seed(),
        )
    }

    pub fn key(&self) -> Result<ChunkKey, CacheError> {
        Self::key_for(&self.patch)
    }

    /// Cache priority in `(0, 1]`; coarser chunks cover more surface and are kept longer.
    #[must_use]
    pub fn priority(&self) -> f64 {
        1.0 / (1.0 + f64::from(self.lod))
    }

    #[must_use]
    pub fn heights(&self) -> &[f64] {
        self.geometry.heights.heights()
    }

    /// Most common label, ties going to the lower variant.
    #[must_use]
    pub fn dominant_biome(&self) -> Option<Biome> {
        let mut counts = [0usize; Biome::COUNT];
        for &biome in &self.biomes {
            counts[biome as usize] += 1;
        }
        let (index, &count) = counts
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
        (count > 0).then_some(Biome::ALL[index])
    }

    #[must_use]
    pub fn has_water(&self) -> bool {
        self.water.as_ref().is_some_and(|w| !w.is_empty())
    }

    /// Whether `brush` reaches any vertex of this chunk.
    #[must_use]
    pub fn touched_by(&self, brush: &HeightBrush, radius: f64) -> bool {
        brush.is_valid()
            && (0..self.geometry.directions.len())
                .filter_map(|i| self.geometry.position(i, radius))
                .any(|p| brush.falloff(p) > 0.0)
    }

    /// Sculpt heights with `brush` and rebuild the mesh. Biomes, vegetation
    /// and water keep their generated values. Returns how many samples moved.
    pub fn apply_brush(&mut self, brush: &HeightBrush, radius: f64) -> usize {
        let geometry = &mut self.geometry;
        let touched = geometry.heights.apply_brush(&geometry.directions, radius, brush);
        if touched > 0 {
            let directions = std::mem::take(&mut geometry.directions);
            let heights = geometry.heights.clone();
            *geometry = PatchGeometry::from_heights(directions, heights, radius);
        }
        touched
    }

    /// Mesh for the rendering sink, stride-decimated by `detail` steps
    /// (0 is full detail).
    #[must_use]
    pub fn render_section(&self, detail: u32) -> RenderSection {
        let mesh = self.geometry.mesh.for_lod(detail);
        let ocean_points = self
            .water
            .as_ref()
            .map(|w| decimate_vertices(&w.ocean_points, detail))
            .unwrap_or_default();
        RenderSection {
            vertices: mesh.packed(),
            indices: mesh.indices,
            ocean_points,
        }
    }
}

impl CacheWeight for Chunk {
    fn estimated_bytes(&self) -> usize {
        let mesh = &self.geometry.mesh;
        let water = self.water.as_ref().map_or(0, |w| {
            let river_points: usize = w.rivers.iter().map(Vec::len).sum();
            (w.ocean_points.len() + river_points) * size_of::<DVec3>()
        });
        size_of::<Chunk>()
            + self.geometry.directions.len() * size_of::<DVec3>()
            + self.geometry.heights.len() * size_of::<f64>()
            + mesh.positions.len() * size_of::<Vec3>()
            + mesh.normals.len() * size_of::<Vec3>()
            + mesh.uvs.len() * size_of::<Vec2>()
            + mesh.tangents.len() * size_of::<Vec4>()
            + mesh.indices.len() * size_of::<u32>()
            + self.biomes.len() * size_of::<Biome>()
            + self.vegetation.len() * size_of::<VegetationInstance>()
            + water
    }
}
