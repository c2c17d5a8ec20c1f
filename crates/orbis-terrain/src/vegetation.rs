//! Seeded vegetation scatter over classified samples.

use glam::DVec3;
use hashbrown::HashMap;
use orbis_config::VegetationConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Biome, patch_rng};

/// Mixed into the patch seed so scatter does not replay the erosion stream.
const SCATTER_SEED_MIX: u32 = 0xA5A5_A5A5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VegetationKind {
    Tree,
    Shrub,
    Grass,
    Cactus,
    Lichen,
}

/// One plant species a biome can host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VegetationType {
    pub kind: VegetationKind,
    /// Chance per sample before the global density multiplier.
    pub spawn_probability: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl VegetationType {
    #[must_use]
    pub const fn new(kind: VegetationKind, spawn_probability: f64, min_scale: f64, max_scale: f64) -> Self {
        Self {
            kind,
            spawn_probability,
            min_scale,
            max_scale,
        }
    }
}

/// A placed plant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VegetationInstance {
    pub kind: VegetationKind,
    pub position: DVec3,
    /// Rotation about the local up axis, in radians.
    pub yaw: f64,
    pub scale: f64,
}

/// Which vegetation types grow in which biome.
#[derive(Clone, Debug)]
pub struct VegetationCatalog {
    by_biome: HashMap<Biome, Vec<VegetationType>>,
}

impl Default for VegetationCatalog {
    fn default() -> Self {
        use VegetationKind::*;
        let mut catalog = Self::empty();
        catalog.register(Biome::Forest, VegetationType::new(Tree, 0.4, 0.8, 1.4));
        catalog.register(Biome::Forest, VegetationType::new(Shrub, 0.2, 0.5, 1.0));
        catalog.register(Biome::Plains, VegetationType::new(Grass, 0.3, 0.6, 1.2));
        catalog.register(Biome::Plains, VegetationType::new(Tree, 0.05, 0.7, 1.1));
        catalog.register(Biome::Beach, VegetationType::new(Shrub, 0.05, 0.4, 0.8));
        catalog.register(Biome::Mountain, VegetationType::new(Shrub, 0.1, 0.4, 0.9));
        catalog.register(Biome::Desert, VegetationType::new(Cactus, 0.08, 0.6, 1.3));
        catalog.register(Biome::Snow, VegetationType::new(Lichen, 0.02, 0.3, 0.6));
        catalog
    }
}

impl VegetationCatalog {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_biome: HashMap::new(),
        }
    }

    /// True when no biome has any vegetation type.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_biome.values().all(Vec::is_empty)
    }

    pub fn register(&mut self, biome: Biome, vegetation: VegetationType) {
        self.by_biome.entry(biome).or_default().push(vegetation);
    }

    #[must_use]
    pub fn types_for(&self, biome: Biome) -> &[VegetationType] {
        self.by_biome.get(&biome).map(Vec::as_slice).unwrap_or_default()
    }

    /// Place instances over `samples` (position and biome per sample).
    ///
    /// Water samples never host vegetation. Output is capped at
    /// `config.max_instances_per_chunk` and depends only on `seed`.
    #[must_use]
    pub fn scatter(
        &self,
        samples: impl IntoIterator<Item = (DVec3, Biome)>,
        seed: u32,
        config: &VegetationConfig,
    ) -> Vec<VegetationInstance> {
        let mut placed = Vec::new();
        if config.max_instances_per_chunk == 0 {
            return placed;
        }
        let mut rng = patch_rng(seed ^ SCATTER_SEED_MIX);

        'samples: for (position, biome) in samples {
            if biome.is_water() {
                continue;
            }
            for vegetation in self.types_for(biome) {
                let roll: f64 = rng.random();
                if roll >= vegetation.spawn_probability * config.density {
                    continue;
                }
                let yaw = rng.random_range(0.0..std::f64::consts::TAU);
                let scale = if vegetation.max_scale > vegetation.min_scale {
                    rng.random_range(vegetation.min_scale..vegetation.max_scale)
                } else {
                    vegetation.min_scale
                };
                placed.push(VegetationInstance {
                    kind: vegetation.kind,
                    position,
                    yaw,
                    scale,
                });
                if placed.len() >= config.max_instances_per_chunk {
                    break 'samples;
                }
            }
        }
        placed
    }
}
