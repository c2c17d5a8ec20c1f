//! Terrain shaping for planet patches.
//!
//! Height comes from a domain-warped fractal noise field sampled along unit
//! directions. A patch's height grid can then be reshaped by droplet
//! hydraulic erosion plus optional thermal and wind passes, labelled with
//! biomes, scattered with vegetation and searched for ocean and river water.
//! Every stage is a pure function of its inputs and a seed, so patches can
//! be generated on any thread in any order and come out identical.

pub mod biome;
mod brush;
pub mod climate;
pub mod erosion;
mod grid;
mod noise_field;
pub mod seed;
pub mod vegetation;
pub mod water;

pub use biome::{Biome, BiomeClassifier};
pub use brush::HeightBrush;
pub use erosion::{ErosionReport, ErosionSimulator};
pub use grid::HeightGrid;
pub use noise_field::NoiseSynthesizer;
pub use seed::{patch_rng, patch_seed};
pub use vegetation::{VegetationCatalog, VegetationInstance, VegetationKind, VegetationType};
pub use water::{WaterBody, extract_water};
