//! Patch → chunk generation.

use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use orbis_lod::{Patch, PatchGeometry, sample_directions, sample_heights};
use orbis_terrain::{Biome, climate, extract_water};

use crate::events::PlanetEvent;
use crate::{Chunk, GenerationContext, GenerationError};

/// Runs every terrain stage for one patch against a captured context.
#[derive(Clone, Debug)]
pub struct ChunkPipeline {
    ctx: GenerationContext,
}

impl ChunkPipeline {
    #[must_use]
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    /// Build the chunk for `patch`.
    pub fn generate(&self, patch: &Patch) -> Result<Chunk, GenerationError> {
        self.generate_cancellable(patch, &AtomicBool::new(false))
    }

    /// Like [`generate`](Self::generate), but gives up between stages once
    /// `cancel` is set. Nothing is emitted for an abandoned chunk.
    pub fn generate_cancellable(&self, patch: &Patch, cancel: &AtomicBool) -> Result<Chunk, GenerationError> {
        let start = Instant::now();
        let config = self.ctx.config();
        let generation = &config.generation;
        let events = self.ctx.events();
        let radius = generation.base_radius;

        if patch.level > generation.max_lod {
            return Err(self.reject(GenerationError::InvalidLod {
                lod: patch.level,
                max: generation.max_lod,
            }));
        }
        let center = patch.center(radius);
        if !center.is_finite() {
            return Err(self.reject(GenerationError::NonFiniteCenter(center)));
        }
        let key = Chunk::key_for(patch).map_err(|_| self.reject(GenerationError::NonFiniteCenter(center)))?;
        let seed = patch.seed();
        let cancelled = || cancel.load(Ordering::Relaxed);

        let resolution = patch.resolution(generation.base_resolution);
        let directions = sample_directions(patch, resolution);
        let mut heights = sample_heights(&directions, resolution, self.ctx.noise());
        if cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let erosion = if generation.enable_erosion && self.ctx.erosion().any_enabled() {
            let report = self.ctx.erosion().apply(&mut heights, seed);
            events.emit(PlanetEvent::ErosionApplied { key, report });
            Some(report)
        } else {
            None
        };
        if cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let side = heights.side();
        let cell_size = radius * FRAC_PI_2 * patch.bounds.size().x / f64::from(resolution);
        let mut biomes: Vec<Biome> = Vec::with_capacity(heights.len());
        for y in 0..side {
            for x in 0..side {
                let i = heights.index(x, y);
                let altitude = self.ctx.noise().normalize(heights.get(x, y));
                let gradient = heights.slope(x, y, cell_size);
                let sample = climate::sample(directions[i], altitude, gradient);
                biomes.push(self.ctx.classifier().classify_sample(&sample));
            }
        }
        self.ctx.classifier().smooth(&mut biomes, side);

        let vegetation = if !generation.enable_vegetation {
            Vec::new()
        } else if self.ctx.vegetation().is_empty() {
            tracing::warn!(?key, "vegetation enabled but the catalog is empty, skipping scatter");
            Vec::new()
        } else {
            let sea_level = generation.sea_level;
            let samples = directions
                .iter()
                .zip(heights.heights())
                .zip(&biomes)
                .filter(|&((_, &h), _)| h >= sea_level)
                .map(|((dir, &h), &biome)| (*dir * (radius + h), biome));
            let placed = self.ctx.vegetation().scatter(samples, seed, &config.vegetation);
            events.emit(PlanetEvent::VegetationSpawned {
                key,
                instances: placed.len(),
            });
            placed
        };

        let water = generation.enable_water.then(|| {
            let water = extract_water(&heights, &directions, radius, generation.sea_level);
            events.emit(PlanetEvent::WaterSimulated {
                key,
                ocean_points: water.ocean_points.len(),
                rivers: water.rivers.len(),
            });
            water
        });
        if cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let geometry = PatchGeometry::from_heights(directions, heights, radius);
        let generation_time_us = start.elapsed().as_micros() as u64;
        let chunk = Chunk {
            patch: *patch,
            seed,
            center,
            lod: patch.level,
            geometry,
            biomes,
            vegetation,
            water,
            erosion,
            generation_time_us,
        };

        events.emit(PlanetEvent::BiomeCalculated {
            key,
            dominant: chunk.dominant_biome(),
        });
        let elapsed_ms = generation_time_us as f64 / 1000.0;
        if elapsed_ms > config.debug.slow_chunk_ms {
            tracing::warn!(?key, elapsed_ms, "slow chunk generation");
            events.emit(PlanetEvent::PerformanceWarning {
                message: format!("chunk at level {} took {elapsed_ms:.1}ms", patch.level),
                value: elapsed_ms,
            });
        }
        events.emit(PlanetEvent::ChunkGenerated {
            key,
            lod: chunk.lod,
            vertices: chunk.geometry.vertex_count(),
            elapsed_us: generation_time_us,
        });
        tracing::trace!(?key, vertices = chunk.geometry.vertex_count(), generation_time_us, "chunk generated");
        Ok(chunk)
    }

    fn reject(&self, error: GenerationError) -> GenerationError {
        tracing::warn!(%error, "chunk request rejected");
        self.ctx.events().emit(PlanetEvent::ErrorOccurred {
            message: error.to_string(),
        });
        error
    }
}
