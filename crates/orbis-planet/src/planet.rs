//! One planet: patch forest, chunk cache and tick-driven upkeep.

use std::sync::Arc;
use std::time::Instant;

use orbis_cache::{CacheError, ChunkKey, PolicyCache};
use orbis_config::{Config, ConfigError};
use orbis_cubesphere::CubeFace;
use orbis_lod::{LodScheduler, PatchForest, SchedulerTick};
use orbis_terrain::HeightBrush;
use serde::{Deserialize, Serialize};

use crate::events::{EventBus, PlanetEvent};
use crate::{Chunk, ChunkPipeline, GenerationContext};

/// Counters reported by [`Planet::performance_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Chunks built by the pipeline since creation.
    pub total_generated: u64,
    /// Leaves served from the cache instead of being built.
    pub cached_used: u64,
    pub hit_rate: f64,
    pub cache_entries: usize,
    pub cache_bytes: usize,
}

/// What one [`Planet::update_lod`] pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LodPass {
    pub splits: usize,
    pub leaves: usize,
    pub generated: usize,
    pub cached: usize,
    pub failed: usize,
}

pub struct Planet {
    pipeline: ChunkPipeline,
    forest: PatchForest<Arc<Chunk>>,
    cache: PolicyCache<ChunkKey, Arc<Chunk>>,
    scheduler: LodScheduler,
    max_lod: u8,
    total_generated: u64,
    cached_used: u64,
    announced: bool,
}

impl Planet {
    #[must_use]
    pub fn new(ctx: GenerationContext) -> Self {
        let config = ctx.config();
        Self {
            cache: PolicyCache::from_config(&config.cache),
            scheduler: LodScheduler::from_config(&config.generation),
            max_lod: config.generation.max_lod,
            forest: PatchForest::new(),
            pipeline: ChunkPipeline::new(ctx),
            total_generated: 0,
            cached_used: 0,
            announced: false,
        }
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        Ok(Self::new(GenerationContext::new(config)?))
    }

    #[must_use]
    pub fn context(&self) -> &GenerationContext {
        self.pipeline.context()
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        self.context().events()
    }

    #[must_use]
    pub fn forest(&self) -> &PatchForest<Arc<Chunk>> {
        &self.forest
    }

    #[must_use]
    pub fn cache(&self) -> &PolicyCache<ChunkKey, Arc<Chunk>> {
        &self.cache
    }

    #[must_use]
    pub fn max_lod(&self) -> u8 {
        self.max_lod
    }

    /// Change the target depth, capped at the configured maximum. Lowering
    /// it collapses deeper branches; their chunks stay cached.
    pub fn set_max_lod(&mut self, lod: u8) {
        let lod = lod.min(self.context().config().generation.max_lod);
        if lod < self.max_lod {
            let merges = self.forest.merge_above(lod);
            tracing::debug!(lod, merges, "max LOD lowered");
        }
        self.max_lod = lod;
    }

    /// Chunk of the leaf containing `(u, v)` on `face`, if built.
    #[must_use]
    pub fn chunk_at(&self, face: CubeFace, u: f64, v: f64) -> Option<&Arc<Chunk>> {
        self.forest.find_leaf(face, u, v)?.payload()
    }

    /// Subdivide toward the target depth, then give every empty leaf a
    /// chunk, from the cache when possible.
    pub fn update_lod(&mut self) -> LodPass {
        let start = Instant::now();
        let events = Arc::clone(self.events());
        let mut pass = LodPass {
            splits: self.forest.subdivide_to(self.max_lod),
            ..LodPass::default()
        };

        let pipeline = &self.pipeline;
        let cache = &mut self.cache;
        self.forest.for_each_leaf_mut(|patch, payload| {
            pass.leaves += 1;
            if payload.is_some() {
                return;
            }
            let key = match Chunk::key_for(patch) {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(%error, "skipping leaf without a valid key");
                    pass.failed += 1;
                    return;
                }
            };
            if let Some(chunk) = cache.get(&key) {
                *payload = Some(Arc::clone(chunk));
                pass.cached += 1;
                events.emit(PlanetEvent::CacheHit { key });
                return;
            }
            events.emit(PlanetEvent::CacheMiss { key });

            let chunk = match pipeline.generate(patch) {
                Ok(chunk) => Arc::new(chunk),
                Err(_) => {
                    pass.failed += 1;
                    return;
                }
            };
            store(cache, &events, key, &chunk);
            *payload = Some(chunk);
            pass.generated += 1;
        });

        self.total_generated += pass.generated as u64;
        self.cached_used += pass.cached as u64;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        events.emit(PlanetEvent::LodUpdated {
            leaves: pass.leaves,
            generated: pass.generated,
            cached: pass.cached,
            elapsed_ms,
        });
        if !self.announced && pass.failed == 0 {
            self.announced = true;
            events.emit(PlanetEvent::PlanetGenerated {
                leaves: pass.leaves,
                elapsed_ms,
            });
        }
        tracing::debug!(
            leaves = pass.leaves,
            generated = pass.generated,
            cached = pass.cached,
            failed = pass.failed,
            elapsed_ms,
            "LOD update"
        );
        pass
    }

    /// Drop expired entries, then shed down to the optimize target.
    /// Returns how many entries left the cache.
    pub fn maintain_cache(&mut self) -> usize {
        let expired = self.cache.cleanup_expired(self.cache.ttl());
        let shed = self.cache.optimize().len();
        let removed = expired + shed;
        if removed > 0 {
            self.events().emit(PlanetEvent::CacheEvicted { count: removed });
        }
        tracing::info!(
            entries = self.cache.len(),
            max_entries = self.cache.limits().max_entries,
            bytes = self.cache.bytes_used(),
            hit_rate = self.cache.hit_rate(),
            expired,
            shed,
            "cache maintenance"
        );
        removed
    }

    /// Advance the scheduler by `dt` seconds, run whatever fell due and
    /// dispatch queued events.
    pub fn tick(&mut self, dt: f64) -> SchedulerTick {
        let tick = self.scheduler.advance(dt);
        if tick.update_lod {
            self.update_lod();
        }
        if tick.maintain_cache {
            self.maintain_cache();
        }
        self.events().dispatch();
        tick
    }

    /// Sculpt every built leaf within reach of `brush` and drop the edited
    /// chunks' cache entries so stale terrain is never served again. Returns
    /// how many chunks changed; an invalid brush is rejected and changes none.
    pub fn apply_brush(&mut self, brush: &HeightBrush) -> usize {
        let events = Arc::clone(self.events());
        if !brush.is_valid() {
            tracing::warn!(?brush, "brush rejected");
            events.emit(PlanetEvent::ErrorOccurred {
                message: format!("invalid brush {brush:?}"),
            });
            return 0;
        }
        let radius = self.context().config().generation.base_radius;
        let cache = &mut self.cache;
        let mut edited = 0;
        self.forest.for_each_leaf_mut(|_, payload| {
            let Some(chunk) = payload else {
                return;
            };
            if !chunk.touched_by(brush, radius) {
                return;
            }
            let samples = Arc::make_mut(chunk).apply_brush(brush, radius);
            if samples == 0 {
                return;
            }
            edited += 1;
            if let Ok(key) = chunk.key() {
                cache.remove(&key);
                events.emit(PlanetEvent::TerrainEdited { key, samples });
            }
        });
        tracing::debug!(edited, radius = brush.radius, strength = brush.strength, "brush applied");
        edited
    }

    /// Empty every leaf and the cache so the next update rebuilds everything.
    pub fn invalidate(&mut self) {
        self.forest.for_each_leaf_mut(|_, payload| *payload = None);
        self.cache.clear();
        tracing::debug!("planet chunks invalidated");
    }

    #[must_use]
    pub fn performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            total_generated: self.total_generated,
            cached_used: self.cached_used,
            hit_rate: self.cache.hit_rate(),
            cache_entries: self.cache.len(),
            cache_bytes: self.cache.bytes_used(),
        }
    }
}

fn store(cache: &mut PolicyCache<ChunkKey, Arc<Chunk>>, events: &EventBus, key: ChunkKey, chunk: &Arc<Chunk>) {
    match cache.put(key, Arc::clone(chunk), chunk.priority()) {
        Ok(evicted) if !evicted.is_empty() => {
            events.emit(PlanetEvent::CacheEvicted { count: evicted.len() });
        }
        Ok(_) | Err(CacheError::Disabled) => {}
        Err(error) => tracing::warn!(?key, %error, "chunk not cached"),
    }
}

#[cfg(test)]
mod tests {
    use orbis_config::EvictionPolicy;
    use orbis_lod::patch_resolution;

    use super::*;
    use crate::events::EventKind;

    fn config(max_lod: u8) -> Config {
        let mut config = Config::default();
        config.noise.seed = 1337;
        config.generation.max_lod = max_lod;
        config.erosion.hydraulic.iterations = 100;
        config
    }

    #[test]
    fn test_seed_1337_max_lod_2_builds_96_leaves() {
        let mut planet = Planet::from_config(config(2)).unwrap();
        let pass = planet.update_lod();
        assert_eq!(pass.leaves, 96);
        assert_eq!(pass.generated, 96);
        assert_eq!(pass.failed, 0);

        planet.forest().for_each_leaf(|patch, chunk| {
            let chunk = chunk.expect("every leaf has a chunk");
            let n = patch_resolution(8, patch.level) as usize;
            assert_eq!(patch.level, 2);
            assert_eq!(chunk.geometry.vertex_count(), (n + 1) * (n + 1));
        });
    }

    #[test]
    fn test_second_pass_does_no_work() {
        let mut planet = Planet::from_config(config(1)).unwrap();
        assert_eq!(planet.update_lod().generated, 24);
        let again = planet.update_lod();
        assert_eq!(again.generated + again.cached, 0, "leaves keep their chunks");
        assert_eq!(planet.performance_stats().total_generated, 24);
    }

    #[test]
    fn test_invalidated_leaves_come_from_cache() {
        let mut planet = Planet::from_config(config(1)).unwrap();
        planet.update_lod();
        planet.forest.for_each_leaf_mut(|_, payload| *payload = None);

        let pass = planet.update_lod();
        assert_eq!(pass.cached, 24);
        assert_eq!(pass.generated, 0);
        let stats = planet.performance_stats();
        assert_eq!(stats.cached_used, 24);
        assert_eq!(stats.total_generated, 24);
        assert!(stats.hit_rate > 0.0);

        planet.invalidate();
        assert_eq!(planet.cache().len(), 0);
        assert_eq!(planet.update_lod().generated, 24);
    }

    #[test]
    fn test_small_cache_evicts_and_reports() {
        let mut cfg = config(1);
        cfg.cache.max_entries = 4;
        cfg.cache.policy = EvictionPolicy::Lru;
        let mut planet = Planet::from_config(cfg).unwrap();
        planet.update_lod();
        assert_eq!(planet.cache().len(), 4);
        planet.events().dispatch();
        assert!(!planet.events().history_of(EventKind::CacheEvicted).is_empty());
    }

    #[test]
    fn test_events_follow_update() {
        let mut planet = Planet::from_config(config(1)).unwrap();
        planet.update_lod();
        planet.update_lod();
        let events = planet.events();
        events.dispatch();
        assert_eq!(events.history_of(EventKind::PlanetGenerated).len(), 1, "announced once");
        assert_eq!(events.history_of(EventKind::LodUpdated).len(), 2);
        assert_eq!(events.stats().dropped, 0);
    }

    #[test]
    fn test_tick_drives_updates() {
        let mut cfg = config(1);
        cfg.generation.lod_update_interval = 0.25;
        let mut planet = Planet::from_config(cfg).unwrap();
        assert!(!planet.tick(0.125).update_lod);
        assert_eq!(planet.forest().leaf_count(), 6);
        assert!(planet.tick(0.125).update_lod);
        assert_eq!(planet.forest().leaf_count(), 24);
        assert!(planet.chunk_at(CubeFace::PosX, 0.3, 0.7).is_some());
        assert!(planet.events().pending() == 0, "tick dispatches events");
    }

    #[test]
    fn test_set_max_lod_merges_and_caps() {
        let mut planet = Planet::from_config(config(2)).unwrap();
        planet.update_lod();
        planet.set_max_lod(1);
        assert_eq!(planet.forest().leaf_count(), 24);
        planet.update_lod();
        assert!(planet.chunk_at(CubeFace::NegY, 0.5, 0.5).is_some());

        planet.set_max_lod(9);
        assert_eq!(planet.max_lod(), 2, "capped at the configured maximum");
    }

    #[test]
    fn test_brush_edits_leaves_and_invalidates_cache() {
        let mut planet = Planet::from_config(config(1)).unwrap();
        planet.update_lod();
        let radius = planet.context().config().generation.base_radius;
        let chunk = Arc::clone(planet.chunk_at(CubeFace::PosX, 0.25, 0.25).unwrap());
        let target = chunk.geometry.position(chunk.geometry.directions.len() / 2, radius).unwrap();
        let key = chunk.key().unwrap();
        let height_before = chunk.heights().to_vec();
        drop(chunk);
        assert!(planet.cache().contains(&key));

        let edited = planet.apply_brush(&HeightBrush::new(target, radius * 0.3, 40.0));
        assert!(edited >= 1);
        assert!(!planet.cache().contains(&key), "edited chunk must leave the cache");
        let after = planet.chunk_at(CubeFace::PosX, 0.25, 0.25).unwrap();
        assert!(after.heights().iter().zip(&height_before).any(|(a, b)| a > b));

        let pass = planet.update_lod();
        assert_eq!(pass.generated + pass.cached, 0, "edited leaves keep their chunk");
        planet.events().dispatch();
        assert_eq!(planet.events().history_of(EventKind::TerrainEdited).len(), edited);

        assert_eq!(planet.apply_brush(&HeightBrush::new(target, -1.0, 40.0)), 0);
    }

    #[test]
    fn test_maintain_cache_sheds_to_target() {
        let mut cfg = config(1);
        cfg.cache.max_entries = 10;
        cfg.cache.optimize_target = 0.5;
        let mut planet = Planet::from_config(cfg).unwrap();
        planet.update_lod();
        assert_eq!(planet.cache().len(), 10);
        let removed = planet.maintain_cache();
        assert_eq!(removed, 5);
        assert_eq!(planet.cache().len(), 5);
    }
}
