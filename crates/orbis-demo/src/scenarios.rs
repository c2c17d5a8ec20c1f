//! Planet generation demonstration functions.

use std::time::{Duration, Instant};

use orbis_cache::{CacheLimits, EvictionPolicy, NetworkChunkCache, PolicyCache};
use orbis_config::{Config, ConfigError};
use orbis_cubesphere::CubeFace;
use orbis_lod::{Patch, patch_resolution};
use orbis_terrain::HeightBrush;
use orbis_planet::{
    AsyncChunkGenerator, EventKind, GenerationContext, Planet, chunk_from_bytes, chunk_to_bytes,
    chunk_to_json,
};
use tracing::{info, warn};

/// Inserts A, B, C into a two-entry LRU cache and shows that A was evicted.
pub(crate) fn demonstrate_lru_eviction() {
    info!("Starting LRU eviction demonstration");

    let mut cache: PolicyCache<String, String> = PolicyCache::new(EvictionPolicy::Lru, CacheLimits::entries(2));
    for key in ["A", "B", "C"] {
        if let Err(e) = cache.put(key.to_string(), format!("chunk {key}"), 0.5) {
            warn!("put {key} failed: {e}");
        }
    }
    let a_missing = cache.get(&"A".to_string()).is_none();
    let retained: Vec<&str> = ["A", "B", "C"]
        .into_iter()
        .filter(|k| cache.contains(&k.to_string()))
        .collect();

    info!(
        "LRU cache holds {:?} after A, B, C (A evicted: {}, hit rate {:.2})",
        retained,
        a_missing,
        cache.hit_rate()
    );
}

/// Generates every face to depth 2 and checks the leaf and vertex counts.
pub(crate) fn demonstrate_lod_scenario(mut config: Config) -> Result<Planet, ConfigError> {
    info!("Starting LOD generation demonstration");

    config.generation.max_lod = config.generation.max_lod.max(2);
    let base_resolution = config.generation.base_resolution;
    let mut planet = Planet::from_config(config)?;
    planet.set_max_lod(2);

    let pass = planet.update_lod();
    let mut mismatched = 0;
    planet.forest().for_each_leaf(|patch, chunk| {
        let n = patch_resolution(base_resolution, patch.level) as usize;
        if chunk.is_none_or(|c| c.geometry.vertex_count() != (n + 1) * (n + 1)) {
            mismatched += 1;
        }
    });

    let stats = planet.performance_stats();
    info!(
        "Generated {} leaves ({} new, {} cached, {} failed, {} vertex mismatches)",
        pass.leaves, pass.generated, pass.cached, pass.failed, mismatched
    );
    info!(
        "Cache: {} entries, {:.1} KiB, hit rate {:.2}",
        stats.cache_entries,
        stats.cache_bytes as f64 / 1024.0,
        stats.hit_rate
    );

    if let Some(chunk) = planet.chunk_at(CubeFace::PosZ, 0.5, 0.5) {
        for detail in 0..3 {
            let section = chunk.render_section(detail);
            info!(
                "Render section detail {}: {} vertices, {} triangles, {} ocean points",
                detail,
                section.vertices.len(),
                section.indices.len() / 3,
                section.ocean_points.len()
            );
        }
    }

    let events = planet.events();
    events.dispatch();
    info!(
        "Events: {} chunk, {} erosion, {} vegetation, {} water, {} dropped",
        events.history_of(EventKind::ChunkGenerated).len(),
        events.history_of(EventKind::ErosionApplied).len(),
        events.history_of(EventKind::VegetationSpawned).len(),
        events.history_of(EventKind::WaterSimulated).len(),
        events.stats().dropped
    );
    Ok(planet)
}

/// Raises a hill under the +Z face center and shows the cache dropping the edited chunks.
pub(crate) fn demonstrate_sculpting(planet: &mut Planet) {
    info!("Starting terrain sculpting demonstration");

    let radius = planet.context().config().generation.base_radius;
    let Some(chunk) = planet.chunk_at(CubeFace::PosZ, 0.5, 0.5) else {
        warn!("no chunk at +Z center to sculpt");
        return;
    };
    let center = chunk.center;
    let cached_before = planet.cache().len();
    let edited = planet.apply_brush(&HeightBrush::new(center, radius * 0.25, radius * 0.02));
    info!(
        "Brush edited {} chunks; cache entries {} -> {}",
        edited,
        cached_before,
        planet.cache().len()
    );
}

/// Round-trips one chunk through the binary and JSON formats.
pub(crate) fn demonstrate_persistence(planet: &Planet) {
    info!("Starting chunk persistence demonstration");

    let Some(chunk) = planet.chunk_at(CubeFace::PosY, 0.5, 0.5) else {
        warn!("no chunk at +Y center to persist");
        return;
    };
    let bytes = match chunk_to_bytes(chunk) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("encode failed: {e}");
            return;
        }
    };
    let json_len = chunk_to_json(chunk).map(|j| j.len()).unwrap_or(0);
    let restored = chunk_from_bytes(&bytes).is_ok_and(|c| c == **chunk);
    info!(
        "Chunk blob {} bytes (JSON {} bytes), round trip exact: {}",
        bytes.len(),
        json_len,
        restored
    );
}

/// Stores chunks by world position and asks whether a peer copy is newer.
pub(crate) fn demonstrate_network_cache(planet: &Planet) {
    info!("Starting network cache demonstration");

    let config = &planet.context().config().cache;
    let mut network = NetworkChunkCache::from_config(config.policy, &config.network);
    let radius = planet.context().config().generation.base_radius;
    let mut stored = 0;
    planet.forest().for_each_leaf(|patch, chunk| {
        if let Some(chunk) = chunk
            && network.store_at(patch.center(radius), chunk.clone(), 1_000).is_ok()
        {
            stored += 1;
        }
    });

    let probe = Patch::root(CubeFace::NegX).children()[0].children()[3].center(radius);
    let hit = network.get(probe).is_some();
    info!(
        "Network cache stored {} chunks; probe hit: {}, peer stamp 2000 needs refetch: {}",
        stored,
        hit,
        network.needs_refetch(probe, 2_000)
    );
}

/// Builds every level-1 patch on worker threads.
pub(crate) fn demonstrate_async_generation(ctx: GenerationContext) {
    info!("Starting async generation demonstration");

    let generator = match AsyncChunkGenerator::with_defaults(ctx) {
        Ok(generator) => generator,
        Err(e) => {
            warn!("could not start worker pool: {e}");
            return;
        }
    };
    let start = Instant::now();
    let submitted = CubeFace::ALL
        .iter()
        .flat_map(|&face| Patch::root(face).children())
        .filter(|&patch| generator.submit(patch).is_ok())
        .count();

    let mut received = 0;
    let deadline = start + Duration::from_secs(60);
    while received < submitted && Instant::now() < deadline {
        received += generator.drain_results().len();
        std::thread::sleep(Duration::from_millis(5));
    }
    info!(
        "{} workers built {}/{} chunks in {:.1}ms",
        generator.worker_count(),
        received,
        submitted,
        start.elapsed().as_secs_f64() * 1000.0
    );
}

/// Runs two simulated seconds of 60 Hz frames.
pub(crate) fn demonstrate_ticking(planet: &mut Planet) {
    info!("Starting tick demonstration");

    let mut lod_updates = 0;
    let mut cleanups = 0;
    for _ in 0..120 {
        let tick = planet.tick(1.0 / 60.0);
        lod_updates += u32::from(tick.update_lod);
        cleanups += u32::from(tick.maintain_cache);
    }
    let stats = planet.performance_stats();
    info!(
        "120 frames: {} LOD updates, {} cache cleanups; {} generated, {} served from cache",
        lod_updates, cleanups, stats.total_generated, stats.cached_used
    );
}
