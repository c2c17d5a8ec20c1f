//! Background chunk generation on a fixed pool of worker threads.
//!
//! Patches are queued through a bounded channel, built by named workers
//! sharing one [`ChunkPipeline`], and handed back through a second bounded
//! channel that the owner drains once per frame. Each queued key holds an
//! [`InFlightGuard`] until its result is drained or discarded, so a key is
//! never built by two workers at once. An optional [`ShardedCache`] shared
//! by every worker serves repeated keys without rebuilding them.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use orbis_cache::{ChunkKey, InFlightGuard, InFlightRegistry, ShardedCache};
use orbis_lod::Patch;

use crate::{Chunk, ChunkPipeline, GenerationContext, GenerationError};

/// Cache shared between worker threads.
pub type SharedChunkCache = Arc<ShardedCache<ChunkKey, Arc<Chunk>>>;

/// A finished chunk ready for the cache and the renderer.
#[derive(Debug)]
pub struct GeneratedChunk {
    pub key: ChunkKey,
    pub chunk: Arc<Chunk>,
    pub generation_time_us: u64,
    /// Served from the shared cache rather than built.
    pub from_cache: bool,
}

struct Job {
    patch: Patch,
    claim: InFlightGuard<ChunkKey>,
}

struct Completed {
    chunk: GeneratedChunk,
    claim: InFlightGuard<ChunkKey>,
}

pub struct AsyncChunkGenerator {
    task_sender: Sender<Job>,
    result_receiver: Receiver<Completed>,
    claims: InFlightRegistry<ChunkKey>,
    /// Jobs queued or executing.
    in_flight: Arc<AtomicU64>,
    workers: usize,
}

impl AsyncChunkGenerator {
    /// Spawn `thread_count` workers over `ctx`.
    ///
    /// At most `max_concurrent * 2` jobs wait in the queue; at most
    /// `result_capacity` finished chunks wait to be drained before workers
    /// block.
    pub fn new(
        ctx: GenerationContext,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> io::Result<Self> {
        Self::spawn(ctx, None, thread_count, max_concurrent, result_capacity)
    }

    /// Like [`new`](Self::new), with workers reading and filling `cache`.
    pub fn with_cache(
        ctx: GenerationContext,
        cache: SharedChunkCache,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> io::Result<Self> {
        Self::spawn(ctx, Some(cache), thread_count, max_concurrent, result_capacity)
    }

    fn spawn(
        ctx: GenerationContext,
        cache: Option<SharedChunkCache>,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<Job>(max_concurrent.max(1) * 2);
        let (result_sender, result_receiver) = bounded::<Completed>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));
        let pipeline = ChunkPipeline::new(ctx);
        let workers = thread_count.max(1);

        for index in 0..workers {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let pipeline = pipeline.clone();
            let cache = cache.clone();

            std::thread::Builder::new()
                .name(format!("chunk-gen-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        run_job(&pipeline, cache.as_deref(), job, &sender);
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })?;
        }
        tracing::debug!(workers, max_concurrent, "chunk generation pool started");

        Ok(Self {
            task_sender,
            result_receiver,
            claims: InFlightRegistry::new(),
            in_flight,
            workers,
        })
    }

    /// Pool sized to leave two cores for the main and render threads.
    pub fn with_defaults(ctx: GenerationContext) -> io::Result<Self> {
        let cpus = num_cpus::get().max(2);
        let threads = (cpus - 2).max(1);
        Self::new(ctx, threads, 64, 128)
    }

    /// Queue `patch` for generation.
    ///
    /// Returns the patch back if its key is already pending, its bounds
    /// cannot form a key, or the queue is full.
    pub fn submit(&self, patch: Patch) -> Result<(), Patch> {
        let Ok(key) = Chunk::key_for(&patch) else {
            return Err(patch);
        };
        let Some(claim) = self.claims.try_claim(key) else {
            return Err(patch);
        };
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        self.task_sender.try_send(Job { patch, claim }).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            e.into_inner().patch
        })
    }

    /// Ask the worker holding `key` to abandon it. Cancelled keys stay
    /// pending until a worker discards them or the result is drained.
    pub fn cancel(&self, key: &ChunkKey) -> bool {
        self.claims.cancel(key)
    }

    /// Every finished, uncancelled chunk. Call once per frame.
    pub fn drain_results(&self) -> Vec<GeneratedChunk> {
        self.result_receiver
            .try_iter()
            .filter(|done| !done.claim.is_cancelled())
            .map(|done| done.chunk)
            .collect()
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// True from `submit` until the key's result is drained or discarded.
    #[must_use]
    pub fn is_pending(&self, key: &ChunkKey) -> bool {
        self.claims.is_claimed(key)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
    }
}

fn run_job(
    pipeline: &ChunkPipeline,
    cache: Option<&ShardedCache<ChunkKey, Arc<Chunk>>>,
    job: Job,
    results: &Sender<Completed>,
) {
    if job.claim.is_cancelled() {
        return;
    }
    let key = *job.claim.key();

    let (chunk, from_cache) = match cache.and_then(|c| c.get(&key)) {
        Some(chunk) => (chunk, true),
        None => {
            let cancel = job.claim.cancel_flag();
            match pipeline.generate_cancellable(&job.patch, &cancel) {
                Ok(chunk) => {
                    let chunk = Arc::new(chunk);
                    if let Some(cache) = cache
                        && let Err(error) = cache.put(key, Arc::clone(&chunk), chunk.priority())
                    {
                        tracing::debug!(?key, %error, "chunk not cached");
                    }
                    (chunk, false)
                }
                Err(GenerationError::Cancelled) => {
                    tracing::trace!(?key, "chunk generation cancelled");
                    return;
                }
                Err(error) => {
                    tracing::debug!(?key, %error, "chunk generation failed");
                    return;
                }
            }
        }
    };
    if job.claim.is_cancelled() {
        return;
    }

    let done = Completed {
        chunk: GeneratedChunk {
            key,
            generation_time_us: if from_cache { 0 } else { chunk.generation_time_us },
            chunk,
            from_cache,
        },
        claim: job.claim,
    };
    if results.send(done).is_err() {
        tracing::trace!(?key, "generator dropped, discarding chunk");
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use orbis_config::Config;
    use orbis_cubesphere::CubeFace;

    use super::*;

    fn context() -> GenerationContext {
        let mut config = Config::default();
        config.erosion.hydraulic.iterations = 200;
        GenerationContext::new(config).unwrap()
    }

    fn level_one_patches() -> Vec<Patch> {
        CubeFace::ALL
            .iter()
            .flat_map(|&face| Patch::root(face).children())
            .collect()
    }

    fn drain_until(generator: &AsyncChunkGenerator, count: usize, timeout: Duration) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        let deadline = Instant::now() + timeout;
        while results.len() < count && Instant::now() < deadline {
            results.extend(generator.drain_results());
            if results.len() < count {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        results
    }

    #[test]
    fn test_concurrent_generation_delivers_every_chunk() {
        let generator = AsyncChunkGenerator::new(context(), 4, 32, 64).unwrap();
        let mut submitted = 0;
        for patch in level_one_patches() {
            if generator.submit(patch).is_ok() {
                submitted += 1;
            }
        }
        assert_eq!(submitted, 24);

        let results = drain_until(&generator, submitted, Duration::from_secs(30));
        assert_eq!(
            results.len(),
            submitted,
            "should receive all submitted chunks: got {}/{submitted}",
            results.len()
        );
        for done in &results {
            assert!(!generator.is_pending(&done.key), "drained keys are released");
        }
    }

    #[test]
    fn test_worker_output_matches_sequential() {
        let ctx = context();
        let sequential = ChunkPipeline::new(ctx.clone());
        let generator = AsyncChunkGenerator::new(ctx, 3, 16, 16).unwrap();
        let patches: Vec<Patch> = level_one_patches().into_iter().take(6).collect();
        for patch in &patches {
            generator.submit(*patch).unwrap();
        }

        let results = drain_until(&generator, patches.len(), Duration::from_secs(30));
        assert_eq!(results.len(), patches.len());
        for done in results {
            let mut expected = sequential.generate(&done.chunk.patch).unwrap();
            let mut got = Chunk::clone(&done.chunk);
            expected.generation_time_us = 0;
            got.generation_time_us = 0;
            assert_eq!(got, expected, "threaded output must equal sequential output");
        }
    }

    #[test]
    fn test_duplicate_key_is_refused_while_pending() {
        let generator = AsyncChunkGenerator::new(context(), 1, 8, 8).unwrap();
        let patch = Patch::root(CubeFace::PosX);
        let key = Chunk::key_for(&patch).unwrap();

        assert!(generator.submit(patch).is_ok());
        assert!(generator.is_pending(&key));
        assert_eq!(generator.submit(patch), Err(patch), "same key twice");

        let results = drain_until(&generator, 1, Duration::from_secs(10));
        assert_eq!(results.len(), 1);
        assert!(!generator.is_pending(&key));
        assert!(generator.submit(patch).is_ok(), "key free again after drain");
    }

    #[test]
    fn test_cancellation_discards_result() {
        let generator = AsyncChunkGenerator::new(context(), 1, 8, 8).unwrap();
        let patch = Patch::root(CubeFace::NegZ);
        let key = Chunk::key_for(&patch).unwrap();
        generator.submit(patch).unwrap();
        assert!(generator.cancel(&key));

        let deadline = Instant::now() + Duration::from_secs(10);
        while generator.in_flight_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(generator.drain_results().is_empty(), "cancelled chunk must not be delivered");
        assert!(!generator.is_pending(&key));
        assert!(!generator.cancel(&key), "nothing left to cancel");
    }

    #[test]
    fn test_in_flight_count() {
        let generator = AsyncChunkGenerator::new(context(), 1, 64, 64).unwrap();
        assert_eq!(generator.in_flight_count(), 0);
        for patch in level_one_patches().into_iter().take(5) {
            generator.submit(patch).unwrap();
        }
        assert!(generator.in_flight_count() > 0, "should have in-flight tasks after submission");

        let results = drain_until(&generator, 5, Duration::from_secs(30));
        assert_eq!(results.len(), 5);
        let deadline = Instant::now() + Duration::from_secs(5);
        while generator.in_flight_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(generator.in_flight_count(), 0);
    }

    #[test]
    fn test_invalid_lod_is_dropped() {
        let mut config = Config::default();
        config.generation.max_lod = 1;
        let generator = AsyncChunkGenerator::new(GenerationContext::new(config).unwrap(), 1, 4, 4).unwrap();
        let patch = Patch::root(CubeFace::PosY).children()[0].children()[0];
        let key = Chunk::key_for(&patch).unwrap();
        generator.submit(patch).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while generator.is_pending(&key) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!generator.is_pending(&key));
        assert!(generator.drain_results().is_empty());
    }

    #[test]
    fn test_shared_cache_serves_repeat_keys() {
        let ctx = context();
        let cache: SharedChunkCache = Arc::new(ShardedCache::from_config(&ctx.config().cache));
        let generator = AsyncChunkGenerator::with_cache(ctx, Arc::clone(&cache), 2, 8, 8).unwrap();
        let patch = Patch::root(CubeFace::PosZ).children()[1];

        generator.submit(patch).unwrap();
        let first = drain_until(&generator, 1, Duration::from_secs(10));
        assert_eq!(first.len(), 1);
        assert!(!first[0].from_cache);
        assert_eq!(cache.len(), 1);

        generator.submit(patch).unwrap();
        let second = drain_until(&generator, 1, Duration::from_secs(10));
        assert_eq!(second.len(), 1);
        assert!(second[0].from_cache, "second request should hit the shared cache");
        assert!(Arc::ptr_eq(&first[0].chunk, &second[0].chunk));
    }
}
