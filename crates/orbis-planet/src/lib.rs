//! Planet assembly: chunk generation, events, persistence and LOD upkeep.
//!
//! A [`GenerationContext`] captures a validated configuration together with
//! the terrain collaborators built from it. [`ChunkPipeline`] turns one
//! [`Patch`](orbis_lod::Patch) into a [`Chunk`], [`AsyncChunkGenerator`]
//! runs that pipeline on worker threads, and [`Planet`] ties the patch
//! forest, the chunk cache and the tick scheduler together.

mod async_gen;
mod chunk;
mod context;
mod error;
pub mod events;
mod persist;
mod pipeline;
mod planet;

pub use async_gen::{AsyncChunkGenerator, GeneratedChunk, SharedChunkCache};
pub use chunk::{Chunk, RenderSection};
pub use context::GenerationContext;
pub use error::{GenerationError, PersistError};
pub use events::{EventBus, EventKind, EventListener, EventRecord, EventStats, PlanetEvent};
pub use persist::{
    FORMAT_VERSION, MAGIC, chunk_from_bytes, chunk_from_json, chunk_to_bytes, chunk_to_json, decode_chunk,
    read_chunk_file, write_chunk_file,
};
pub use pipeline::ChunkPipeline;
pub use planet::{LodPass, PerformanceStats, Planet};
