//! Chunk blobs for disk and the wire.
//!
//! ## Binary layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `ORBC` |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | N | LZ4 block, size-prepended, of the postcard-encoded [`Chunk`] |
//!
//! JSON export carries the same fields for tooling.

use std::fs;
use std::path::Path;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::{Chunk, PersistError};

/// Magic bytes identifying a chunk blob.
pub const MAGIC: [u8; 4] = *b"ORBC";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1;

pub fn chunk_to_bytes(chunk: &Chunk) -> Result<Vec<u8>, PersistError> {
    let body = postcard::to_allocvec(chunk).map_err(PersistError::Encode)?;
    let compressed = compress_prepend_size(&body);
    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn chunk_from_bytes(bytes: &[u8]) -> Result<Chunk, PersistError> {
    if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
        return Err(PersistError::BadMagic);
    }
    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }
    let body = decompress_size_prepended(&bytes[HEADER_LEN..])
        .map_err(|e| PersistError::Decompress(e.to_string()))?;
    postcard::from_bytes(&body).map_err(PersistError::Decode)
}

/// Boundary form of [`chunk_from_bytes`]: logs the failure and yields `None`.
#[must_use]
pub fn decode_chunk(bytes: &[u8]) -> Option<Chunk> {
    chunk_from_bytes(bytes)
        .inspect_err(|e| tracing::warn!(error = %e, len = bytes.len(), "discarding undecodable chunk blob"))
        .ok()
}

pub fn chunk_to_json(chunk: &Chunk) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(chunk)?)
}

pub fn chunk_from_json(json: &str) -> Result<Chunk, PersistError> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_chunk_file(path: &Path, chunk: &Chunk) -> Result<(), PersistError> {
    let bytes = chunk_to_bytes(chunk)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "chunk written");
    Ok(())
}

pub fn read_chunk_file(path: &Path) -> Result<Chunk, PersistError> {
    chunk_from_bytes(&fs::read(path)?)
}
