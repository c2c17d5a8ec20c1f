use glam::DVec3;
use thiserror::Error;

/// Reasons a chunk request was refused before or during generation.
#[derive(Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("LOD {lod} is outside 0..={max}")]
    InvalidLod { lod: u8, max: u8 },

    #[error("patch center {0} is not finite")]
    NonFiniteCenter(DVec3),

    #[error("generation was cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode chunk: {0}")]
    Encode(postcard::Error),

    #[error("failed to decode chunk: {0}")]
    Decode(postcard::Error),

    #[error("LZ4 decompression failed: {0}")]
    Decompress(String),

    #[error("not a chunk blob (bad magic)")]
    BadMagic,

    #[error("unsupported chunk format version {0}")]
    UnsupportedVersion(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
