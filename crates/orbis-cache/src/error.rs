use thiserror::Error;

/// Reasons a cache operation was refused. The cache is unchanged in every case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("entry of {needed} bytes exceeds the {budget} byte budget")]
    CapacityExceeded { needed: usize, budget: usize },

    #[error("cache is disabled")]
    Disabled,
}
