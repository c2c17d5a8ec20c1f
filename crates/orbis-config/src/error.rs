use std::path::PathBuf;

use crate::ValidationIssue;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[source] ron::error::SpannedError),

    #[error("cannot encode config: {0}")]
    Serialize(#[source] ron::Error),

    /// Every out-of-range or contradictory value found.
    #[error("invalid config: {} issue(s), first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Invalid(Vec<ValidationIssue>),
}
