//! Configuration for Orbis planet generation.
//!
//! Generation parameters persist to disk as RON files, can be overridden
//! from the command line via clap, and are validated before a pipeline
//! captures them. Once captured, a [`Config`] is treated as immutable.

mod cli;
mod config;
mod error;
mod validate;

pub use cli::CliArgs;
pub use config::{
    AltitudeThresholds, BiomeConfig, BiomeVariant, CONFIG_FILE, CacheConfig, ClimateThresholds, Config,
    DebugConfig, ErosionConfig, EvictionPolicy, GenerationConfig, HydraulicConfig,
    NetworkCacheConfig, NoiseConfig, NoiseVariant, ThermalConfig, VegetationConfig, WindConfig,
};
pub use error::ConfigError;
pub use validate::ValidationIssue;
