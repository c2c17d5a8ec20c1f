//! Command-line argument parsing for the planet generator.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, EvictionPolicy};

/// Planet generator command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "orbis", about = "Procedural planet terrain generator")]
pub struct CliArgs {
    /// Noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Base sphere radius.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Deepest quadtree level.
    #[arg(long)]
    pub max_lod: Option<u8>,

    /// Cache eviction policy.
    #[arg(long, value_enum)]
    pub policy: Option<EvictionPolicy>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.noise.seed = seed;
        }
        if let Some(r) = args.radius {
            self.generation.base_radius = r;
        }
        if let Some(lod) = args.max_lod {
            self.generation.max_lod = lod;
        }
        if let Some(policy) = args.policy {
            self.cache.policy = policy;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
