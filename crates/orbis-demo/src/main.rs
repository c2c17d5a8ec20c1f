//! Demo binary that builds a planet end to end and logs what happened.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p orbis-demo -- --seed 1337 --max-lod 2`.

mod scenarios;

use clap::Parser;
use orbis_config::{CliArgs, Config};
use tracing::{error, info};

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("orbis")
    });

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    orbis_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!(
        seed = config.noise.seed,
        radius = config.generation.base_radius,
        max_lod = config.generation.max_lod,
        "orbis demo starting"
    );

    scenarios::demonstrate_lru_eviction();

    let mut planet = match scenarios::demonstrate_lod_scenario(config.clone()) {
        Ok(planet) => planet,
        Err(e) => {
            error!("invalid configuration: {e}");
            return;
        }
    };
    scenarios::demonstrate_sculpting(&mut planet);
    scenarios::demonstrate_persistence(&planet);
    scenarios::demonstrate_network_cache(&planet);
    scenarios::demonstrate_async_generation(planet.context().clone());
    scenarios::demonstrate_ticking(&mut planet);

    info!("orbis demo finished");
}
