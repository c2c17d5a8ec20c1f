//! Generation parameters, their defaults, and `config.ron` persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level generation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Planet shape, LOD depth and pipeline toggles.
    pub generation: GenerationConfig,
    /// Height synthesis.
    pub noise: NoiseConfig,
    /// Hydraulic, thermal and wind erosion.
    pub erosion: ErosionConfig,
    /// Land-cover classification.
    pub biome: BiomeConfig,
    /// Vegetation scatter.
    pub vegetation: VegetationConfig,
    /// Local and network chunk caches.
    pub cache: CacheConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Planet shape, LOD depth and pipeline toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Radius of the base sphere in world units.
    pub base_radius: f64,
    /// Deepest quadtree level patches are subdivided to.
    pub max_lod: u8,
    /// Seconds between LOD re-evaluations.
    pub lod_update_interval: f64,
    /// Grid cells per patch edge at level 0 (halved per level, clamped to 2..=16).
    pub base_resolution: u32,
    /// Seconds between cache maintenance passes.
    pub cache_cleanup_interval: f64,
    /// Run the erosion stage.
    pub enable_erosion: bool,
    /// Run the vegetation stage.
    pub enable_vegetation: bool,
    /// Run the water stage.
    pub enable_water: bool,
    /// Height (relative to `base_radius`) below which samples are submerged.
    pub sea_level: f64,
}

/// Base coherent-noise variant evaluated for every octave.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NoiseVariant {
    /// Plain gradient noise.
    #[default]
    Standard,
    /// Sharp crests: `1 - |n|`.
    Ridged,
    /// Rounded hills: `2|n| - 1`.
    Billow,
}

/// Height synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    /// Integer seed all noise fields derive from.
    pub seed: u32,
    /// Base noise variant.
    pub variant: NoiseVariant,
    /// Frequency applied to the unit direction before warping.
    pub frequency: f64,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Frequency multiplier per octave (>= 1).
    pub lacunarity: f64,
    /// Amplitude multiplier per octave, in (0, 1].
    pub persistence: f64,
    /// Perturb the sample direction with a second noise field.
    pub enable_warp: bool,
    /// Scale of the warp displacement.
    pub warp_strength: f64,
    /// World units per unit of summed noise.
    pub height_scale: f64,
}

/// Droplet hydraulic erosion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HydraulicConfig {
    pub enabled: bool,
    /// Droplets simulated per patch.
    pub iterations: u32,
    /// Capacity per unit of height drop.
    pub sediment_capacity: f64,
    /// Fraction of spare capacity eroded per step, in [0, 1].
    pub erode_rate: f64,
    /// Fraction of surplus sediment deposited per step, in [0, 1].
    pub deposit_rate: f64,
    /// Upper bound on steps per droplet.
    pub max_steps: u32,
    /// Water multiplier applied every step.
    pub water_decay: f64,
    /// A droplet stops once its water drops below this.
    pub min_water: f64,
}

/// Talus slumping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThermalConfig {
    pub enabled: bool,
    /// Fraction of the excess above talus moved per iteration, in [0, 1].
    pub strength: f64,
    pub iterations: u32,
    /// Height difference (relative to patch relief) tolerated between neighbours.
    pub talus: f64,
}

/// Aeolian transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindConfig {
    pub enabled: bool,
    /// Fraction of the windward step lifted per iteration, in [0, 1].
    pub strength: f64,
    pub iterations: u32,
    /// Grid-space wind direction; snapped to the nearest of the 8 neighbours.
    pub direction: (f64, f64),
}

/// Hydraulic, thermal and wind erosion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ErosionConfig {
    pub hydraulic: HydraulicConfig,
    pub thermal: ThermalConfig,
    pub wind: WindConfig,
}

/// Which threshold table the classifier uses.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BiomeVariant {
    /// Ocean < beach < plains < forest < mountain < peak by altitude alone.
    #[default]
    Altitude,
    /// Snow / desert / mountains / forest / plains by altitude, slope and humidity.
    Climate,
}

/// Upper bounds (exclusive) of each altitude bracket, normalized to [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AltitudeThresholds {
    pub ocean: f64,
    pub beach: f64,
    pub plains: f64,
    pub forest: f64,
    pub mountain: f64,
}

/// Thresholds for the climate table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClimateThresholds {
    pub desert_altitude: f64,
    pub mountain_altitude: f64,
    pub snow_altitude: f64,
    pub forest_humidity: f64,
    pub plains_slope: f64,
}

/// Land-cover classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BiomeConfig {
    pub variant: BiomeVariant,
    pub altitude: AltitudeThresholds,
    pub climate: ClimateThresholds,
    /// Majority-filter labels against their neighbours after classification.
    pub smooth_transitions: bool,
    pub smoothing_passes: u32,
}

/// Vegetation scatter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VegetationConfig {
    /// Multiplier on every vegetation type's spawn probability.
    pub density: f64,
    pub max_instances_per_chunk: usize,
}

/// Rule used to pick a victim when the cache is full.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, clap::ValueEnum,
)]
pub enum EvictionPolicy {
    /// Least recently accessed.
    #[default]
    Lru,
    /// Lowest access count.
    Lfu,
    /// Arbitrary entry from a seeded stream.
    Random,
}

/// Network-facing cache limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkCacheConfig {
    pub max_entries: usize,
    /// Seconds after synchronization before an entry is considered stale.
    pub max_age: f64,
}

/// Local and network chunk caches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub policy: EvictionPolicy,
    pub max_entries: usize,
    pub max_bytes: usize,
    /// Seconds since last access before an entry expires.
    pub ttl: f64,
    /// Utilization `optimize` trims down to, in (0, 1].
    pub optimize_target: f64,
    /// Lock shards for the concurrent cache.
    pub shards: usize,
    /// Seed for the random eviction stream.
    pub random_seed: u64,
    pub network: NetworkCacheConfig,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Warn when a single chunk takes longer than this many milliseconds.
    pub slow_chunk_ms: f64,
}

// --- Default implementations ---

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_radius: 1000.0,
            max_lod: 8,
            lod_update_interval: 0.2,
            base_resolution: 8,
            cache_cleanup_interval: 30.0,
            enable_erosion: true,
            enable_vegetation: true,
            enable_water: true,
            sea_level: 0.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            variant: NoiseVariant::Standard,
            frequency: 1.0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            enable_warp: true,
            warp_strength: 0.5,
            height_scale: 200.0,
        }
    }
}

impl Default for HydraulicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            iterations: 50_000,
            sediment_capacity: 0.05,
            erode_rate: 0.3,
            deposit_rate: 0.1,
            max_steps: 30,
            water_decay: 0.9,
            min_water: 0.01,
        }
    }
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.5,
            iterations: 10,
            talus: 0.05,
        }
    }
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.1,
            iterations: 5,
            direction: (1.0, 0.0),
        }
    }
}

impl Default for AltitudeThresholds {
    fn default() -> Self {
        Self {
            ocean: 0.3,
            beach: 0.35,
            plains: 0.5,
            forest: 0.65,
            mountain: 0.85,
        }
    }
}

impl Default for ClimateThresholds {
    fn default() -> Self {
        Self {
            desert_altitude: 0.7,
            mountain_altitude: 0.5,
            snow_altitude: 0.8,
            forest_humidity: 0.6,
            plains_slope: 0.3,
        }
    }
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            variant: BiomeVariant::Altitude,
            altitude: AltitudeThresholds::default(),
            climate: ClimateThresholds::default(),
            smooth_transitions: true,
            smoothing_passes: 1,
        }
    }
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            density: 0.05,
            max_instances_per_chunk: 256,
        }
    }
}

impl Default for NetworkCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_age: 300.0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: EvictionPolicy::Lru,
            max_entries: 1000,
            max_bytes: 256 * 1024 * 1024,
            ttl: 300.0,
            optimize_target: 0.8,
            shards: 8,
            random_seed: 0x5EED,
            network: NetworkCacheConfig::default(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            slow_chunk_ms: 50.0,
        }
    }
}

/// File name used inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

impl Config {
    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if it does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default planet config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!("Planet config loaded from {}", path.display());
        Ok(config)
    }

    /// Write `config.ron` into `config_dir`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;
        let text = ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::new()
                .depth_limit(3)
                .separate_tuple_members(true)
                .enumerate_arrays(false),
        )
        .map_err(ConfigError::Serialize)?;
        std::fs::write(&path, text).map_err(write_err)
    }

    /// Re-read `config.ron`. `Some` only when the file differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Planet config changed on disk");
        Ok(Some(fresh))
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&text).map_err(ConfigError::Parse)
}
