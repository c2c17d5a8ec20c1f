//! Range and ordering checks run before a config reaches the generators.

use std::fmt;

use crate::config::Config;
use crate::error::ConfigError;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `noise.persistence`.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

struct Checker {
    issues: Vec<ValidationIssue>,
}

impl Checker {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field,
            message: message.into(),
        });
    }

    fn unit(&mut self, field: &'static str, value: f64) {
        if !(0.0..=1.0).contains(&value) {
            self.push(field, format!("{value} is outside [0, 1]"));
        }
    }

    fn positive(&mut self, field: &'static str, value: f64) {
        if !(value.is_finite() && value > 0.0) {
            self.push(field, format!("{value} must be finite and > 0"));
        }
    }
}

impl Config {
    /// Every out-of-range or inconsistent field. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut c = Checker { issues: Vec::new() };

        let g = &self.generation;
        if !(100.0..=10_000.0).contains(&g.base_radius) {
            c.push(
                "generation.base_radius",
                format!("{} is outside 100..=10000", g.base_radius),
            );
        }
        if !(1..=12).contains(&g.max_lod) {
            c.push("generation.max_lod", format!("{} is outside 1..=12", g.max_lod));
        }
        if !(0.1..=2.0).contains(&g.lod_update_interval) {
            c.push(
                "generation.lod_update_interval",
                format!("{} is outside 0.1..=2.0", g.lod_update_interval),
            );
        }
        c.positive("generation.cache_cleanup_interval", g.cache_cleanup_interval);
        if !(2..=32).contains(&g.base_resolution) {
            c.push(
                "generation.base_resolution",
                format!("{} is outside 2..=32", g.base_resolution),
            );
        }
        if !g.sea_level.is_finite() {
            c.push("generation.sea_level", "must be finite");
        }

        let n = &self.noise;
        c.positive("noise.frequency", n.frequency);
        c.positive("noise.height_scale", n.height_scale);
        if n.octaves == 0 || n.octaves > 16 {
            c.push("noise.octaves", format!("{} is outside 1..=16", n.octaves));
        }
        if !(n.lacunarity.is_finite() && n.lacunarity >= 1.0) {
            c.push("noise.lacunarity", format!("{} must be >= 1", n.lacunarity));
        }
        if !(n.persistence > 0.0 && n.persistence <= 1.0) {
            c.push("noise.persistence", format!("{} is outside (0, 1]", n.persistence));
        }
        if !(n.warp_strength.is_finite() && n.warp_strength >= 0.0) {
            c.push("noise.warp_strength", "must be finite and >= 0");
        }

        let h = &self.erosion.hydraulic;
        c.unit("erosion.hydraulic.erode_rate", h.erode_rate);
        c.unit("erosion.hydraulic.deposit_rate", h.deposit_rate);
        c.positive("erosion.hydraulic.sediment_capacity", h.sediment_capacity);
        if !(h.water_decay > 0.0 && h.water_decay < 1.0) {
            c.push("erosion.hydraulic.water_decay", "must be in (0, 1)");
        }
        if h.max_steps == 0 {
            c.push("erosion.hydraulic.max_steps", "must be > 0");
        }
        c.unit("erosion.thermal.strength", self.erosion.thermal.strength);
        if !(self.erosion.thermal.talus.is_finite() && self.erosion.thermal.talus >= 0.0) {
            c.push("erosion.thermal.talus", "must be finite and >= 0");
        }
        c.unit("erosion.wind.strength", self.erosion.wind.strength);
        let (wx, wy) = self.erosion.wind.direction;
        if !(wx.is_finite() && wy.is_finite()) || (wx == 0.0 && wy == 0.0) {
            c.push("erosion.wind.direction", "must be a finite non-zero vector");
        }

        let a = &self.biome.altitude;
        let ladder = [a.ocean, a.beach, a.plains, a.forest, a.mountain];
        for v in ladder {
            c.unit("biome.altitude", v);
        }
        if ladder.windows(2).any(|w| w[0] >= w[1]) {
            c.push(
                "biome.altitude",
                "thresholds must strictly increase from ocean to mountain",
            );
        }

        let cl = &self.biome.climate;
        c.unit("biome.climate.desert_altitude", cl.desert_altitude);
        c.unit("biome.climate.mountain_altitude", cl.mountain_altitude);
        c.unit("biome.climate.snow_altitude", cl.snow_altitude);
        c.unit("biome.climate.forest_humidity", cl.forest_humidity);
        c.unit("biome.climate.plains_slope", cl.plains_slope);
        if cl.desert_altitude <= cl.mountain_altitude {
            c.push(
                "biome.climate.desert_altitude",
                "must be greater than mountain_altitude",
            );
        }
        if cl.snow_altitude <= cl.mountain_altitude {
            c.push(
                "biome.climate.snow_altitude",
                "must be greater than mountain_altitude",
            );
        }

        if !(self.vegetation.density.is_finite() && self.vegetation.density >= 0.0) {
            c.push("vegetation.density", "must be finite and >= 0");
        }

        let k = &self.cache;
        if k.max_entries == 0 {
            c.push("cache.max_entries", "must be > 0");
        }
        if k.max_bytes == 0 {
            c.push("cache.max_bytes", "must be > 0");
        }
        if k.shards == 0 {
            c.push("cache.shards", "must be > 0");
        }
        c.positive("cache.ttl", k.ttl);
        if !(k.optimize_target > 0.0 && k.optimize_target <= 1.0) {
            c.push("cache.optimize_target", "must be in (0, 1]");
        }
        if k.network.max_entries == 0 {
            c.push("cache.network.max_entries", "must be > 0");
        }
        c.positive("cache.network.max_age", k.network.max_age);

        c.issues
    }

    /// Consume the config if it passes [`Config::validate`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn test_reports_every_issue() {
        let mut config = Config::default();
        config.noise.octaves = 0;
        config.noise.persistence = 1.5;
        config.erosion.hydraulic.erode_rate = -0.1;

        let fields: Vec<_> = config.validate().into_iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec![
                "noise.octaves",
                "noise.persistence",
                "erosion.hydraulic.erode_rate"
            ]
        );
    }

    #[test]
    fn test_climate_ordering_enforced() {
        let mut config = Config::default();
        config.biome.climate.desert_altitude = 0.4;
        config.biome.climate.snow_altitude = 0.5;
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "biome.climate.desert_altitude"));
        assert!(issues.iter().any(|i| i.field == "biome.climate.snow_altitude"));
    }

    #[test]
    fn test_altitude_ladder_must_increase() {
        let mut config = Config::default();
        config.biome.altitude.forest = 0.5;
        assert!(config.validate().iter().any(|i| i.field == "biome.altitude"));
    }

    #[test]
    fn test_generation_ranges() {
        let mut config = Config::default();
        config.generation.base_radius = 50.0;
        config.generation.max_lod = 0;
        config.generation.base_resolution = 64;
        let fields: Vec<_> = config.validate().into_iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec![
                "generation.base_radius",
                "generation.max_lod",
                "generation.base_resolution"
            ]
        );
    }

    #[test]
    fn test_validated_wraps_issues() {
        let mut config = Config::default();
        config.cache.max_entries = 0;
        match config.validated() {
            Err(ConfigError::Invalid(issues)) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].to_string(), "cache.max_entries: must be > 0");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
