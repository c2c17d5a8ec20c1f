//! Per-sample climate inputs for biome classification.
//!
//! Uses `libm` so the trigonometry is identical on every platform.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Everything the classifier looks at for one sample, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    pub altitude: f64,
    pub slope: f64,
    pub humidity: f64,
    pub temperature: f64,
}

/// Warmest at the equator, zero at the poles. The planet's axis is +Y.
#[must_use]
pub fn temperature(dir: DVec3) -> f64 {
    let latitude = libm::asin(dir.normalize_or_zero().y.clamp(-1.0, 1.0));
    1.0 - libm::fabs(libm::sin(latitude))
}

/// Low, warm ground is wet; high, cold ground is dry.
#[must_use]
pub fn humidity(altitude: f64, temperature: f64) -> f64 {
    (((1.0 - altitude.clamp(0.0, 1.0)) + temperature) * 0.5).clamp(0.0, 1.0)
}

/// Map a gradient magnitude (rise over run) to `[0, 1)`; 0.5 is a 45° slope.
#[must_use]
pub fn normalized_slope(gradient: f64) -> f64 {
    libm::atan(gradient.abs()) / core::f64::consts::FRAC_PI_2
}

/// Build the classifier inputs for a sample.
#[must_use]
pub fn sample(dir: DVec3, altitude: f64, gradient: f64) -> ClimateSample {
    let temperature = temperature(dir);
    ClimateSample {
        altitude: altitude.clamp(0.0, 1.0),
        slope: normalized_slope(gradient),
        humidity: humidity(altitude, temperature),
        temperature,
    }
}
