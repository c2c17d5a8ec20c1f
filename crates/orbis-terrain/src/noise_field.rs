//! Domain-warped multi-octave height field over the unit sphere.

use glam::DVec3;
use noise::{NoiseFn, Perlin, Simplex};
use orbis_config::{NoiseConfig, NoiseVariant};

/// Seed mix for the warp field, so it decorrelates from the base field.
const WARP_SEED_MIX: u32 = 0x9E37_79B1;

/// Offsets decorrelating the three warp axes from one another.
const WARP_OFFSETS: [DVec3; 3] = [
    DVec3::new(31.0, 17.0, 59.0),
    DVec3::new(97.0, 43.0, 11.0),
    DVec3::new(59.0, 71.0, 23.0),
];

/// Deterministic height sampler.
///
/// Two synthesizers built from equal configs return bit-identical heights for
/// the same direction; no other state influences the result.
#[derive(Clone, Debug)]
pub struct NoiseSynthesizer {
    config: NoiseConfig,
    base: Perlin,
    warp: Simplex,
}

impl NoiseSynthesizer {
    #[must_use]
    pub fn new(config: &NoiseConfig) -> Self {
        Self {
            config: config.clone(),
            base: Perlin::new(config.seed),
            warp: Simplex::new(config.seed ^ WARP_SEED_MIX),
        }
    }

    #[must_use]
    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Height above the base radius for the unit direction `dir`, in world units.
    #[must_use]
    pub fn height(&self, dir: DVec3) -> f64 {
        let sample = self.warped(dir);

        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut total = 0.0;
        for _ in 0..self.config.octaves {
            let p = sample * frequency;
            total += self.base_value([p.x, p.y, p.z]) * amplitude;
            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }
        total * self.config.height_scale
    }

    /// Upper bound on `|height(dir)|`: the geometric sum of octave amplitudes.
    #[must_use]
    pub fn max_amplitude(&self) -> f64 {
        let mut amplitude = 1.0;
        let mut sum = 0.0;
        for _ in 0..self.config.octaves {
            sum += amplitude;
            amplitude *= self.config.persistence;
        }
        sum * self.config.height_scale
    }

    /// Map a height into `[0, 1]` using [`Self::max_amplitude`].
    #[must_use]
    pub fn normalize(&self, height: f64) -> f64 {
        let max = self.max_amplitude();
        if max <= 0.0 {
            return 0.5;
        }
        ((height / max + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    fn warped(&self, dir: DVec3) -> DVec3 {
        let base = dir * self.config.frequency;
        if !self.config.enable_warp {
            return base;
        }
        let wf = self.config.frequency * 0.5;
        let axis = |offset: DVec3| {
            let p = (dir + offset) * wf;
            self.warp.get([p.x, p.y, p.z])
        };
        let offset = DVec3::new(
            axis(WARP_OFFSETS[0]),
            axis(WARP_OFFSETS[1]),
            axis(WARP_OFFSETS[2]),
        );
        base + offset * self.config.warp_strength
    }

    fn base_value(&self, p: [f64; 3]) -> f64 {
        let n = self.base.get(p);
        match self.config.variant {
            NoiseVariant::Standard => n,
            NoiseVariant::Ridged => 1.0 - n.abs(),
            NoiseVariant::Billow => 2.0 * n.abs() - 1.0,
        }
    }
}
