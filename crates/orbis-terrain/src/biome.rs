//! Threshold biome classification and majority smoothing.

use orbis_config::{BiomeConfig, BiomeVariant};
use serde::{Deserialize, Serialize};

use crate::climate::ClimateSample;

/// Land-cover label for one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Biome {
    Ocean = 0,
    Beach = 1,
    Plains = 2,
    Forest = 3,
    Mountain = 4,
    Peak = 5,
    Desert = 6,
    Snow = 7,
}

impl Biome {
    pub const COUNT: usize = 8;

    pub const ALL: [Biome; Self::COUNT] = [
        Biome::Ocean,
        Biome::Beach,
        Biome::Plains,
        Biome::Forest,
        Biome::Mountain,
        Biome::Peak,
        Biome::Desert,
        Biome::Snow,
    ];

    #[must_use]
    pub fn is_water(self) -> bool {
        self == Biome::Ocean
    }
}

/// Pure classifier over a captured [`BiomeConfig`].
#[derive(Clone, Debug, Default)]
pub struct BiomeClassifier {
    config: BiomeConfig,
}

impl BiomeClassifier {
    #[must_use]
    pub fn new(config: &BiomeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Label for normalized `altitude`, `slope` and `humidity`. First matching bracket wins.
    #[must_use]
    pub fn classify(&self, altitude: f64, slope: f64, humidity: f64) -> Biome {
        match self.config.variant {
            BiomeVariant::Altitude => {
                let t = &self.config.altitude;
                if altitude <= t.ocean {
                    Biome::Ocean
                } else if altitude < t.beach {
                    Biome::Beach
                } else if altitude < t.plains {
                    Biome::Plains
                } else if altitude < t.forest {
                    Biome::Forest
                } else if altitude < t.mountain {
                    Biome::Mountain
                } else {
                    Biome::Peak
                }
            }
            BiomeVariant::Climate => {
                let t = &self.config.climate;
                if altitude >= t.snow_altitude {
                    Biome::Snow
                } else if altitude >= t.desert_altitude {
                    Biome::Desert
                } else if altitude >= t.mountain_altitude && slope >= t.plains_slope {
                    Biome::Mountain
                } else if humidity >= t.forest_humidity {
                    Biome::Forest
                } else {
                    Biome::Plains
                }
            }
        }
    }

    #[must_use]
    pub fn classify_sample(&self, sample: &ClimateSample) -> Biome {
        self.classify(sample.altitude, sample.slope, sample.humidity)
    }

    /// Applies the configured number of smoothing passes, if enabled.
    pub fn smooth(&self, labels: &mut [Biome], side: usize) {
        if self.config.smooth_transitions {
            for _ in 0..self.config.smoothing_passes {
                if !smooth_pass(labels, side) {
                    break;
                }
            }
        }
    }
}

/// One 3×3 majority pass. A label only flips when another label strictly
/// outnumbers it in the window. Returns whether anything changed.
pub fn smooth_pass(labels: &mut [Biome], side: usize) -> bool {
    if side == 0 || labels.len() != side * side {
        return false;
    }
    let source = labels.to_vec();
    let mut changed = false;

    for y in 0..side {
        for x in 0..side {
            let mut counts = [0u8; Biome::COUNT];
            for ny in y.saturating_sub(1)..=(y + 1).min(side - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(side - 1) {
                    counts[source[ny * side + nx] as usize] += 1;
                }
            }
            let current = source[y * side + x];
            let mut best = current;
            for biome in Biome::ALL {
                if counts[biome as usize] > counts[best as usize] {
                    best = biome;
                }
            }
            if best != current {
                labels[y * side + x] = best;
                changed = true;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_config::BiomeConfig;

    fn altitude_classifier() -> BiomeClassifier {
        BiomeClassifier::new(&BiomeConfig::default())
    }

    fn climate_classifier() -> BiomeClassifier {
        BiomeClassifier::new(&BiomeConfig {
            variant: BiomeVariant::Climate,
            ..BiomeConfig::default()
        })
    }

    #[test]
    fn test_altitude_brackets() {
        let c = altitude_classifier();
        let cases = [
            (0.0, Biome::Ocean),
            (0.3, Biome::Ocean),
            (0.32, Biome::Beach),
            (0.35, Biome::Plains),
            (0.6, Biome::Forest),
            (0.7, Biome::Mountain),
            (0.85, Biome::Peak),
            (1.0, Biome::Peak),
        ];
        for (alt, expected) in cases {
            assert_eq!(c.classify(alt, 0.0, 0.0), expected, "altitude {alt}");
        }
    }

    #[test]
    fn test_climate_brackets() {
        let c = climate_classifier();
        assert_eq!(c.classify(0.9, 0.0, 1.0), Biome::Snow);
        assert_eq!(c.classify(0.75, 0.0, 1.0), Biome::Desert);
        assert_eq!(c.classify(0.6, 0.5, 1.0), Biome::Mountain);
        assert_eq!(c.classify(0.6, 0.1, 0.7), Biome::Forest);
        assert_eq!(c.classify(0.2, 0.9, 0.7), Biome::Forest);
        assert_eq!(c.classify(0.2, 0.9, 0.1), Biome::Plains);
    }

    #[test]
    fn test_classification_is_pure() {
        let c = climate_classifier();
        for i in 0..50 {
            let a = i as f64 / 50.0;
            assert_eq!(c.classify(a, 1.0 - a, a * 0.5), c.classify(a, 1.0 - a, a * 0.5));
        }
    }

    #[test]
    fn test_smoothing_removes_isolated_label() {
        let mut labels = vec![Biome::Plains; 9];
        labels[4] = Biome::Peak;
        assert!(smooth_pass(&mut labels, 3));
        assert!(labels.iter().all(|&b| b == Biome::Plains));
    }

    #[test]
    fn test_smoothing_keeps_ties() {
        let side = 4;
        let mut labels: Vec<Biome> = (0..side * side)
            .map(|i| if i % side < 2 { Biome::Ocean } else { Biome::Beach })
            .collect();
        let before = labels.clone();
        assert!(!smooth_pass(&mut labels, side));
        assert_eq!(labels, before);
    }

    #[test]
    fn test_smoothing_respects_toggle() {
        let classifier = BiomeClassifier::new(&BiomeConfig {
            smooth_transitions: false,
            ..BiomeConfig::default()
        });
        let mut labels = vec![Biome::Forest; 9];
        labels[4] = Biome::Snow;
        classifier.smooth(&mut labels, 3);
        assert_eq!(labels[4], Biome::Snow);

        altitude_classifier().smooth(&mut labels, 3);
        assert_eq!(labels[4], Biome::Forest);
    }
}
