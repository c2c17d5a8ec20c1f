//! Everything a worker needs to build chunks, captured once.

use std::sync::Arc;

use orbis_config::{Config, ConfigError};
use orbis_terrain::{BiomeClassifier, ErosionSimulator, NoiseSynthesizer, VegetationCatalog};

use crate::events::EventBus;

/// Validated configuration plus the collaborators built from it.
///
/// Cheap to clone; clones share every collaborator. The configuration is
/// never mutated after capture, so two contexts built from equal configs
/// generate identical chunks.
#[derive(Clone, Debug)]
pub struct GenerationContext {
    config: Arc<Config>,
    noise: Arc<NoiseSynthesizer>,
    erosion: Arc<ErosionSimulator>,
    classifier: Arc<BiomeClassifier>,
    vegetation: Arc<VegetationCatalog>,
    events: Arc<EventBus>,
}

impl GenerationContext {
    /// Validate `config` and build collaborators with a fresh event bus.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_events(config, Arc::new(EventBus::default()))
    }

    pub fn with_events(config: Config, events: Arc<EventBus>) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        tracing::debug!(
            seed = config.noise.seed,
            radius = config.generation.base_radius,
            max_lod = config.generation.max_lod,
            "generation context captured"
        );
        Ok(Self {
            noise: Arc::new(NoiseSynthesizer::new(&config.noise)),
            erosion: Arc::new(ErosionSimulator::new(&config.erosion)),
            classifier: Arc::new(BiomeClassifier::new(&config.biome)),
            vegetation: Arc::new(VegetationCatalog::default()),
            config: Arc::new(config),
            events,
        })
    }

    /// Swap in a custom vegetation catalog.
    #[must_use]
    pub fn with_vegetation(mut self, catalog: VegetationCatalog) -> Self {
        self.vegetation = Arc::new(catalog);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn noise(&self) -> &NoiseSynthesizer {
        &self.noise
    }

    #[must_use]
    pub fn erosion(&self) -> &ErosionSimulator {
        &self.erosion
    }

    #[must_use]
    pub fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn vegetation(&self) -> &VegetationCatalog {
        &self.vegetation
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = Config::default();
        config.generation.base_radius = -5.0;
        config.noise.octaves = 0;
        match GenerationContext::new(config) {
            Err(ConfigError::Invalid(issues)) => assert!(issues.len() >= 2, "{issues:?}"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_clones_share_collaborators() {
        let ctx = GenerationContext::new(Config::default()).unwrap();
        let clone = ctx.clone();
        assert!(Arc::ptr_eq(ctx.events(), clone.events()));
        assert!(std::ptr::eq(ctx.noise(), clone.noise()));
        assert_eq!(clone.config().noise.seed, 1337);
    }
}
