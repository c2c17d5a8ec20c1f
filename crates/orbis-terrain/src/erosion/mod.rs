//! Heightfield erosion: hydraulic droplets, then thermal slumping, then wind.
//!
//! Each stage has its own toggle in [`ErosionConfig`]. The simulator works on
//! heights only; callers rebuild positions as `dir * (radius + h)`.

mod hydraulic;
mod thermal;
mod wind;

use orbis_config::ErosionConfig;
use serde::{Deserialize, Serialize};

use crate::{HeightGrid, patch_rng};

/// What one [`ErosionSimulator::apply`] call did to a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErosionReport {
    pub droplets: u32,
    /// Sum of every height removed by droplets.
    pub total_eroded: f64,
    /// Sum of every height put back by droplets.
    pub total_deposited: f64,
    /// Largest per-step sediment capacity seen. No droplet ever carries more.
    pub max_capacity: f64,
    pub thermal_moved: f64,
    pub wind_moved: f64,
}

impl ErosionReport {
    /// Sediment still suspended in droplets when they stopped.
    #[must_use]
    pub fn suspended(&self) -> f64 {
        self.total_eroded - self.total_deposited
    }

    /// Upper bound on [`Self::suspended`]: one full load per droplet.
    #[must_use]
    pub fn mass_bound(&self) -> f64 {
        f64::from(self.droplets) * self.max_capacity
    }
}

/// Applies the configured erosion stages to patch height grids.
#[derive(Clone, Debug, Default)]
pub struct ErosionSimulator {
    config: ErosionConfig,
}

impl ErosionSimulator {
    #[must_use]
    pub fn new(config: &ErosionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    /// `true` if at least one stage would touch the grid.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.config.hydraulic.enabled || self.config.thermal.enabled || self.config.wind.enabled
    }

    /// Run every enabled stage on `grid`, drawing droplet starts from `seed`.
    pub fn apply(&self, grid: &mut HeightGrid, seed: u32) -> ErosionReport {
        let mut report = ErosionReport::default();

        if self.config.hydraulic.enabled {
            let mut rng = patch_rng(seed);
            let totals = hydraulic::run(grid, &self.config.hydraulic, &mut rng);
            report.droplets = totals.droplets;
            report.total_eroded = totals.eroded;
            report.total_deposited = totals.deposited;
            report.max_capacity = totals.max_capacity;
        }
        if self.config.thermal.enabled {
            report.thermal_moved = thermal::run(grid, &self.config.thermal);
        }
        if self.config.wind.enabled {
            report.wind_moved = wind::run(grid, &self.config.wind);
        }

        tracing::trace!(
            seed,
            droplets = report.droplets,
            eroded = report.total_eroded,
            deposited = report.total_deposited,
            "erosion applied"
        );
        report
    }
}
