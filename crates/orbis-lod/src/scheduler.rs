//! Timer that paces LOD re-evaluation and cache maintenance.

use orbis_config::GenerationConfig;

/// Longest frame accounted for in one [`LodScheduler::advance`]; longer
/// stalls are clamped so a hitch does not queue a burst of work.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// What the caller should run this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerTick {
    pub update_lod: bool,
    pub maintain_cache: bool,
}

/// Accumulates frame time and fires each job at most once per frame.
#[derive(Clone, Debug)]
pub struct LodScheduler {
    lod_interval: f64,
    cleanup_interval: f64,
    lod_accumulator: f64,
    cleanup_accumulator: f64,
    elapsed: f64,
    lod_updates: u64,
    cleanups: u64,
}

impl LodScheduler {
    #[must_use]
    pub fn new(lod_interval: f64, cleanup_interval: f64) -> Self {
        Self {
            lod_interval: lod_interval.max(f64::EPSILON),
            cleanup_interval: cleanup_interval.max(f64::EPSILON),
            lod_accumulator: 0.0,
            cleanup_accumulator: 0.0,
            elapsed: 0.0,
            lod_updates: 0,
            cleanups: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.lod_update_interval, config.cache_cleanup_interval)
    }

    /// Account for `dt` seconds. Negative or non-finite `dt` is ignored.
    pub fn advance(&mut self, dt: f64) -> SchedulerTick {
        if !dt.is_finite() || dt <= 0.0 {
            return SchedulerTick::default();
        }
        let dt = if dt > MAX_FRAME_TIME {
            tracing::warn!(
                "frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                dt * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            dt
        };
        self.elapsed += dt;
        self.lod_accumulator += dt;
        self.cleanup_accumulator += dt;

        let tick = SchedulerTick {
            update_lod: fire(&mut self.lod_accumulator, self.lod_interval),
            maintain_cache: fire(&mut self.cleanup_accumulator, self.cleanup_interval),
        };
        self.lod_updates += u64::from(tick.update_lod);
        self.cleanups += u64::from(tick.maintain_cache);
        tick
    }

    /// Seconds accounted for so far.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[must_use]
    pub fn lod_updates(&self) -> u64 {
        self.lod_updates
    }

    #[must_use]
    pub fn cleanups(&self) -> u64 {
        self.cleanups
    }
}

/// Consume one interval if due, keeping the remainder below one interval.
fn fire(accumulator: &mut f64, interval: f64) -> bool {
    if *accumulator < interval {
        return false;
    }
    *accumulator = (*accumulator - interval) % interval;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lod_fires_every_interval() {
        let mut scheduler = LodScheduler::new(0.25, 30.0);
        let fired = (0..16)
            .filter(|_| scheduler.advance(0.0625).update_lod)
            .count();
        assert_eq!(fired, 4);
        assert_eq!(scheduler.lod_updates(), 4);
        assert_eq!(scheduler.cleanups(), 0);
    }

    #[test]
    fn test_cleanup_fires_after_its_interval() {
        let mut scheduler = LodScheduler::new(0.2, 1.0);
        let mut ticks = Vec::new();
        for _ in 0..10 {
            ticks.push(scheduler.advance(0.25));
        }
        let cleanups = ticks.iter().filter(|t| t.maintain_cache).count();
        assert_eq!(cleanups, 2);
        assert!(ticks[3].maintain_cache);
        assert!(ticks.iter().all(|t| t.update_lod));
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut scheduler = LodScheduler::new(0.2, 30.0);
        let tick = scheduler.advance(10.0);
        assert!(tick.update_lod);
        assert_eq!(scheduler.elapsed(), MAX_FRAME_TIME);
        // Clamping leaves no backlog.
        assert!(!scheduler.advance(0.01).update_lod);
    }

    #[test]
    fn test_bad_dt_ignored() {
        let mut scheduler = LodScheduler::new(0.2, 30.0);
        assert_eq!(scheduler.advance(-1.0), SchedulerTick::default());
        assert_eq!(scheduler.advance(f64::NAN), SchedulerTick::default());
        assert_eq!(scheduler.elapsed(), 0.0);
    }

    #[test]
    fn test_from_config() {
        let scheduler = LodScheduler::from_config(&GenerationConfig::default());
        assert_eq!(scheduler.lod_interval, GenerationConfig::default().lod_update_interval);
    }
}
