//! Droplet hydraulic erosion.
//!
//! Each droplet starts on a random interior sample and walks to its lowest
//! 8-neighbour, eroding while it has spare capacity and depositing once it
//! carries more than it can hold. Droplets run strictly in order off a
//! single random stream, so a given seed always reproduces the same terrain.

use orbis_config::HydraulicConfig;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::HeightGrid;

/// Capacity floor, so droplets on near-flat ground can still carry something.
const MIN_CAPACITY: f64 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct HydraulicTotals {
    pub droplets: u32,
    pub eroded: f64,
    pub deposited: f64,
    pub max_capacity: f64,
}

pub(crate) fn run(grid: &mut HeightGrid, config: &HydraulicConfig, rng: &mut ChaCha8Rng) -> HydraulicTotals {
    let mut totals = HydraulicTotals::default();
    let res = grid.resolution();
    if res < 2 {
        return totals;
    }
    let side = grid.side();

    for _ in 0..config.iterations {
        let mut x = rng.random_range(1..res);
        let mut y = rng.random_range(1..res);
        let mut water = 1.0;
        let mut sediment = 0.0;
        totals.droplets += 1;

        for _ in 0..config.max_steps {
            let idx = grid.index(x, y);
            let heights = grid.heights_mut();
            let here = heights[idx];

            let (mut nx, mut ny, mut lowest) = (x, y, here);
            for oy in -1isize..=1 {
                for ox in -1isize..=1 {
                    let (Some(cx), Some(cy)) =
                        (x.checked_add_signed(ox), y.checked_add_signed(oy))
                    else {
                        continue;
                    };
                    if cx >= side || cy >= side {
                        continue;
                    }
                    let h = heights[cy * side + cx];
                    if h < lowest {
                        lowest = h;
                        nx = cx;
                        ny = cy;
                    }
                }
            }
            if (nx, ny) == (x, y) {
                break;
            }

            let delta = lowest - here;
            let capacity = (-delta * config.sediment_capacity).max(MIN_CAPACITY);
            totals.max_capacity = totals.max_capacity.max(capacity);

            if sediment > capacity {
                let deposit = (sediment - capacity) * config.deposit_rate;
                sediment -= deposit;
                heights[idx] += deposit;
                totals.deposited += deposit;
            } else {
                let erode = ((capacity - sediment) * config.erode_rate).min(-delta);
                sediment += erode;
                heights[idx] -= erode;
                totals.eroded += erode;
            }

            water *= config.water_decay;
            x = nx;
            y = ny;
            if water < config.min_water {
                break;
            }
        }
    }
    totals
}
