//! Talus slumping: material above the tolerated step slides to lower 4-neighbours.

use orbis_config::ThermalConfig;

use crate::HeightGrid;

const NEIGHBOURS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Returns the total height moved. Mass is conserved exactly up to rounding.
pub(crate) fn run(grid: &mut HeightGrid, config: &ThermalConfig) -> f64 {
    let (lo, hi) = grid.range();
    let talus = config.talus * (hi - lo);
    let strength = config.strength.clamp(0.0, 1.0);
    let side = grid.side();
    let mut delta = vec![0.0; grid.len()];
    let mut moved_total = 0.0;

    for _ in 0..config.iterations {
        delta.fill(0.0);
        let heights = grid.heights();

        for y in 0..side {
            for x in 0..side {
                let i = y * side + x;
                let h0 = heights[i];

                let mut steep = [(0usize, 0.0f64); 4];
                let mut count = 0;
                for (ox, oy) in NEIGHBOURS {
                    let (Some(nx), Some(ny)) = (x.checked_add_signed(ox), y.checked_add_signed(oy))
                    else {
                        continue;
                    };
                    if nx >= side || ny >= side {
                        continue;
                    }
                    let ni = ny * side + nx;
                    let diff = h0 - heights[ni];
                    if diff > talus {
                        steep[count] = (ni, diff - talus);
                        count += 1;
                    }
                }
                if count == 0 {
                    continue;
                }

                // Half the excess keeps the source from dropping below its receivers.
                let excess: f64 = steep[..count].iter().map(|&(_, e)| e).sum();
                let amount = strength * excess * 0.5 / count as f64;
                if amount <= 0.0 {
                    continue;
                }
                let share = amount / count as f64;
                delta[i] -= amount;
                for &(ni, _) in &steep[..count] {
                    delta[ni] += share;
                }
                moved_total += amount;
            }
        }

        for (h, d) in grid.heights_mut().iter_mut().zip(&delta) {
            *h += d;
        }
    }
    moved_total
}
