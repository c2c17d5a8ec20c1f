//! Aeolian transport: exposed windward steps are shaved and carried one cell downwind.

use std::f64::consts::FRAC_PI_4;

use orbis_config::WindConfig;

use crate::HeightGrid;

/// Eight neighbour offsets counter-clockwise from +x.
const OCTANTS: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Snap a grid-space direction to the nearest neighbour offset.
pub(crate) fn snap_direction((wx, wy): (f64, f64)) -> (isize, isize) {
    let octant = (wy.atan2(wx) / FRAC_PI_4).round().rem_euclid(8.0) as usize;
    OCTANTS[octant % 8]
}

/// Returns the total height moved. Material never leaves the grid.
pub(crate) fn run(grid: &mut HeightGrid, config: &WindConfig) -> f64 {
    let (dx, dy) = snap_direction(config.direction);
    let strength = config.strength.clamp(0.0, 1.0);
    let side = grid.side();
    let mut delta = vec![0.0; grid.len()];
    let mut moved_total = 0.0;

    let offset = |x: usize, y: usize, ox: isize, oy: isize| -> Option<usize> {
        let nx = x.checked_add_signed(ox)?;
        let ny = y.checked_add_signed(oy)?;
        (nx < side && ny < side).then_some(ny * side + nx)
    };

    for _ in 0..config.iterations {
        delta.fill(0.0);
        let heights = grid.heights();

        for y in 0..side {
            for x in 0..side {
                let (Some(up), Some(down)) = (offset(x, y, -dx, -dy), offset(x, y, dx, dy)) else {
                    continue;
                };
                let i = y * side + x;
                let exposure = heights[i] - heights[up];
                if exposure <= 0.0 {
                    continue;
                }
                let lifted = strength * exposure * 0.5;
                delta[i] -= lifted;
                delta[down] += lifted;
                moved_total += lifted;
            }
        }

        for (h, d) in grid.heights_mut().iter_mut().zip(&delta) {
            *h += d;
        }
    }
    moved_total
}
