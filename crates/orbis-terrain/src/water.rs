//! Ocean surface and river extraction from a patch height grid.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::HeightGrid;

/// Rivers traced per patch at most.
const MAX_RIVERS: usize = 4;

/// Paths shorter than this are puddles, not rivers.
const MIN_RIVER_POINTS: usize = 3;

/// Water found on one patch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterBody {
    /// Sea-surface points above every submerged sample.
    pub ocean_points: Vec<DVec3>,
    /// Polylines following steepest descent from high ground.
    pub rivers: Vec<Vec<DVec3>>,
}

impl WaterBody {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ocean_points.is_empty() && self.rivers.is_empty()
    }
}

/// Find ocean and rivers on `grid`. `directions` is the unit direction of every sample.
///
/// Returns an empty body if `directions` does not match the grid.
#[must_use]
pub fn extract_water(grid: &HeightGrid, directions: &[DVec3], radius: f64, sea_level: f64) -> WaterBody {
    if directions.len() != grid.len() {
        return WaterBody::default();
    }
    let heights = grid.heights();
    let surface = |i: usize, h: f64| directions[i] * (radius + h);

    let ocean_points = heights
        .iter()
        .enumerate()
        .filter(|&(_, &h)| h < sea_level)
        .map(|(i, _)| surface(i, sea_level))
        .collect();

    let mut sources: Vec<usize> = (0..heights.len()).filter(|&i| heights[i] >= sea_level).collect();
    sources.sort_by(|&a, &b| heights[b].total_cmp(&heights[a]).then(a.cmp(&b)));

    let mut visited = vec![false; heights.len()];
    let mut rivers = Vec::new();
    for source in sources {
        if rivers.len() >= MAX_RIVERS {
            break;
        }
        if visited[source] {
            continue;
        }
        let path = descend(grid, source, sea_level);
        if path.len() < MIN_RIVER_POINTS {
            continue;
        }
        for &i in &path {
            visited[i] = true;
        }
        rivers.push(path.into_iter().map(|i| surface(i, heights[i])).collect());
    }

    WaterBody {
        ocean_points,
        rivers,
    }
}

/// Sample indices from `start` down the steepest 8-neighbour until sea level or a pit.
fn descend(grid: &HeightGrid, start: usize, sea_level: f64) -> Vec<usize> {
    let side = grid.side();
    let heights = grid.heights();
    let mut path = vec![start];
    let mut current = start;

    while heights[current] >= sea_level {
        let (x, y) = (current % side, current / side);
        let mut next = current;
        for ny in y.saturating_sub(1)..=(y + 1).min(side - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(side - 1) {
                let i = ny * side + nx;
                if heights[i] < heights[next] {
                    next = i;
                }
            }
        }
        if next == current {
            break;
        }
        path.push(next);
        current = next;
    }
    path
}
