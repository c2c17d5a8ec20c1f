//! Row-major height samples over a patch.

use serde::{Deserialize, Serialize};

/// `(resolution + 1)²` height samples laid out row-major (`y * side + x`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightGrid {
    resolution: usize,
    heights: Vec<f64>,
}

impl HeightGrid {
    /// Returns `None` unless `heights.len() == (resolution + 1)²`.
    #[must_use]
    pub fn new(resolution: usize, heights: Vec<f64>) -> Option<Self> {
        let side = resolution + 1;
        (resolution > 0 && heights.len() == side * side).then_some(Self {
            resolution,
            heights,
        })
    }

    /// Grid filled by `f(x, y)` for every sample.
    pub fn from_fn(resolution: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let side = resolution + 1;
        let mut heights = Vec::with_capacity(side * side);
        for y in 0..side {
            for x in 0..side {
                heights.push(f(x, y));
            }
        }
        Self {
            resolution,
            heights,
        }
    }

    /// Cells per edge.
    #[must_use]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Samples per edge.
    #[must_use]
    pub fn side(&self) -> usize {
        self.resolution + 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.side() + x
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.heights[self.index(x, y)]
    }

    #[must_use]
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn heights_mut(&mut self) -> &mut [f64] {
        &mut self.heights
    }

    #[must_use]
    pub fn into_heights(self) -> Vec<f64> {
        self.heights
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.heights.iter().sum()
    }

    /// `(min, max)` over all samples.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.heights
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }

    /// Gradient magnitude at a sample using central differences (one-sided at edges).
    #[must_use]
    pub fn slope(&self, x: usize, y: usize, cell_size: f64) -> f64 {
        let last = self.resolution;
        let (x0, x1) = (x.saturating_sub(1), (x + 1).min(last));
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(last));
        let dx = (self.get(x1, y) - self.get(x0, y)) / ((x1 - x0) as f64 * cell_size);
        let dy = (self.get(x, y1) - self.get(x, y0)) / ((y1 - y0) as f64 * cell_size);
        dx.hypot(dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(HeightGrid::new(2, vec![0.0; 9]).is_some());
        assert!(HeightGrid::new(2, vec![0.0; 8]).is_none());
        assert!(HeightGrid::new(0, vec![0.0]).is_none());
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let grid = HeightGrid::from_fn(2, |x, y| (y * 10 + x) as f64);
        assert_eq!(grid.heights(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0]);
        assert_eq!(grid.get(1, 2), 21.0);
    }

    #[test]
    fn test_slope_of_plane() {
        let grid = HeightGrid::from_fn(4, |x, _| x as f64 * 2.0);
        for (x, y) in [(0, 0), (2, 2), (4, 1)] {
            assert!((grid.slope(x, y, 1.0) - 2.0).abs() < 1e-12);
        }
        assert!((grid.slope(2, 2, 2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_range() {
        let grid = HeightGrid::from_fn(2, |x, y| x as f64 - y as f64);
        assert_eq!(grid.range(), (-2.0, 2.0));
    }
}
