//! Sculpting brush that raises or lowers terrain around a world position.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::HeightGrid;

/// Spherical brush with linear falloff from full `strength` at `center` to
/// nothing at `radius`. Negative strength lowers terrain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightBrush {
    pub center: DVec3,
    pub radius: f64,
    pub strength: f64,
}

impl HeightBrush {
    #[must_use]
    pub const fn new(center: DVec3, radius: f64, strength: f64) -> Self {
        Self {
            center,
            radius,
            strength,
        }
    }

    /// Finite inputs and a positive radius.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite() && self.radius > 0.0 && self.strength.is_finite()
    }

    /// Weight in `[0, 1]` at `position`; zero on and beyond the rim.
    #[must_use]
    pub fn falloff(&self, position: DVec3) -> f64 {
        let distance = position.distance(self.center);
        if distance < self.radius {
            1.0 - distance / self.radius
        } else {
            0.0
        }
    }

    /// Height change at `position`.
    #[must_use]
    pub fn offset_at(&self, position: DVec3) -> f64 {
        self.strength * self.falloff(position)
    }
}

impl HeightGrid {
    /// Displace every sample inside `brush` along its direction. Sample `i`
    /// sits at `directions[i] * (radius + height)`. Returns how many samples
    /// moved; an invalid brush or mismatched `directions` moves none.
    pub fn apply_brush(&mut self, directions: &[DVec3], radius: f64, brush: &HeightBrush) -> usize {
        if !brush.is_valid() || directions.len() != self.len() {
            return 0;
        }
        let mut touched = 0;
        for (dir, h) in directions.iter().zip(self.heights_mut()) {
            let offset = brush.offset_at(*dir * (radius + *h));
            if offset != 0.0 {
                *h += offset;
                touched += 1;
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(resolution: usize) -> (HeightGrid, Vec<DVec3>) {
        let side = resolution + 1;
        let directions = (0..side * side)
            .map(|i| {
                let (x, y) = ((i % side) as f64, (i / side) as f64);
                DVec3::new(x * 0.01, y * 0.01, 1.0).normalize()
            })
            .collect();
        (HeightGrid::from_fn(resolution, |_, _| 0.0), directions)
    }

    #[test]
    fn test_falloff_is_linear() {
        let brush = HeightBrush::new(DVec3::ZERO, 10.0, 4.0);
        assert_eq!(brush.falloff(DVec3::ZERO), 1.0);
        assert!((brush.falloff(DVec3::X * 5.0) - 0.5).abs() < 1e-12);
        assert_eq!(brush.falloff(DVec3::X * 10.0), 0.0);
        assert!((brush.offset_at(DVec3::Y * 2.5) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_brush_raises_only_inside_radius() {
        let (mut grid, directions) = flat(8);
        let center = directions[grid.index(4, 4)] * 100.0;
        let brush = HeightBrush::new(center, 2.5, 3.0);
        let touched = grid.apply_brush(&directions, 100.0, &brush);

        assert!(touched > 0 && touched < grid.len());
        assert!((grid.get(4, 4) - 3.0).abs() < 1e-9, "full strength at the center");
        assert_eq!(grid.get(0, 0), 0.0, "corner is out of reach");
        let moved = grid.heights().iter().filter(|&&h| h != 0.0).count();
        assert_eq!(moved, touched);
        assert!(grid.heights().iter().all(|&h| (0.0..=3.0).contains(&h)));
    }

    #[test]
    fn test_negative_strength_lowers() {
        let (mut grid, directions) = flat(4);
        let center = directions[grid.index(2, 2)] * 50.0;
        grid.apply_brush(&directions, 50.0, &HeightBrush::new(center, 1.0, -2.0));
        assert!((grid.get(2, 2) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_brush_is_ignored() {
        let (mut grid, directions) = flat(4);
        let before = grid.clone();
        assert_eq!(grid.apply_brush(&directions, 50.0, &HeightBrush::new(DVec3::NAN, 1.0, 1.0)), 0);
        assert_eq!(grid.apply_brush(&directions, 50.0, &HeightBrush::new(DVec3::Z, 0.0, 1.0)), 0);
        assert_eq!(grid.apply_brush(&directions[1..], 50.0, &HeightBrush::new(DVec3::Z, 1.0, 1.0)), 0);
        assert_eq!(grid, before);
    }
}
