//! Axis-aligned rectangles in a face's unit UV square.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A rectangle `[min, max]` in face UV space, with `0 <= min < max <= 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UvRect {
    pub min: DVec2,
    pub max: DVec2,
}

impl UvRect {
    /// The whole face.
    pub const FULL: UvRect = UvRect {
        min: DVec2::ZERO,
        max: DVec2::ONE,
    };

    #[must_use]
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn mid(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        let s = self.size();
        s.x * s.y
    }

    /// Point at fractional position `(fx, fy)` inside the rectangle.
    #[must_use]
    pub fn lerp(&self, fx: f64, fy: f64) -> DVec2 {
        DVec2::new(
            self.min.x + (self.max.x - self.min.x) * fx,
            self.min.y + (self.max.y - self.min.y) * fy,
        )
    }

    /// Closed on the min edges, open on the max edges, except at the face border.
    #[must_use]
    pub fn contains(&self, uv: DVec2) -> bool {
        let in_axis = |p: f64, lo: f64, hi: f64| p >= lo && (p < hi || (hi >= 1.0 && p <= hi));
        in_axis(uv.x, self.min.x, self.max.x) && in_axis(uv.y, self.min.y, self.max.y)
    }

    /// Midpoint split: bottom-left, bottom-right, top-left, top-right.
    #[must_use]
    pub fn quadrants(&self) -> [UvRect; 4] {
        let mid = self.mid();
        [
            UvRect::new(self.min, mid),
            UvRect::new(DVec2::new(mid.x, self.min.y), DVec2::new(self.max.x, mid.y)),
            UvRect::new(DVec2::new(self.min.x, mid.y), DVec2::new(mid.x, self.max.y)),
            UvRect::new(mid, self.max),
        ]
    }

    /// Which of [`UvRect::quadrants`] holds `uv`.
    #[must_use]
    pub fn quadrant_of(&self, uv: DVec2) -> usize {
        let mid = self.mid();
        let right = usize::from(uv.x >= mid.x);
        let top = usize::from(uv.y >= mid.y);
        top * 2 + right
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}
