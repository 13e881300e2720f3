//! Planar geometry shared by placement and solving.

use crate::rng::XorShift64Star;
use serde::{Deserialize, Serialize};

pub type Point = nalgebra::Vector2<f64>;

/// Norm substituted for a zero-length displacement before normalizing it.
pub const NORM_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: Point,
    /// The input had zero length and [`NORM_FLOOR`] was used instead.
    pub degenerate: bool,
}

/// Maps `z` onto the sphere of radius `radius`: `z / |z| * radius`.
pub fn project_onto_ball(z: &Point, radius: f64) -> Projection {
    let mut norm = z.norm();
    let degenerate = norm == 0.0;
    if degenerate {
        tracing::debug!(
            radius,
            "zero-length displacement in ball projection, using norm floor {NORM_FLOOR}"
        );
        norm = NORM_FLOOR;
    }
    Projection {
        point: z / norm * radius,
        degenerate,
    }
}

/// Axis-aligned rectangle that bounds random draws and placements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Default for Region {
    fn default() -> Self {
        Self {
            min: [0.0, 0.0],
            max: [100.0, 100.0],
        }
    }
}

impl Region {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self { min, max }
    }

    pub fn square(side: f64) -> Self {
        Self::new([0.0, 0.0], [side, side])
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> Point {
        self.fraction(0.5, 0.5)
    }

    /// Point at the given fraction of the width and height, measured from `min`.
    pub fn fraction(&self, fx: f64, fy: f64) -> Point {
        Point::new(
            self.min[0] + fx * self.width(),
            self.min[1] + fy * self.height(),
        )
    }

    /// One of the four equal quadrants, in the order low-low, high-low, low-high, high-high.
    /// Indices wrap around.
    pub fn quadrant(&self, index: usize) -> Region {
        let c = self.center();
        let (x, y) = match index % 4 {
            0 => ([self.min[0], c.x], [self.min[1], c.y]),
            1 => ([c.x, self.max[0]], [self.min[1], c.y]),
            2 => ([self.min[0], c.x], [c.y, self.max[1]]),
            _ => ([c.x, self.max[0]], [c.y, self.max[1]]),
        };
        Region::new([x[0], y[0]], [x[1], y[1]])
    }

    /// Square of half-side `spread` centered on `center`, clipped to this region.
    pub fn around(&self, center: &Point, spread: f64) -> Region {
        Region::new(
            [
                (center.x - spread).max(self.min[0]),
                (center.y - spread).max(self.min[1]),
            ],
            [
                (center.x + spread).min(self.max[0]),
                (center.y + spread).min(self.max[1]),
            ],
        )
    }

    pub fn contains(&self, p: &Point) -> bool {
        (self.min[0]..=self.max[0]).contains(&p.x) && (self.min[1]..=self.max[1]).contains(&p.y)
    }

    pub fn clamp(&self, p: &Point) -> Point {
        Point::new(
            p.x.clamp(self.min[0], self.max[0]),
            p.y.clamp(self.min[1], self.max[1]),
        )
    }

    pub fn sample(&self, rng: &mut XorShift64Star) -> Point {
        let x = rng.uniform(self.min[0], self.max[0]);
        let y = rng.uniform(self.min[1], self.max[1]);
        Point::new(x, y)
    }
}
