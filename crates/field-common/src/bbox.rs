//! Axis-aligned bounding box in data coordinates.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2;

/// An axis-aligned rectangle in the data coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a bounding box from an origin and a size (x, y, width, height).
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[Point2]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.iter().skip(1).fold(init, |bb, p| Self {
            min_x: bb.min_x.min(p.x),
            min_y: bb.min_y.min(p.y),
            max_x: bb.max_x.max(p.x),
            max_y: bb.max_y.max(p.y),
        }))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// True when the box has a positive, finite area.
    pub fn is_valid(&self) -> bool {
        self.width() > 0.0
            && self.height() > 0.0
            && self.width().is_finite()
            && self.height().is_finite()
    }

    /// Grow the box by `dx` on the left and right and `dy` on the top and bottom.
    pub fn expanded(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Corners in counter-clockwise order starting at (min_x, min_y).
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.min_x, self.min_y),
            Point2::new(self.max_x, self.min_y),
            Point2::new(self.max_x, self.max_y),
            Point2::new(self.min_x, self.max_y),
        ]
    }
}
