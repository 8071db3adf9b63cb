//! Points and closed polygons.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::bbox::BoundingBox;

/// A 2D point in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation: `self + t * (other - self)`.
    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Point2::new(x, y)
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Point2::new(x, y)
    }
}

/// A closed polygon. The last vertex implicitly connects back to the first.
///
/// Fewer than three vertices is a degenerate boundary: it is representable
/// (an empty boundary disables rendering) but has no interior.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point2>,
}

impl Polygon {
    /// Build a polygon from a vertex ring. A trailing vertex equal to the
    /// first one is dropped so every ring is stored implicitly closed.
    pub fn new(mut vertices: Vec<Point2>) -> Self {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self { vertices }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// True when the polygon cannot enclose an area (fewer than 3 vertices).
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3
    }

    /// Iterate over edges `(start, end)`, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.vertices.len();
        let count = if n < 2 { 0 } else { n };
        (0..count).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| a.distance(&b)).sum()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, p: &Point2) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Shortest distance from `p` to any edge of the polygon.
    pub fn distance_to_perimeter(&self, p: &Point2) -> f64 {
        match self.vertices.len() {
            0 => f64::INFINITY,
            1 => self.vertices[0].distance(p),
            _ => self
                .edges()
                .map(|(a, b)| segment_distance(p, &a, &b))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Hash of every vertex coordinate, used to fingerprint cached geometry.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.vertices.len().hash(&mut hasher);
        for v in &self.vertices {
            v.x.to_bits().hash(&mut hasher);
            v.y.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl From<BoundingBox> for Polygon {
    fn from(bbox: BoundingBox) -> Self {
        Polygon::new(bbox.corners().to_vec())
    }
}

/// Distance from `p` to the segment `a`-`b`.
pub fn segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let len_sq = a.distance_squared(b);
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq).clamp(0.0, 1.0);
    p.distance(&a.lerp(b, t))
}

/// Hash of a coordinate array, bit-exact.
pub fn hash_points(points: &[Point2]) -> u64 {
    let mut hasher = DefaultHasher::new();
    points.len().hash(&mut hasher);
    for p in points {
        p.x.to_bits().hash(&mut hasher);
        p.y.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
    }

    #[test]
    fn test_closing_vertex_dropped() {
        let poly = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
        ]);
        assert_eq!(poly.len(), 3);
        assert_eq!(poly.edges().count(), 3);
    }

    #[test]
    fn test_contains() {
        let sq = unit_square();
        assert!(sq.contains(&Point2::new(0.5, 0.5)));
        assert!(!sq.contains(&Point2::new(1.5, 0.5)));
        assert!(!sq.contains(&Point2::new(-0.1, 0.5)));
    }

    #[test]
    fn test_perimeter_and_distance() {
        let sq = unit_square();
        assert!((sq.perimeter() - 4.0).abs() < 1e-12);
        assert!((sq.distance_to_perimeter(&Point2::new(0.5, 0.5)) - 0.5).abs() < 1e-12);
        assert!((sq.distance_to_perimeter(&Point2::new(2.0, 0.5)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_content_hash_sees_every_vertex() {
        let a = unit_square();
        let mut moved = a.vertices().to_vec();
        moved[2] = Point2::new(1.0, 1.5);
        let b = Polygon::new(moved);
        // Same vertex count and first vertex, different shape.
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash(), unit_square().content_hash());
    }

    #[test]
    fn test_degenerate() {
        assert!(Polygon::empty().is_degenerate());
        assert!(Polygon::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]).is_degenerate());
        assert!(!unit_square().is_degenerate());
    }
}
