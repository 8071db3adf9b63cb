//! Common test fixtures for heatmap tests.
//!
//! This module provides pre-defined boundaries and sample sets that
//! represent common rendering scenarios.

use field_common::{BoundingBox, Point2, Polygon};
use std::path::PathBuf;
use tempfile::TempDir;

/// Common regions for testing.
pub mod regions {
    /// A 100 × 100 square at the origin
    pub const SQUARE: (f64, f64, f64, f64) = (0.0, 0.0, 100.0, 100.0);

    /// A wide, short strip
    pub const STRIP: (f64, f64, f64, f64) = (-50.0, 0.0, 150.0, 20.0);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (5.0, 5.0, 5.0, 5.0);
}

/// Convert a `(min_x, min_y, max_x, max_y)` tuple into a [`BoundingBox`].
pub fn bbox_of(t: (f64, f64, f64, f64)) -> BoundingBox {
    BoundingBox::new(t.0, t.1, t.2, t.3)
}

/// Axis-aligned square polygon with its lower-left corner at the origin.
pub fn square_boundary(size: f64) -> Polygon {
    Polygon::from(BoundingBox::new(0.0, 0.0, size, size))
}

/// Right triangle with legs of length `size` along the axes.
pub fn triangle_boundary(size: f64) -> Polygon {
    Polygon::new(vec![
        Point2::new(0.0, 0.0),
        Point2::new(size, 0.0),
        Point2::new(0.0, size),
    ])
}

/// Concave L-shaped polygon filling three quarters of a `size` square.
pub fn l_boundary(size: f64) -> Polygon {
    let h = size / 2.0;
    Polygon::new(vec![
        Point2::new(0.0, 0.0),
        Point2::new(size, 0.0),
        Point2::new(size, h),
        Point2::new(h, h),
        Point2::new(h, size),
        Point2::new(0.0, size),
    ])
}

/// Three well-separated points with values 0, 5 and 10.
pub fn three_points() -> (Vec<Point2>, Vec<f64>) {
    (
        vec![
            Point2::new(10.0, 10.0),
            Point2::new(90.0, 20.0),
            Point2::new(40.0, 80.0),
        ],
        vec![0.0, 5.0, 10.0],
    )
}

/// Temporary directory plus a path named `file_name` inside it.
///
/// Keep the `TempDir` alive for as long as the path is used.
pub fn temp_output(file_name: &str) -> (TempDir, PathBuf) {
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(e) => panic!("failed to create temp dir: {}", e),
    };
    let path = dir.path().join(file_name);
    (dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l_boundary_is_concave() {
        let l = l_boundary(10.0);
        assert!(l.contains(&Point2::new(2.0, 8.0)));
        assert!(l.contains(&Point2::new(8.0, 2.0)));
        assert!(!l.contains(&Point2::new(8.0, 8.0)));
    }

    #[test]
    fn test_bbox_of() {
        let b = bbox_of(regions::STRIP);
        assert_eq!(b.width(), 200.0);
        assert_eq!(b.height(), 20.0);
    }

    #[test]
    fn test_temp_output() {
        let (dir, path) = temp_output("out.png");
        assert!(path.starts_with(dir.path()));
    }
}
