//! Test data generators for scattered samples and synthetic fields.
//!
//! Every generator takes an explicit seed so failures reproduce.

use field_common::{BoundingBox, Point2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `n` uniformly random points inside `bbox`.
///
/// # Example
///
/// ```
/// use field_common::BoundingBox;
/// use test_utils::random_points;
///
/// let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
/// let points = random_points(20, &bbox, 7);
/// assert_eq!(points.len(), 20);
/// assert!(points.iter().all(|p| bbox.contains_point(p.x, p.y)));
/// assert_eq!(points, random_points(20, &bbox, 7));
/// ```
pub fn random_points(n: usize, bbox: &BoundingBox, seed: u64) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point2::new(
                rng.gen_range(bbox.min_x..=bbox.max_x),
                rng.gen_range(bbox.min_y..=bbox.max_y),
            )
        })
        .collect()
}

/// `n` uniformly random values in `[min, max)`.
pub fn random_values(n: usize, min: f64, max: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(min..max)).collect()
}

/// A `cols` × `rows` lattice over `bbox` with each point displaced by up
/// to `jitter` × the lattice spacing.
///
/// With `jitter < 0.5` no two points can coincide, which keeps RBF
/// systems well posed while still looking scattered.
pub fn jittered_points(
    cols: usize,
    rows: usize,
    bbox: &BoundingBox,
    jitter: f64,
    seed: u64,
) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dx = bbox.width() / cols.max(1) as f64;
    let dy = bbox.height() / rows.max(1) as f64;
    let mut out = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let jx = rng.gen_range(-jitter..=jitter) * dx;
            let jy = rng.gen_range(-jitter..=jitter) * dy;
            out.push(Point2::new(
                bbox.min_x + (col as f64 + 0.5) * dx + jx,
                bbox.min_y + (row as f64 + 0.5) * dy + jy,
            ));
        }
    }
    out
}

/// `a·x + b·y + c` at each point.
pub fn linear_field(points: &[Point2], a: f64, b: f64, c: f64) -> Vec<f64> {
    points.iter().map(|p| a * p.x + b * p.y + c).collect()
}

/// A Gaussian bump of height `amplitude` centred on `center`.
pub fn gaussian_bump(points: &[Point2], center: Point2, sigma: f64, amplitude: f64) -> Vec<f64> {
    let two_sigma_sq = 2.0 * sigma * sigma;
    points
        .iter()
        .map(|p| amplitude * (-p.distance_squared(&center) / two_sigma_sq).exp())
        .collect()
}

/// Smooth temperature-like field: a west-east gradient plus a ripple.
pub fn temperature_field(points: &[Point2]) -> Vec<f64> {
    points
        .iter()
        .map(|p| 15.0 + 0.1 * p.x + 2.0 * (p.y * 0.05).sin())
        .collect()
}
