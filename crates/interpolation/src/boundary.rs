//! Ghost points along the boundary polygon.
//!
//! Without support outside the data hull an RBF surface over- or
//! under-shoots towards the edges of the region. The generator places
//! points along the boundary at a spacing matched to the data density and
//! gives each one the inverse-distance-weighted value of its two nearest
//! data points. Only the geometry (positions, neighbour indices, weights)
//! is fitted; values are gathered on every [`BoundaryPointGenerator::transform`].

use field_common::{Point2, Polygon};

use crate::error::{InterpolationError, Result};
use crate::neighbors::{average_nearest_neighbor_distance, SpatialIndex};

/// Segment length as a multiple of the average nearest-neighbour distance.
pub const SEGMENT_LENGTH_FACTOR: f64 = 1.2;

/// Segment length used when the data gives no usable spacing.
pub const FALLBACK_SEGMENT_LENGTH: f64 = 10.0;

/// Below this distance a boundary point is treated as coincident with a data point.
pub const COINCIDENT_DISTANCE: f64 = 1e-9;

/// One boundary point's two IDW neighbours: (data index, weight).
pub type IdwPair = [(usize, f64); 2];

#[derive(Debug, Clone, Default)]
pub struct BoundaryPointGenerator {
    points: Vec<Point2>,
    weights: Vec<IdwPair>,
    source_count: usize,
    fitted: bool,
}

impl BoundaryPointGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit against `sources` with spacing derived from the data density.
    pub fn fit(&mut self, sources: &[Point2], boundary: &Polygon) {
        self.fit_with_segment_length(sources, boundary, None);
    }

    /// Fit with an explicit target segment length (or derive it when `None`).
    ///
    /// Fewer than two sources, or a boundary with fewer than three vertices,
    /// leaves the generator unfitted and producing empty outputs.
    pub fn fit_with_segment_length(
        &mut self,
        sources: &[Point2],
        boundary: &Polygon,
        segment_length: Option<f64>,
    ) {
        *self = Self::default();
        if sources.len() < 2 || boundary.is_degenerate() {
            return;
        }

        let segment_length = segment_length
            .filter(|len| *len > 0.0)
            .unwrap_or_else(|| target_segment_length(sources));
        let points = sample_perimeter(boundary, segment_length);
        if points.is_empty() {
            return;
        }

        let index = SpatialIndex::new(sources);
        let weights = points
            .iter()
            .map(|bp| idw_pair(&index.k_nearest(bp, 2)))
            .collect();

        self.points = points;
        self.weights = weights;
        self.source_count = sources.len();
        self.fitted = true;
    }

    /// Boundary values for `values` (aligned with the fitted sources).
    ///
    /// An unfitted generator returns an empty vector.
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Ok(Vec::new());
        }
        if values.len() != self.source_count {
            return Err(InterpolationError::DimensionMismatch {
                expected: self.source_count,
                actual: values.len(),
            });
        }
        Ok(self
            .weights
            .iter()
            .map(|pair| pair.iter().map(|&(i, w)| w * values[i]).sum())
            .collect())
    }

    /// Generated boundary points (empty when unfitted).
    pub fn boundary_points(&self) -> &[Point2] {
        &self.points
    }

    /// Precomputed (neighbour index, weight) pairs, one per boundary point.
    pub fn weights(&self) -> &[IdwPair] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }
}

/// 1.2 × the mean nearest-neighbour distance, or the fallback when that is
/// not positive.
pub fn target_segment_length(sources: &[Point2]) -> f64 {
    let len = average_nearest_neighbor_distance(sources) * SEGMENT_LENGTH_FACTOR;
    if len > 0.0 {
        len
    } else {
        FALLBACK_SEGMENT_LENGTH
    }
}

/// Evenly spaced points along every edge; each edge contributes
/// `max(1, ceil(len / segment_length))` points and omits its end vertex.
fn sample_perimeter(boundary: &Polygon, segment_length: f64) -> Vec<Point2> {
    let mut out = Vec::new();
    for (a, b) in boundary.edges() {
        let n = ((a.distance(&b) / segment_length).ceil() as usize).max(1);
        out.extend((0..n).map(|j| a.lerp(&b, j as f64 / n as f64)));
    }
    out
}

fn idw_pair(neighbors: &[(f64, usize)]) -> IdwPair {
    let (d1, i1) = neighbors[0];
    let (d2, i2) = neighbors[1];
    if d1 < COINCIDENT_DISTANCE {
        return [(i1, 1.0), (i2, 0.0)];
    }
    let (w1, w2) = (1.0 / d1, 1.0 / d2);
    let sum = w1 + w2;
    [(i1, w1 / sum), (i2, w2 / sum)]
}
