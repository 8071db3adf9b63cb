//! Regular sample grid over a region.

use field_common::{BoundingBox, Point2, Polygon};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Cell-centred grid covering a bounding box plus one cell of margin per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Full extent including the margin cells.
    pub bounds: BoundingBox,
    pub cols: usize,
    pub rows: usize,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GridSpec {
    /// `resolution` cells across `region`, extended by one cell on each side.
    ///
    /// A zero extent on one axis borrows the cell size of the other.
    pub fn covering(region: &BoundingBox, resolution: usize) -> Self {
        let res = resolution.max(1) as f64;
        let (w, h) = (region.width(), region.height());
        let fallback = if w.max(h) > 0.0 { w.max(h) / res } else { 1.0 };
        let cell_width = if w > 0.0 { w / res } else { fallback };
        let cell_height = if h > 0.0 { h / res } else { fallback };

        Self {
            bounds: region.expanded(cell_width, cell_height),
            cols: resolution.max(1) + 2,
            rows: resolution.max(1) + 2,
            cell_width,
            cell_height,
        }
    }

    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Centre of cell `(col, row)`; row 0 lies at `min_y`.
    #[inline]
    pub fn cell_center(&self, col: usize, row: usize) -> Point2 {
        Point2::new(
            self.bounds.min_x + (col as f64 + 0.5) * self.cell_width,
            self.bounds.min_y + (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// All cell centres in row-major order.
    pub fn points(&self) -> Vec<Point2> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| (col, row)))
            .map(|(col, row)| self.cell_center(col, row))
            .collect()
    }

    /// Row-major mask of cells that belong to the rendered region: centre
    /// inside `boundary` or within one cell diagonal of its perimeter.
    pub fn domain(&self, boundary: &Polygon) -> Vec<bool> {
        let reach = self.cell_width.hypot(self.cell_height);
        self.points()
            .par_iter()
            .map(|p| boundary.contains(p) || boundary.distance_to_perimeter(p) <= reach)
            .collect()
    }
}
