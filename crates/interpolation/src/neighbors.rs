//! K-nearest-neighbour queries over a static point set.
//!
//! Points are bucketed into a uniform grid of roughly one point per cell.
//! A query scans rings of cells outward from the query's cell and stops
//! once no unvisited cell can hold anything closer than the current k-th
//! best candidate.

use field_common::{BoundingBox, Point2};

/// A neighbour hit: (distance, index into the indexed point slice).
pub type Neighbor = (f64, usize);

pub struct SpatialIndex<'a> {
    points: &'a [Point2],
    bounds: BoundingBox,
    cell_size: f64,
    cols: usize,
    rows: usize,
    /// Point indices sorted by cell; `cell_starts[c]..cell_starts[c + 1]`.
    cell_items: Vec<usize>,
    cell_starts: Vec<usize>,
}

impl<'a> SpatialIndex<'a> {
    pub fn new(points: &'a [Point2]) -> Self {
        let bounds = BoundingBox::from_points(points)
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0));

        let n = points.len().max(1) as f64;
        let extent = bounds.width().max(bounds.height());
        let area = bounds.width() * bounds.height();
        let cell_size = if area > 0.0 {
            // Cap the cell count at ~4n for very elongated layouts
            (area / n).sqrt().max(extent / (4.0 * n))
        } else if extent > 0.0 {
            extent / n
        } else {
            1.0
        };
        let cols = ((bounds.width() / cell_size).floor() as usize + 1).max(1);
        let rows = ((bounds.height() / cell_size).floor() as usize + 1).max(1);

        let mut index = Self {
            points,
            bounds,
            cell_size,
            cols,
            rows,
            cell_items: Vec::with_capacity(points.len()),
            cell_starts: vec![0; cols * rows + 1],
        };
        index.bucket();
        index
    }

    fn bucket(&mut self) {
        let cells: Vec<usize> = self
            .points
            .iter()
            .map(|p| {
                let (c, r) = self.cell_of(p);
                r * self.cols + c
            })
            .collect();

        for &cell in &cells {
            self.cell_starts[cell + 1] += 1;
        }
        for i in 1..self.cell_starts.len() {
            self.cell_starts[i] += self.cell_starts[i - 1];
        }

        let mut cursor = self.cell_starts.clone();
        self.cell_items = vec![0; self.points.len()];
        for (point_idx, &cell) in cells.iter().enumerate() {
            self.cell_items[cursor[cell]] = point_idx;
            cursor[cell] += 1;
        }
    }

    /// Cell containing `p`, clamped to the grid.
    fn cell_of(&self, p: &Point2) -> (usize, usize) {
        let c = ((p.x - self.bounds.min_x) / self.cell_size).floor();
        let r = ((p.y - self.bounds.min_y) / self.cell_size).floor();
        let clamp = |v: f64, max: usize| {
            if v.is_nan() || v < 0.0 {
                0
            } else {
                (v as usize).min(max - 1)
            }
        };
        (clamp(c, self.cols), clamp(r, self.rows))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `k` nearest points to `query`, sorted by ascending distance
    /// (ties broken by index). Returns fewer than `k` only if the index
    /// holds fewer points.
    pub fn k_nearest(&self, query: &Point2, k: usize) -> Vec<Neighbor> {
        let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
        if k == 0 || self.points.is_empty() {
            return best;
        }

        let (qc, qr) = self.cell_of(query);
        let max_ring = self.cols.max(self.rows);

        for ring in 0..=max_ring {
            self.visit_ring(qc, qr, ring, |idx| {
                let d = self.points[idx].distance(query);
                insert_candidate(&mut best, k, (d, idx));
            });

            if best.len() == k {
                let reach = self.block_clearance(query, qc, qr, ring);
                if reach >= best[k - 1].0 {
                    break;
                }
            }
        }

        best
    }

    /// Distance from `query` to the nearest other point, or `None` when
    /// fewer than two points are indexed.
    pub fn nearest_other(&self, index: usize) -> Option<f64> {
        let query = self.points.get(index)?;
        self.k_nearest(query, 2)
            .into_iter()
            .find(|&(_, i)| i != index)
            .map(|(d, _)| d)
    }

    fn visit_ring<F: FnMut(usize)>(&self, qc: usize, qr: usize, ring: usize, mut f: F) {
        let (qc, qr, ring) = (qc as isize, qr as isize, ring as isize);
        let mut visit_cell = |c: isize, r: isize| {
            if c < 0 || r < 0 || c >= self.cols as isize || r >= self.rows as isize {
                return;
            }
            let cell = r as usize * self.cols + c as usize;
            for &idx in &self.cell_items[self.cell_starts[cell]..self.cell_starts[cell + 1]] {
                f(idx);
            }
        };

        if ring == 0 {
            visit_cell(qc, qr);
            return;
        }
        for c in (qc - ring)..=(qc + ring) {
            visit_cell(c, qr - ring);
            visit_cell(c, qr + ring);
        }
        for r in (qr - ring + 1)..=(qr + ring - 1) {
            visit_cell(qc - ring, r);
            visit_cell(qc + ring, r);
        }
    }

    /// Lower bound on the distance from `query` to any cell outside the
    /// block of rings `0..=ring` around `(qc, qr)`.
    fn block_clearance(&self, query: &Point2, qc: usize, qr: usize, ring: usize) -> f64 {
        let min_x = self.bounds.min_x + (qc as f64 - ring as f64) * self.cell_size;
        let max_x = self.bounds.min_x + (qc + ring + 1) as f64 * self.cell_size;
        let min_y = self.bounds.min_y + (qr as f64 - ring as f64) * self.cell_size;
        let max_y = self.bounds.min_y + (qr + ring + 1) as f64 * self.cell_size;

        if query.x < min_x || query.x > max_x || query.y < min_y || query.y > max_y {
            return 0.0;
        }
        (query.x - min_x)
            .min(max_x - query.x)
            .min(query.y - min_y)
            .min(max_y - query.y)
    }
}

/// Keep `best` as the sorted `k` smallest candidates seen so far.
#[inline]
fn insert_candidate(best: &mut Vec<Neighbor>, k: usize, cand: Neighbor) {
    let cmp = |a: &Neighbor, b: &Neighbor| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
    if best.len() == k {
        match best.last() {
            Some(last) if cmp(&cand, last).is_lt() => {
                best.pop();
            }
            _ => return,
        }
    }
    let pos = best
        .binary_search_by(|probe| cmp(probe, &cand))
        .unwrap_or_else(|e| e);
    best.insert(pos, cand);
}

/// Mean distance from each point to its nearest other point.
///
/// Returns 0.0 for fewer than two points.
pub fn average_nearest_neighbor_distance(points: &[Point2]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let index = SpatialIndex::new(points);
    let total: f64 = (0..points.len())
        .filter_map(|i| index.nearest_other(i))
        .sum();
    total / points.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[Point2], q: &Point2, k: usize) -> Vec<usize> {
        let mut all: Vec<Neighbor> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.distance(q), i))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    fn scattered(n: usize) -> Vec<Point2> {
        // Deterministic pseudo-random layout (golden-ratio sequence)
        (0..n)
            .map(|i| {
                let t = i as f64;
                Point2::new((t * 0.618_033_988_7).fract() * 100.0, (t * 0.754_877_666_2).fract() * 60.0)
            })
            .collect()
    }

    #[test]
    fn test_matches_brute_force() {
        let points = scattered(200);
        let index = SpatialIndex::new(&points);
        let queries = [
            Point2::new(50.0, 30.0),
            Point2::new(-20.0, 70.0),
            Point2::new(99.0, 1.0),
            Point2::new(500.0, -500.0),
        ];
        for q in &queries {
            for k in [1, 2, 7, 30] {
                let got: Vec<usize> = index.k_nearest(q, k).into_iter().map(|(_, i)| i).collect();
                assert_eq!(got, brute_force(&points, q, k), "query {:?} k={}", q, k);
            }
        }
    }

    #[test]
    fn test_k_larger_than_set() {
        let points = scattered(5);
        let index = SpatialIndex::new(&points);
        assert_eq!(index.k_nearest(&Point2::new(0.0, 0.0), 10).len(), 5);
    }

    #[test]
    fn test_collinear_points() {
        let points: Vec<Point2> = (0..10).map(|i| Point2::new(i as f64, 0.0)).collect();
        let index = SpatialIndex::new(&points);
        let got: Vec<usize> = index
            .k_nearest(&Point2::new(4.2, 3.0), 3)
            .into_iter()
            .map(|(_, i)| i)
            .collect();
        assert_eq!(got, vec![4, 5, 3]);
    }

    #[test]
    fn test_average_nearest_neighbor_distance() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        // nearest: 1, 1, 2 -> mean 4/3
        let avg = average_nearest_neighbor_distance(&points);
        assert!((avg - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(average_nearest_neighbor_distance(&points[..1]), 0.0);
    }
}
