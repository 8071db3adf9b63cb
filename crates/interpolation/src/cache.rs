//! LRU cache of fitted interpolators keyed by geometry.
//!
//! Fitting an operator is expensive; applying it is cheap. Renders that
//! only change values (not point positions, boundary, grid size or kernel
//! settings) reuse the cached operator.

use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use field_common::{geometry::hash_points, BoundingBox, Point2, Polygon};

use crate::boundary::BoundaryPointGenerator;
use crate::grid::GridSpec;
use crate::rbf::{FastRbfInterpolator, RbfSettings};

/// Default number of cached interpolators.
pub const DEFAULT_CACHE_SIZE: usize = 8;

/// Everything that determines a fitted operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    pub grid_size: usize,
    pub points_hash: u64,
    pub boundary_hash: u64,
    pub settings_hash: u64,
}

impl GeometryKey {
    pub fn new(
        grid_size: usize,
        points: &[Point2],
        boundary: &Polygon,
        settings: &RbfSettings,
    ) -> Self {
        Self {
            grid_size,
            points_hash: hash_points(points),
            boundary_hash: boundary.content_hash(),
            settings_hash: settings.fingerprint(),
        }
    }
}

/// Grid, boundary generator and operator fitted to one geometry.
pub struct FittedInterpolator {
    grid: GridSpec,
    domain: Vec<bool>,
    /// Row-major grid cells covered by the operator's targets.
    target_cells: Vec<usize>,
    boundary: BoundaryPointGenerator,
    rbf: FastRbfInterpolator,
    source_count: usize,
}

impl FittedInterpolator {
    /// Fit a `grid_size` × `grid_size` grid (plus margin) over `boundary`.
    ///
    /// A failed operator fit is logged and leaves the result unfitted;
    /// [`evaluate`](Self::evaluate) then returns `None`.
    pub fn fit(
        grid_size: usize,
        points: &[Point2],
        boundary: &Polygon,
        settings: RbfSettings,
    ) -> Self {
        let region = boundary
            .bounding_box()
            .filter(BoundingBox::is_valid)
            .or_else(|| BoundingBox::from_points(points))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let grid = GridSpec::covering(&region, grid_size);
        let domain = if boundary.is_degenerate() {
            vec![true; grid.len()]
        } else {
            grid.domain(boundary)
        };

        let cells = grid.points();
        let target_cells: Vec<usize> = (0..grid.len()).filter(|&i| domain[i]).collect();
        let targets: Vec<Point2> = target_cells.iter().map(|&i| cells[i]).collect();

        let mut generator = BoundaryPointGenerator::new();
        generator.fit(points, boundary);
        let mut sources = points.to_vec();
        sources.extend_from_slice(generator.boundary_points());

        let mut rbf = FastRbfInterpolator::new(settings);
        if let Err(e) = rbf.fit(&sources, &targets) {
            warn!(
                error = %e,
                points = points.len(),
                boundary_points = generator.len(),
                grid_size,
                "Interpolator fit failed"
            );
        }

        Self {
            grid,
            domain,
            target_cells,
            boundary: generator,
            rbf,
            source_count: points.len(),
        }
    }

    /// Row-major grid values for `values` (aligned with the fitted points).
    ///
    /// Cells outside the domain are NaN. Returns `None` when the operator
    /// is unfitted or the value count does not match.
    pub fn evaluate(&self, values: &[f64]) -> Option<Vec<f64>> {
        if values.len() != self.source_count {
            return None;
        }
        let mut sources = values.to_vec();
        sources.extend(self.boundary.transform(values).ok()?);

        let predicted = self.rbf.predict(&sources)?;
        let mut out = vec![f64::NAN; self.grid.len()];
        for (&cell, v) in self.target_cells.iter().zip(predicted) {
            out[cell] = v;
        }
        Some(out)
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn domain(&self) -> &[bool] {
        &self.domain
    }

    pub fn boundary(&self) -> &BoundaryPointGenerator {
        &self.boundary
    }

    pub fn rbf(&self) -> &FastRbfInterpolator {
        &self.rbf
    }

    pub fn is_fitted(&self) -> bool {
        self.rbf.is_fitted()
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }
}

/// Statistics about the interpolator cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU cache of [`FittedInterpolator`]s.
pub struct InterpolatorCache {
    cache: LruCache<GeometryKey, Arc<FittedInterpolator>>,
    settings: RbfSettings,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl InterpolatorCache {
    /// Create a cache holding at most `max_size` interpolators (minimum 1).
    pub fn new(max_size: usize, settings: RbfSettings) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            settings,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn settings(&self) -> &RbfSettings {
        &self.settings
    }

    /// Settings for subsequent fits. Entries fitted with other settings
    /// stay cached under their own keys.
    pub fn set_settings(&mut self, settings: RbfSettings) {
        self.settings = settings;
    }

    /// Fitted interpolator for this geometry, fitting and caching on a miss.
    ///
    /// Identical arguments return the same `Arc` until the entry is evicted.
    pub fn get_interpolator(
        &mut self,
        grid_size: usize,
        points: &[Point2],
        boundary: &Polygon,
    ) -> Arc<FittedInterpolator> {
        let key = GeometryKey::new(grid_size, points, boundary, &self.settings);
        if let Some(hit) = self.cache.get(&key) {
            self.hits += 1;
            return Arc::clone(hit);
        }
        self.misses += 1;

        let started = Instant::now();
        let fitted = Arc::new(FittedInterpolator::fit(
            grid_size,
            points,
            boundary,
            self.settings,
        ));
        debug!(
            grid_size,
            points = points.len(),
            fitted = fitted.is_fitted(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Cache miss, fitted interpolator"
        );

        if let Some((evicted_key, _)) = self.cache.push(key, Arc::clone(&fitted)) {
            if evicted_key != key {
                self.evictions += 1;
            }
        }
        fitted
    }

    /// Check if a geometry is cached without updating LRU order.
    pub fn contains(&self, grid_size: usize, points: &[Point2], boundary: &Polygon) -> bool {
        self.cache
            .contains(&GeometryKey::new(grid_size, points, boundary, &self.settings))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.cache.len(),
            capacity: self.cache.cap().get(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = InterpolatorCache::new(0, RbfSettings::default());
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_key_tracks_every_vertex() {
        let points = [Point2::new(1.0, 1.0)];
        let settings = RbfSettings::default();
        let a = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ]);
        // Same first and last vertices, different middle
        let b = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ]);
        assert_ne!(
            GeometryKey::new(10, &points, &a, &settings),
            GeometryKey::new(10, &points, &b, &settings)
        );
    }
}
