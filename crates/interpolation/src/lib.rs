//! Scattered-data interpolation onto regular grids.
//!
//! This crate turns scattered `(x, y, value)` samples into a smooth grid
//! bounded by a polygon:
//!
//! - **Boundary support**: ghost points along the polygon carry IDW values
//!   of their two nearest samples so the surface stays bounded at the edges
//! - **Operator reuse**: the RBF fit is reduced to a linear operator so
//!   value-only updates are a single matrix-vector product
//! - **Caching**: fitted operators are kept in an LRU cache keyed by
//!   geometry and settings
//!
//! # Architecture
//!
//! ```text
//! values ──► InterpolatorCache::get_interpolator(grid_size, points, boundary)
//!                 │
//!                 ├─► hit: Arc<FittedInterpolator>
//!                 │
//!                 └─► miss: GridSpec::covering ─► BoundaryPointGenerator::fit
//!                                              ─► FastRbfInterpolator::fit
//!                 │
//!                 ▼
//!        FittedInterpolator::evaluate(values)
//!                 │
//!                 ├─► BoundaryPointGenerator::transform(values)
//!                 └─► operator · [values, boundary values]
//!                 │
//!                 ▼
//!        row-major grid (NaN outside the boundary)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use interpolation::{InterpolatorCache, RbfSettings};
//!
//! let mut cache = InterpolatorCache::new(8, RbfSettings::default());
//! let fitted = cache.get_interpolator(100, &points, &boundary);
//! if let Some(grid) = fitted.evaluate(&values) {
//!     // ...
//! }
//! ```

pub mod boundary;
pub mod cache;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod neighbors;
pub mod rbf;

pub use boundary::BoundaryPointGenerator;
pub use cache::{CacheStats, FittedInterpolator, GeometryKey, InterpolatorCache};
pub use error::{InterpolationError, Result};
pub use grid::GridSpec;
pub use kernel::Kernel;
pub use neighbors::SpatialIndex;
pub use rbf::{FastRbfInterpolator, RbfInterpolator, RbfSettings};
