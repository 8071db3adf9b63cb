//! Radial basis function interpolation.
//!
//! Two interpolators share one linear system:
//!
//! - [`RbfInterpolator`] solves with the actual values and evaluates at
//!   arbitrary points.
//! - [`FastRbfInterpolator`] solves once with an identity right-hand side.
//!   For fixed source and target geometry the interpolant is linear in the
//!   values, so this yields the operator `L` with `result = L · values`.
//!   Value-only updates then cost a single matrix-vector product.
//!
//! With `neighbors = Some(k)` each target is interpolated from its `k`
//! nearest sources only. Targets sharing the same neighbour set share one
//! solve.
//!
//! ```text
//!   [ K   P ] [ w ]   [ v ]        K_ij = φ(ε |x_i - x_j|)
//!   [ Pᵀ  0 ] [ c ] = [ 0 ]        P_ik = k-th monomial of scaled x_i
//! ```

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Instant;
use tracing::debug;

use field_common::{BoundingBox, Point2};

use crate::error::{InterpolationError, Result};
use crate::kernel::{monomial_count, push_monomials, Kernel};
use crate::neighbors::SpatialIndex;

/// Default neighbourhood size for local interpolation.
pub const DEFAULT_NEIGHBORS: usize = 30;

/// Two sources closer than this (relative to the layout extent) are duplicates.
const DUPLICATE_TOLERANCE: f64 = 1e-12;

/// Smallest accepted ratio between the extreme singular values of the
/// polynomial block.
const POLY_CONDITION_LIMIT: f64 = 1e-10;

/// Kernel and locality settings for an RBF fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RbfSettings {
    pub kernel: Kernel,
    /// Shape parameter; distances are multiplied by it before the kernel.
    pub epsilon: f64,
    /// Nearest sources per target, or `None` for one global system.
    pub neighbors: Option<usize>,
    /// Polynomial degree; `None` uses the kernel's minimum.
    pub degree: Option<usize>,
}

impl Default for RbfSettings {
    fn default() -> Self {
        Self {
            kernel: Kernel::ThinPlateSpline,
            epsilon: 1.0,
            neighbors: Some(DEFAULT_NEIGHBORS),
            degree: None,
        }
    }
}

impl RbfSettings {
    pub fn degree(&self) -> usize {
        self.degree.unwrap_or_else(|| self.kernel.default_degree())
    }

    /// Neighbourhood size for `n` sources, or `None` when the global
    /// system applies (no limit, or the limit covers every source).
    pub fn local_size(&self, n: usize) -> Option<usize> {
        match self.neighbors {
            Some(k) if k < n => Some(k.max(1)),
            _ => None,
        }
    }

    /// Stable hash of every setting, used in cache keys.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.kernel.hash(&mut hasher);
        self.epsilon.to_bits().hash(&mut hasher);
        self.neighbors.hash(&mut hasher);
        self.degree.hash(&mut hasher);
        hasher.finish()
    }
}

// ============================================================================
// Linear system
// ============================================================================

struct RbfSystem {
    centers: Vec<Point2>,
    shift: Point2,
    scale: Point2,
    kernel: Kernel,
    epsilon: f64,
    degree: usize,
}

impl RbfSystem {
    fn new(centers: Vec<Point2>, settings: &RbfSettings) -> Result<Self> {
        let degree = settings.degree();
        let required = monomial_count(degree);
        if centers.len() < required {
            return Err(InterpolationError::InsufficientPoints {
                required,
                actual: centers.len(),
            });
        }

        let bounds = BoundingBox::from_points(&centers).ok_or(
            InterpolationError::InsufficientPoints {
                required,
                actual: 0,
            },
        )?;
        let half = |extent: f64| if extent > 0.0 { extent * 0.5 } else { 1.0 };
        let system = Self {
            shift: bounds.center(),
            scale: Point2::new(half(bounds.width()), half(bounds.height())),
            centers,
            kernel: settings.kernel,
            epsilon: settings.epsilon,
            degree,
        };

        system.check_duplicates(&bounds)?;
        system.check_polynomial_rank()?;
        Ok(system)
    }

    fn n(&self) -> usize {
        self.centers.len()
    }

    fn m(&self) -> usize {
        monomial_count(self.degree)
    }

    fn scaled(&self, p: &Point2) -> Point2 {
        Point2::new(
            (p.x - self.shift.x) / self.scale.x,
            (p.y - self.shift.y) / self.scale.y,
        )
    }

    fn check_duplicates(&self, bounds: &BoundingBox) -> Result<()> {
        let tol = DUPLICATE_TOLERANCE * bounds.width().max(bounds.height()).max(1.0);
        let tol_sq = tol * tol;
        for (i, a) in self.centers.iter().enumerate() {
            if let Some(j) = self.centers[i + 1..]
                .iter()
                .position(|b| a.distance_squared(b) <= tol_sq)
            {
                return Err(InterpolationError::degenerate(format!(
                    "duplicate source points at ({}, {}) (indices {} and {})",
                    a.x,
                    a.y,
                    i,
                    i + 1 + j
                )));
            }
        }
        Ok(())
    }

    fn check_polynomial_rank(&self) -> Result<()> {
        if self.degree == 0 {
            return Ok(());
        }
        let m = self.m();
        let mut row = Vec::with_capacity(m);
        let mut poly = DMatrix::<f64>::zeros(self.n(), m);
        for (i, c) in self.centers.iter().enumerate() {
            row.clear();
            push_monomials(self.degree, self.scaled(c), &mut row);
            for (k, v) in row.iter().enumerate() {
                poly[(i, k)] = *v;
            }
        }

        let sv = poly.singular_values();
        let max = sv.max();
        let min = sv.min();
        if !(max > 0.0) || min / max < POLY_CONDITION_LIMIT {
            return Err(InterpolationError::degenerate(
                "source points do not determine the polynomial tail (collinear?)",
            ));
        }
        Ok(())
    }

    /// Kernel values against every center followed by the monomials of `q`.
    fn basis(&self, q: &Point2) -> DVector<f64> {
        let mut out = Vec::with_capacity(self.n() + self.m());
        out.extend(
            self.centers
                .iter()
                .map(|c| self.kernel.evaluate(self.epsilon * q.distance(c))),
        );
        push_monomials(self.degree, self.scaled(q), &mut out);
        DVector::from_vec(out)
    }

    fn lhs(&self) -> DMatrix<f64> {
        let (n, m) = (self.n(), self.m());
        let mut a = DMatrix::<f64>::zeros(n + m, n + m);
        let mut mono = Vec::with_capacity(m);
        for i in 0..n {
            let ci = self.centers[i];
            for j in i..n {
                let v = self.kernel.evaluate(self.epsilon * ci.distance(&self.centers[j]));
                a[(i, j)] = v;
                a[(j, i)] = v;
            }
            mono.clear();
            push_monomials(self.degree, self.scaled(&ci), &mut mono);
            for (k, v) in mono.iter().enumerate() {
                a[(i, n + k)] = *v;
                a[(n + k, i)] = *v;
            }
        }
        a
    }

    fn solve(&self, rhs: DMatrix<f64>) -> Result<DMatrix<f64>> {
        let solution = self
            .lhs()
            .lu()
            .solve(&rhs)
            .ok_or_else(|| InterpolationError::degenerate("singular RBF system"))?;
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(InterpolationError::degenerate(
                "RBF system produced non-finite coefficients",
            ));
        }
        Ok(solution)
    }

    /// Coefficients for unit impulses at each center: `(n + m) × n`.
    fn solve_identity(&self) -> Result<DMatrix<f64>> {
        let n = self.n();
        let mut rhs = DMatrix::<f64>::zeros(n + self.m(), n);
        for i in 0..n {
            rhs[(i, i)] = 1.0;
        }
        self.solve(rhs)
    }

    /// Coefficients for a concrete value vector: length `n + m`.
    fn solve_values(&self, values: &[f64]) -> Result<DVector<f64>> {
        let mut rhs = DMatrix::<f64>::zeros(self.n() + self.m(), 1);
        for (i, v) in values.iter().enumerate() {
            rhs[(i, 0)] = *v;
        }
        let sol = self.solve(rhs)?;
        Ok(sol.column(0).into_owned())
    }
}

/// Group targets by their (sorted) `k` nearest sources.
///
/// Returns `(neighbour indices, target indices)` pairs in order of first
/// appearance.
fn group_by_neighborhood(
    index: &SpatialIndex<'_>,
    targets: &[Point2],
    k: usize,
) -> Vec<(Vec<usize>, Vec<usize>)> {
    let neighborhoods: Vec<Vec<usize>> = targets
        .par_iter()
        .map(|t| {
            let mut idx: Vec<usize> = index.k_nearest(t, k).into_iter().map(|(_, i)| i).collect();
            idx.sort_unstable();
            idx
        })
        .collect();

    let mut slots: HashMap<Vec<usize>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
    for (target, hood) in neighborhoods.into_iter().enumerate() {
        match slots.get(&hood) {
            Some(&slot) => groups[slot].1.push(target),
            None => {
                slots.insert(hood.clone(), groups.len());
                groups.push((hood, vec![target]));
            }
        }
    }
    groups
}

fn check_values(expected: usize, values: &[f64]) -> Result<()> {
    if values.len() != expected {
        return Err(InterpolationError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Direct interpolator
// ============================================================================

enum DirectMode {
    Global {
        system: RbfSystem,
        coeffs: DVector<f64>,
    },
    Local {
        k: usize,
    },
}

/// Conventional RBF interpolator fitted to concrete values.
pub struct RbfInterpolator {
    sources: Vec<Point2>,
    values: Vec<f64>,
    settings: RbfSettings,
    mode: DirectMode,
}

impl RbfInterpolator {
    pub fn fit(sources: &[Point2], values: &[f64], settings: RbfSettings) -> Result<Self> {
        check_values(sources.len(), values)?;

        let mode = match settings.local_size(sources.len()) {
            Some(k) => {
                let required = monomial_count(settings.degree());
                if k < required {
                    return Err(InterpolationError::InsufficientPoints {
                        required,
                        actual: k,
                    });
                }
                DirectMode::Local { k }
            }
            None => {
                let system = RbfSystem::new(sources.to_vec(), &settings)?;
                let coeffs = system.solve_values(values)?;
                DirectMode::Global { system, coeffs }
            }
        };

        Ok(Self {
            sources: sources.to_vec(),
            values: values.to_vec(),
            settings,
            mode,
        })
    }

    pub fn settings(&self) -> &RbfSettings {
        &self.settings
    }

    /// Interpolated values at `queries`.
    pub fn evaluate(&self, queries: &[Point2]) -> Result<Vec<f64>> {
        match &self.mode {
            DirectMode::Global { system, coeffs } => Ok(queries
                .par_iter()
                .map(|q| system.basis(q).dot(coeffs))
                .collect()),
            DirectMode::Local { k } => {
                let index = SpatialIndex::new(&self.sources);
                let groups = group_by_neighborhood(&index, queries, *k);
                let solved: Vec<Vec<(usize, f64)>> = groups
                    .par_iter()
                    .map(|(hood, members)| {
                        let centers = hood.iter().map(|&i| self.sources[i]).collect();
                        let local_values: Vec<f64> = hood.iter().map(|&i| self.values[i]).collect();
                        let system = RbfSystem::new(centers, &self.settings)?;
                        let coeffs = system.solve_values(&local_values)?;
                        Ok(members
                            .iter()
                            .map(|&t| (t, system.basis(&queries[t]).dot(&coeffs)))
                            .collect())
                    })
                    .collect::<Result<_>>()?;

                let mut out = vec![f64::NAN; queries.len()];
                for (t, v) in solved.into_iter().flatten() {
                    out[t] = v;
                }
                Ok(out)
            }
        }
    }
}

// ============================================================================
// Operator-matrix interpolator
// ============================================================================

enum Operator {
    /// `targets × sources`, row-major semantics.
    Dense(DMatrix<f64>),
    /// `k` (source index, weight) entries per target row.
    Local {
        k: usize,
        indices: Vec<usize>,
        weights: Vec<f64>,
    },
}

/// RBF interpolator with a precomputed linear operator.
///
/// A failed fit leaves the interpolator unfitted; [`predict`](Self::predict)
/// then returns `None`.
pub struct FastRbfInterpolator {
    settings: RbfSettings,
    operator: Option<Operator>,
    source_count: usize,
    target_count: usize,
}

impl FastRbfInterpolator {
    pub fn new(settings: RbfSettings) -> Self {
        Self {
            settings,
            operator: None,
            source_count: 0,
            target_count: 0,
        }
    }

    pub fn settings(&self) -> &RbfSettings {
        &self.settings
    }

    pub fn is_fitted(&self) -> bool {
        self.operator.is_some()
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Operator shape `(targets, sources)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.target_count, self.source_count)
    }

    /// Compute the operator mapping values at `sources` to values at `targets`.
    pub fn fit(&mut self, sources: &[Point2], targets: &[Point2]) -> Result<()> {
        self.operator = None;
        self.source_count = 0;
        self.target_count = 0;

        if sources.is_empty() {
            return Err(InterpolationError::InsufficientPoints {
                required: monomial_count(self.settings.degree()).max(1),
                actual: 0,
            });
        }

        let started = Instant::now();
        let operator = match self.settings.local_size(sources.len()) {
            Some(k) => self.fit_local(sources, targets, k)?,
            None => self.fit_global(sources, targets)?,
        };

        debug!(
            sources = sources.len(),
            targets = targets.len(),
            neighbors = ?self.settings.local_size(sources.len()),
            kernel = %self.settings.kernel,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Fitted RBF operator"
        );

        self.operator = Some(operator);
        self.source_count = sources.len();
        self.target_count = targets.len();
        Ok(())
    }

    fn fit_global(&self, sources: &[Point2], targets: &[Point2]) -> Result<Operator> {
        let n = sources.len();
        let system = RbfSystem::new(sources.to_vec(), &self.settings)?;
        let impulse = system.solve_identity()?;

        let mut rows = vec![0.0; targets.len() * n];
        rows.par_chunks_mut(n.max(1))
            .zip(targets.par_iter())
            .for_each(|(row, t)| {
                let weights = impulse.tr_mul(&system.basis(t));
                row.copy_from_slice(weights.as_slice());
            });

        Ok(Operator::Dense(DMatrix::from_row_slice(targets.len(), n, &rows)))
    }

    fn fit_local(&self, sources: &[Point2], targets: &[Point2], k: usize) -> Result<Operator> {
        let index = SpatialIndex::new(sources);
        let groups = group_by_neighborhood(&index, targets, k);

        let solved: Vec<Vec<(usize, DVector<f64>)>> = groups
            .par_iter()
            .map(|(hood, members)| {
                let centers = hood.iter().map(|&i| sources[i]).collect();
                let system = RbfSystem::new(centers, &self.settings)?;
                let impulse = system.solve_identity()?;
                Ok(members
                    .iter()
                    .map(|&t| (t, impulse.tr_mul(&system.basis(&targets[t]))))
                    .collect())
            })
            .collect::<Result<_>>()?;

        debug!(
            targets = targets.len(),
            neighborhoods = groups.len(),
            k,
            "Solved local RBF neighborhoods"
        );

        let mut indices = vec![0usize; targets.len() * k];
        let mut weights = vec![0.0; targets.len() * k];
        for ((hood, _), rows) in groups.iter().zip(solved) {
            for (t, row) in rows {
                indices[t * k..(t + 1) * k].copy_from_slice(hood);
                weights[t * k..(t + 1) * k].copy_from_slice(row.as_slice());
            }
        }

        Ok(Operator::Local {
            k,
            indices,
            weights,
        })
    }

    /// `L · values`, or `None` when unfitted or `values` has the wrong length.
    pub fn predict(&self, values: &[f64]) -> Option<Vec<f64>> {
        self.try_predict(values).ok()
    }

    pub fn try_predict(&self, values: &[f64]) -> Result<Vec<f64>> {
        let operator = self.operator.as_ref().ok_or(InterpolationError::NotFitted)?;
        check_values(self.source_count, values)?;

        Ok(match operator {
            Operator::Dense(matrix) => {
                let v = DVector::from_column_slice(values);
                (matrix * v).iter().copied().collect()
            }
            Operator::Local {
                k,
                indices,
                weights,
            } => indices
                .par_chunks(*k)
                .zip(weights.par_chunks(*k))
                .map(|(idx, w)| idx.iter().zip(w).map(|(&i, &w)| w * values[i]).sum())
                .collect(),
        })
    }

    /// One operator row expanded to dense form (length = source count).
    pub fn operator_row(&self, target: usize) -> Option<Vec<f64>> {
        if target >= self.target_count {
            return None;
        }
        match self.operator.as_ref()? {
            Operator::Dense(matrix) => Some(matrix.row(target).iter().copied().collect()),
            Operator::Local {
                k,
                indices,
                weights,
            } => {
                let mut row = vec![0.0; self.source_count];
                for j in target * k..(target + 1) * k {
                    row[indices[j]] += weights[j];
                }
                Some(row)
            }
        }
    }
}
