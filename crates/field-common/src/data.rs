//! Labeled point data and the container that owns it.
//!
//! [`PointSet`] is a plain value: three parallel arrays that always have
//! the same length. [`DataContainer`] owns one, bumps a version counter on
//! every logical mutation and notifies subscribers exactly once per change.

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};
use crate::geometry::Point2;

/// Parallel arrays of positions, scalar values and labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<Point2>,
    values: Vec<f64>,
    labels: Vec<String>,
}

impl PointSet {
    /// Build a point set with empty labels.
    pub fn new(points: Vec<Point2>, values: Vec<f64>) -> FieldResult<Self> {
        let labels = vec![String::new(); points.len()];
        Self::with_labels(points, values, labels)
    }

    pub fn with_labels(
        points: Vec<Point2>,
        values: Vec<f64>,
        labels: Vec<String>,
    ) -> FieldResult<Self> {
        if points.len() != values.len() || points.len() != labels.len() {
            return Err(FieldError::LengthMismatch {
                points: points.len(),
                values: values.len(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            points,
            values,
            labels,
        })
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Split into positions and values, skipping the given indices.
    pub fn subset_excluding(
        &self,
        excluded: &std::collections::HashSet<usize>,
    ) -> (Vec<Point2>, Vec<f64>) {
        if excluded.is_empty() {
            return (self.points.clone(), self.values.clone());
        }
        self.points
            .iter()
            .zip(&self.values)
            .enumerate()
            .filter(|(i, _)| !excluded.contains(i))
            .map(|(_, (p, v))| (*p, *v))
            .unzip()
    }
}

/// Handle returned by [`DataContainer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&PointSet, u64) + Send>;

/// Owner of the mutable point data.
///
/// Every successful mutation that changes something increments `version`
/// and calls each subscriber once with the new contents and version.
#[derive(Default)]
pub struct DataContainer {
    data: PointSet,
    version: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl std::fmt::Debug for DataContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContainer")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl DataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &PointSet {
        &self.data
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> PointSet {
        self.data.clone()
    }

    pub fn points(&self) -> &[Point2] {
        self.data.points()
    }

    pub fn values(&self) -> &[f64] {
        self.data.values()
    }

    pub fn labels(&self) -> &[String] {
        self.data.labels()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of logical mutations applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register a change callback. It receives the new data and version.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&PointSet, u64) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Replace all data; labels default to empty strings.
    pub fn set_data(&mut self, points: Vec<Point2>, values: Vec<f64>) -> FieldResult<()> {
        self.data = PointSet::new(points, values)?;
        self.notify();
        Ok(())
    }

    pub fn set_labeled_data(
        &mut self,
        points: Vec<Point2>,
        values: Vec<f64>,
        labels: Vec<String>,
    ) -> FieldResult<()> {
        self.data = PointSet::with_labels(points, values, labels)?;
        self.notify();
        Ok(())
    }

    /// Append points with empty labels. Appending nothing is a no-op.
    pub fn add_points(&mut self, points: Vec<Point2>, values: Vec<f64>) -> FieldResult<()> {
        let labels = vec![String::new(); points.len()];
        self.add_labeled_points(points, values, labels)
    }

    pub fn add_labeled_points(
        &mut self,
        points: Vec<Point2>,
        values: Vec<f64>,
        labels: Vec<String>,
    ) -> FieldResult<()> {
        let added = PointSet::with_labels(points, values, labels)?;
        if added.is_empty() {
            return Ok(());
        }
        self.data.points.extend(added.points);
        self.data.values.extend(added.values);
        self.data.labels.extend(added.labels);
        self.notify();
        Ok(())
    }

    /// Update the value, position and/or label of one point as one change.
    ///
    /// Passing `None` for all three leaves the data untouched and fires nothing.
    pub fn update_point(
        &mut self,
        index: usize,
        value: Option<f64>,
        point: Option<Point2>,
        label: Option<String>,
    ) -> FieldResult<()> {
        self.check_index(index)?;
        if value.is_none() && point.is_none() && label.is_none() {
            return Ok(());
        }
        if let Some(v) = value {
            self.data.values[index] = v;
        }
        if let Some(p) = point {
            self.data.points[index] = p;
        }
        if let Some(l) = label {
            self.data.labels[index] = l;
        }
        self.notify();
        Ok(())
    }

    /// Remove the points at `indices` (duplicates are ignored).
    ///
    /// All indices are validated before anything is removed.
    pub fn remove_points(&mut self, indices: &[usize]) -> FieldResult<()> {
        if indices.is_empty() {
            return Ok(());
        }
        for &index in indices {
            self.check_index(index)?;
        }

        let mut doomed = indices.to_vec();
        doomed.sort_unstable();
        doomed.dedup();
        for &index in doomed.iter().rev() {
            self.data.points.remove(index);
            self.data.values.remove(index);
            self.data.labels.remove(index);
        }
        self.notify();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data = PointSet::default();
        self.notify();
    }

    /// Index of the point nearest to `(x, y)`, optionally limited to
    /// `threshold` distance.
    pub fn closest_point(&self, x: f64, y: f64, threshold: Option<f64>) -> Option<usize> {
        let target = Point2::new(x, y);
        let (index, dist_sq) = self
            .data
            .points
            .iter()
            .map(|p| p.distance_squared(&target))
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        match threshold {
            Some(t) if dist_sq > t * t => None,
            _ => Some(index),
        }
    }

    fn check_index(&self, index: usize) -> FieldResult<()> {
        if index >= self.data.len() {
            return Err(FieldError::IndexOutOfRange {
                index,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    fn notify(&mut self) {
        self.version += 1;
        let version = self.version;
        for (_, observer) in self.observers.iter_mut() {
            observer(&self.data, version);
        }
    }
}
