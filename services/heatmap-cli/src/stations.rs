//! Station input: JSON files or synthetic data.

use std::path::Path;

use anyhow::{Context, Result};
use field_common::{BoundaryShape, BoundingBox, Point2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// One measurement site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    pub x: f64,
    pub y: f64,
    pub value: f64,
    #[serde(default)]
    pub label: String,
}

/// Contents of a station file.
///
/// ```json
/// {
///   "stations": [{"x": 10, "y": 20, "value": 14.2, "label": "north"}],
///   "boundary": {"type": "rect", "x": 0, "y": 0, "width": 100, "height": 100}
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationFile {
    pub stations: Vec<Station>,
    #[serde(default)]
    pub boundary: Option<BoundaryShape>,
}

impl StationFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read station file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid station file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// `n` stations scattered over `area` with a temperature-like field.
    pub fn synthetic(n: usize, area: &BoundingBox, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stations = (0..n)
            .map(|i| {
                let x = rng.gen_range(area.min_x..=area.max_x);
                let y = rng.gen_range(area.min_y..=area.max_y);
                let u = (x - area.min_x) / area.width().max(f64::EPSILON);
                let v = (y - area.min_y) / area.height().max(f64::EPSILON);
                let value = 25.0 - 15.0 * v + 4.0 * (u * std::f64::consts::TAU).sin()
                    + rng.gen_range(-0.5..0.5);
                Station {
                    x,
                    y,
                    value,
                    label: format!("S{:03}", i + 1),
                }
            })
            .collect();

        Self {
            stations,
            boundary: None,
        }
    }

    /// Positions, values and labels as parallel arrays.
    pub fn columns(&self) -> (Vec<Point2>, Vec<f64>, Vec<String>) {
        let mut points = Vec::with_capacity(self.stations.len());
        let mut values = Vec::with_capacity(self.stations.len());
        let mut labels = Vec::with_capacity(self.stations.len());
        for s in &self.stations {
            points.push(Point2::new(s.x, s.y));
            values.push(s.value);
            labels.push(s.label.clone());
        }
        (points, values, labels)
    }
}

/// Parse `"min,max"`.
pub fn parse_range(s: &str) -> Result<(f64, f64)> {
    let (min, max) = s
        .split_once(',')
        .with_context(|| format!("Expected MIN,MAX, got '{}'", s))?;
    Ok((min.trim().parse()?, max.trim().parse()?))
}
