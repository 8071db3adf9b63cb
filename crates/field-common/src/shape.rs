//! Boundary shape inputs and their normalization to a closed polygon.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::bbox::BoundingBox;
use crate::error::{FieldError, FieldResult};
use crate::geometry::{Point2, Polygon};

/// Shape kinds accepted by [`BoundaryShape::from_json`].
pub const SHAPE_TYPES: &[&str] = &["polygon", "rect", "circle", "path"];

/// Default number of segments used to approximate a circle.
pub const DEFAULT_CIRCLE_SEGMENTS: usize = 64;

/// Any boundary representation a host may hand over.
///
/// Every variant is converted to a single closed [`Polygon`] before it
/// reaches the interpolation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryShape {
    /// Closed polygon given as its vertex ring.
    Polygon { vertices: Vec<Point2> },
    /// Axis-aligned rectangle.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Circle approximated by a regular polygon.
    Circle {
        center: Point2,
        radius: f64,
        #[serde(default = "default_segments")]
        segments: usize,
    },
    /// Filled path made of one or more rings; the ring with the largest
    /// enclosed area is used as the outline.
    Path { subpaths: Vec<Vec<Point2>> },
}

fn default_segments() -> usize {
    DEFAULT_CIRCLE_SEGMENTS
}

impl BoundaryShape {
    pub fn rect(bbox: BoundingBox) -> Self {
        BoundaryShape::Rect {
            x: bbox.min_x,
            y: bbox.min_y,
            width: bbox.width(),
            height: bbox.height(),
        }
    }

    pub fn circle(center: Point2, radius: f64) -> Self {
        BoundaryShape::Circle {
            center,
            radius,
            segments: DEFAULT_CIRCLE_SEGMENTS,
        }
    }

    pub fn polygon(vertices: impl Into<Vec<Point2>>) -> Self {
        BoundaryShape::Polygon {
            vertices: vertices.into(),
        }
    }

    /// Parse a shape from JSON of the form `{"type": "rect", ...}`.
    ///
    /// An unknown `type` is rejected with [`FieldError::InvalidShapeType`];
    /// a known type with malformed fields with [`FieldError::InvalidShape`].
    pub fn from_json(json: &str) -> FieldResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| FieldError::InvalidShapeType("<missing>".to_string()))?;

        if !SHAPE_TYPES.contains(&kind) {
            return Err(FieldError::InvalidShapeType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| FieldError::InvalidShape(e.to_string()))
    }

    /// Normalize to a closed polygon, validating the shape parameters.
    pub fn to_polygon(&self) -> FieldResult<Polygon> {
        let polygon = match self {
            BoundaryShape::Polygon { vertices } => Polygon::new(vertices.clone()),
            BoundaryShape::Rect {
                x,
                y,
                width,
                height,
            } => {
                if !(*width > 0.0 && *height > 0.0) {
                    return Err(FieldError::InvalidShape(format!(
                        "rectangle must have positive size, got {}x{}",
                        width, height
                    )));
                }
                Polygon::from(BoundingBox::from_origin_size(*x, *y, *width, *height))
            }
            BoundaryShape::Circle {
                center,
                radius,
                segments,
            } => {
                if !(*radius > 0.0) {
                    return Err(FieldError::InvalidShape(format!(
                        "circle radius must be positive, got {}",
                        radius
                    )));
                }
                if *segments < 3 {
                    return Err(FieldError::InvalidShape(format!(
                        "circle needs at least 3 segments, got {}",
                        segments
                    )));
                }
                let vertices = (0..*segments)
                    .map(|i| {
                        let theta = 2.0 * PI * i as f64 / *segments as f64;
                        Point2::new(
                            center.x + radius * theta.cos(),
                            center.y + radius * theta.sin(),
                        )
                    })
                    .collect();
                Polygon::new(vertices)
            }
            BoundaryShape::Path { subpaths } => subpaths
                .iter()
                .map(|ring| Polygon::new(ring.clone()))
                .filter(|ring| !ring.is_degenerate())
                .max_by(|a, b| ring_area(a).total_cmp(&ring_area(b)))
                .unwrap_or_default(),
        };

        if let Some(bad) = polygon.vertices().iter().find(|v| !v.is_finite()) {
            return Err(FieldError::InvalidShape(format!(
                "non-finite vertex ({}, {})",
                bad.x, bad.y
            )));
        }

        Ok(polygon)
    }
}

/// Absolute enclosed area (shoelace formula).
fn ring_area(poly: &Polygon) -> f64 {
    poly.edges()
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
        .abs()
        * 0.5
}
