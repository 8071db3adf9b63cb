//! Common types shared by the interpolation engine and the heatmap renderer.

pub mod bbox;
pub mod data;
pub mod error;
pub mod geometry;
pub mod shape;

pub use bbox::BoundingBox;
pub use data::{DataContainer, PointSet, SubscriptionId};
pub use error::{FieldError, FieldResult};
pub use geometry::{Point2, Polygon};
pub use shape::BoundaryShape;
