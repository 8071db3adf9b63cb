//! Error types for interpolation.

use thiserror::Error;

/// Errors that can occur while fitting or evaluating an interpolator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Not enough source points for the kernel's polynomial tail.
    #[error("need at least {required} source points, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    /// Duplicate or collinear points, or an otherwise singular system.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A value array does not match the fitted source count.
    #[error("expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Prediction was requested before a successful fit.
    #[error("interpolator has not been fitted")]
    NotFitted,
}

impl InterpolationError {
    /// Create a DegenerateGeometry error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }
}

/// Result type for interpolation operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;
