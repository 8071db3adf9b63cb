//! Error types for heatmap configuration and data handling.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors surfaced to callers at the configuration and data boundaries.
///
/// Render-time conditions (too few points, degenerate geometry) are not
/// represented here: they suppress the frame instead of failing a call.
#[derive(Debug, Error)]
pub enum FieldError {
    // === Configuration Errors ===
    #[error("Invalid color range: min ({min}) must be strictly less than max ({max})")]
    InvalidColorRange { min: f64, max: f64 },

    #[error("Unrecognized boundary shape type: {0}")]
    InvalidShapeType(String),

    #[error("Invalid boundary shape: {0}")]
    InvalidShape(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unknown colormap: {0}")]
    UnknownColormap(String),

    #[error("Unknown quality level: {0}")]
    UnknownQuality(String),

    #[error("Unknown RBF kernel: {0}")]
    UnknownKernel(String),

    // === Data Errors ===
    #[error("Array lengths differ: {points} points, {values} values, {labels} labels")]
    LengthMismatch {
        points: usize,
        values: usize,
        labels: usize,
    },

    #[error("Point index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Malformed input: {0}")]
    Parse(String),
}

impl FieldError {
    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::Parse(format!("JSON error: {}", err))
    }
}
