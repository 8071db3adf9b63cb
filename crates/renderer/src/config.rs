//! Configuration for the heatmap renderer.

use field_common::{FieldError, FieldResult};
use interpolation::{Kernel, RbfSettings};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::colormap::Colormap;
use crate::quality::{Quality, QualityLimits};

/// Explicit value range for color normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    min: f64,
    max: f64,
}

impl ColorRange {
    /// Both bounds must be finite and `min < max`.
    pub fn new(min: f64, max: f64) -> FieldResult<Self> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(FieldError::InvalidColorRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Range spanned by the finite entries of `values`, or `None` if there
    /// are none. A constant array yields a zero-width range.
    pub fn of_values(values: &[f64]) -> Option<(f64, f64)> {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Configuration for the heatmap renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Colormap used for the lookup table.
    pub colormap: Colormap,

    /// Render-time preset.
    pub quality: Quality,

    /// Explicit render-time target in ms; used by `Quality::Adaptive`.
    pub target_render_time_ms: Option<f64>,

    /// Nearest sources per grid cell; `None` solves one global system.
    pub neighbors: Option<usize>,

    /// RBF kernel.
    pub kernel: Kernel,

    /// RBF shape parameter.
    pub epsilon: f64,

    /// Fixed color range, or `None` to follow the data.
    pub color_range: Option<ColorRange>,

    /// Adaptive grid size before any render has been measured.
    pub initial_grid_size: usize,

    pub min_grid_size: usize,
    pub max_grid_size: usize,

    /// The fast pass renders at `adaptive / fast_shrink_factor`.
    pub fast_shrink_factor: usize,

    pub fast_min_grid_size: usize,

    /// Scale fast-pass timings to the full resolution before they reach
    /// the quality controller.
    pub project_fast_passes: bool,

    /// Quiescence period before the refinement pass in ms.
    pub refine_delay_ms: u64,

    /// Maximum number of cached interpolators.
    pub cache_size: usize,

    /// Auto-fit boundary margin as a fraction of the data extent.
    pub auto_fit_margin: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            colormap: Colormap::Viridis,
            quality: Quality::Medium,
            target_render_time_ms: None,
            neighbors: Some(interpolation::rbf::DEFAULT_NEIGHBORS),
            kernel: Kernel::ThinPlateSpline,
            epsilon: 1.0,
            color_range: None,
            initial_grid_size: 300,
            min_grid_size: 30,
            max_grid_size: 500,
            fast_shrink_factor: 3,
            fast_min_grid_size: 10,
            project_fast_passes: false,
            refine_delay_ms: 300,
            cache_size: interpolation::cache::DEFAULT_CACHE_SIZE,
            auto_fit_margin: 0.1,
        }
    }
}

impl HeatmapConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HEATMAP_COLORMAP") {
            match val.parse() {
                Ok(colormap) => config.colormap = colormap,
                Err(e) => warn!(error = %e, "Ignoring HEATMAP_COLORMAP"),
            }
        }

        if let Ok(val) = std::env::var("HEATMAP_QUALITY") {
            match val.parse() {
                Ok(quality) => config.quality = quality,
                Err(e) => warn!(error = %e, "Ignoring HEATMAP_QUALITY"),
            }
        }

        if let Ok(val) = std::env::var("HEATMAP_TARGET_MS") {
            if let Ok(ms) = val.parse() {
                config.target_render_time_ms = Some(ms);
            }
        }

        if let Ok(val) = std::env::var("HEATMAP_NEIGHBORS") {
            config.neighbors = parse_neighbors(&val).unwrap_or(config.neighbors);
        }

        if let Ok(val) = std::env::var("HEATMAP_KERNEL") {
            match val.parse() {
                Ok(kernel) => config.kernel = kernel,
                Err(e) => warn!(error = %e, "Ignoring HEATMAP_KERNEL"),
            }
        }

        if let Ok(val) = std::env::var("HEATMAP_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                config.cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("HEATMAP_PROJECT_FAST_PASSES") {
            if let Ok(flag) = val.parse() {
                config.project_fast_passes = flag;
            }
        }

        if let Ok(val) = std::env::var("HEATMAP_REFINE_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                config.refine_delay_ms = ms;
            }
        }

        config
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> FieldResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> FieldResult<()> {
        if let Some(range) = &self.color_range {
            ColorRange::new(range.min, range.max)?;
        }

        if let Some(ms) = self.target_render_time_ms {
            if !(ms > 0.0) {
                return Err(FieldError::invalid_parameter(
                    "target_render_time_ms",
                    "must be > 0",
                ));
            }
        }

        if self.neighbors == Some(0) {
            return Err(FieldError::invalid_parameter("neighbors", "must be >= 1"));
        }

        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(FieldError::invalid_parameter("epsilon", "must be a positive number"));
        }

        if self.min_grid_size == 0 || self.min_grid_size > self.max_grid_size {
            return Err(FieldError::invalid_parameter(
                "min_grid_size",
                format!("must be in 1..={}", self.max_grid_size),
            ));
        }

        if self.fast_shrink_factor == 0 {
            return Err(FieldError::invalid_parameter("fast_shrink_factor", "must be > 0"));
        }

        if self.cache_size == 0 {
            return Err(FieldError::invalid_parameter("cache_size", "must be > 0"));
        }

        if !(self.auto_fit_margin >= 0.0) {
            return Err(FieldError::invalid_parameter("auto_fit_margin", "must be >= 0"));
        }

        Ok(())
    }

    /// Effective render-time target in ms.
    pub fn target_ms(&self) -> f64 {
        self.quality.target_ms(self.target_render_time_ms)
    }

    pub fn rbf_settings(&self) -> RbfSettings {
        RbfSettings {
            kernel: self.kernel,
            epsilon: self.epsilon,
            neighbors: self.neighbors,
            degree: None,
        }
    }

    pub fn quality_limits(&self) -> QualityLimits {
        QualityLimits {
            min_grid_size: self.min_grid_size,
            max_grid_size: self.max_grid_size,
            fast_shrink_factor: self.fast_shrink_factor,
            fast_min_grid_size: self.fast_min_grid_size,
            project_fast_passes: self.project_fast_passes,
        }
    }
}

/// `"global"`, `"none"` and `"0"` select the global solve.
pub fn parse_neighbors(s: &str) -> FieldResult<Option<usize>> {
    match s.trim().to_lowercase().as_str() {
        "" | "none" | "global" | "0" => Ok(None),
        other => other
            .parse()
            .map(Some)
            .map_err(|_| FieldError::invalid_parameter("neighbors", format!("not a count: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = HeatmapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_ms(), 50.0);
        assert_eq!(config.rbf_settings(), RbfSettings::default());
    }

    #[test]
    fn test_color_range_validation() {
        assert!(ColorRange::new(2.0, 8.0).is_ok());
        assert!(matches!(
            ColorRange::new(5.0, 5.0),
            Err(FieldError::InvalidColorRange { .. })
        ));
        assert!(ColorRange::new(9.0, 1.0).is_err());
        assert!(ColorRange::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_of_values_skips_nan() {
        assert_eq!(ColorRange::of_values(&[3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(ColorRange::of_values(&[f64::NAN]), None);
    }

    #[test]
    fn test_from_json_partial() {
        let config = HeatmapConfig::from_json(
            r#"{"colormap": "plasma", "quality": "high", "neighbors": null,
                "color_range": {"min": 0.0, "max": 40.0}}"#,
        )
        .unwrap();
        assert_eq!(config.colormap, Colormap::Plasma);
        assert_eq!(config.quality, Quality::High);
        assert_eq!(config.neighbors, None);
        assert_eq!(config.color_range.map(|r| r.max()), Some(40.0));
        assert_eq!(config.initial_grid_size, 300);
    }

    #[test]
    fn test_from_json_rejects_bad_range() {
        let err = HeatmapConfig::from_json(r#"{"color_range": {"min": 4.0, "max": 4.0}}"#)
            .unwrap_err();
        assert!(matches!(err, FieldError::InvalidColorRange { .. }));
    }

    #[test]
    fn test_parse_neighbors() {
        assert_eq!(parse_neighbors("global").unwrap(), None);
        assert_eq!(parse_neighbors("25").unwrap(), Some(25));
        assert!(parse_neighbors("many").is_err());
    }
}
