//! Quality presets and the render-time feedback controller.
//!
//! Evaluation cost grows with the square of the grid resolution, so the
//! controller scales the resolution by the square root of the ratio
//! between the target and the measured render time:
//!
//! ```text
//! ratio    = clamp(target / measured, 0.5, 2.0)
//! new      = clamp(adaptive * sqrt(ratio), min, max)
//! adaptive = 0.3 * new + 0.7 * adaptive
//! ```
//!
//! Every pass feeds the controller, fast or refined. With
//! [`QualityLimits::project_fast_passes`] set, `measured` is first scaled
//! to the adaptive resolution (`duration * (adaptive / rendered)^2`).

use field_common::FieldError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::trace;

/// Target used by [`Quality::Adaptive`] when none is configured.
pub const DEFAULT_TARGET_MS: f64 = 50.0;

const RATIO_MIN: f64 = 0.5;
const RATIO_MAX: f64 = 2.0;
const SMOOTHING: f64 = 0.3;

/// Named render-time presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
    /// Keep whatever target is configured.
    Adaptive,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::VeryLow,
        Quality::Low,
        Quality::Medium,
        Quality::High,
        Quality::VeryHigh,
        Quality::Adaptive,
    ];

    /// Fixed render-time target in milliseconds, `None` for `Adaptive`.
    pub fn preset_ms(&self) -> Option<f64> {
        match self {
            Quality::VeryLow => Some(10.0),
            Quality::Low => Some(20.0),
            Quality::Medium => Some(50.0),
            Quality::High => Some(100.0),
            Quality::VeryHigh => Some(200.0),
            Quality::Adaptive => None,
        }
    }

    /// Effective target given an explicitly configured one.
    pub fn target_ms(&self, configured: Option<f64>) -> f64 {
        self.preset_ms()
            .or(configured)
            .unwrap_or(DEFAULT_TARGET_MS)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::VeryLow => "very_low",
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::VeryHigh => "very_high",
            Quality::Adaptive => "adaptive",
        }
    }
}

impl FromStr for Quality {
    type Err = FieldError;

    /// Parse from string (case-insensitive; "Very High", "very-high" and
    /// "very_high" are equivalent).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| FieldError::UnknownQuality(s.to_string()))
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grid-size limits and fast-pass shaping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityLimits {
    pub min_grid_size: usize,
    pub max_grid_size: usize,
    pub fast_shrink_factor: usize,
    pub fast_min_grid_size: usize,
    /// Scale measured times to the adaptive resolution before comparing
    /// them with the target.
    pub project_fast_passes: bool,
}

impl Default for QualityLimits {
    fn default() -> Self {
        Self {
            min_grid_size: 30,
            max_grid_size: 500,
            fast_shrink_factor: 3,
            fast_min_grid_size: 10,
            project_fast_passes: false,
        }
    }
}

/// Damped proportional controller for the grid resolution.
#[derive(Debug, Clone)]
pub struct AdaptiveQualityController {
    adaptive: f64,
    target_ms: Option<f64>,
    limits: QualityLimits,
}

impl AdaptiveQualityController {
    pub fn new(initial_grid_size: usize, target_ms: Option<f64>, limits: QualityLimits) -> Self {
        let adaptive = (initial_grid_size as f64)
            .clamp(limits.min_grid_size as f64, limits.max_grid_size as f64);
        Self {
            adaptive,
            target_ms: target_ms.filter(|t| *t > 0.0),
            limits,
        }
    }

    /// Current (fractional) adaptive grid size.
    pub fn adaptive_size(&self) -> f64 {
        self.adaptive
    }

    pub fn target_ms(&self) -> Option<f64> {
        self.target_ms
    }

    /// Set the render-time target; `None` or a non-positive value freezes
    /// the resolution.
    pub fn set_target_ms(&mut self, target_ms: Option<f64>) {
        self.target_ms = target_ms.filter(|t| *t > 0.0);
    }

    pub fn limits(&self) -> &QualityLimits {
        &self.limits
    }

    /// Resolution for the refinement pass.
    pub fn full_grid_size(&self) -> usize {
        (self.adaptive.round() as usize).clamp(self.limits.min_grid_size, self.limits.max_grid_size)
    }

    /// Resolution for the immediate low-quality pass.
    pub fn fast_grid_size(&self) -> usize {
        let shrink = self.limits.fast_shrink_factor.max(1) as f64;
        ((self.adaptive / shrink).floor() as usize).max(self.limits.fast_min_grid_size)
    }

    /// Feed one measured render and return the updated adaptive size.
    pub fn record(&mut self, duration_ms: f64, rendered_grid_size: usize) -> f64 {
        let Some(target) = self.target_ms else {
            return self.adaptive;
        };
        if !(duration_ms > 0.0) || rendered_grid_size == 0 {
            return self.adaptive;
        }

        let measured = if self.limits.project_fast_passes {
            let scale = self.adaptive / rendered_grid_size as f64;
            duration_ms * scale * scale
        } else {
            duration_ms
        };
        let ratio = (target / measured).clamp(RATIO_MIN, RATIO_MAX);
        let new_size = (self.adaptive * ratio.sqrt())
            .clamp(self.limits.min_grid_size as f64, self.limits.max_grid_size as f64);
        let previous = self.adaptive;
        self.adaptive = SMOOTHING * new_size + (1.0 - SMOOTHING) * self.adaptive;

        trace!(
            duration_ms,
            rendered_grid_size,
            ratio,
            previous,
            adaptive = self.adaptive,
            "Adjusted adaptive grid size"
        );
        self.adaptive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_presets() {
        assert_eq!(Quality::Low.target_ms(Some(7.0)), 20.0);
        assert_eq!(Quality::Adaptive.target_ms(Some(7.0)), 7.0);
        assert_eq!(Quality::Adaptive.target_ms(None), DEFAULT_TARGET_MS);
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("Very High".parse::<Quality>().unwrap(), Quality::VeryHigh);
        assert_eq!("very-low".parse::<Quality>().unwrap(), Quality::VeryLow);
        assert_eq!("ADAPTIVE".parse::<Quality>().unwrap(), Quality::Adaptive);
        assert!(matches!("ultra".parse::<Quality>(), Err(FieldError::UnknownQuality(_))));
    }

    #[test]
    fn test_fast_grid_size() {
        let ctl = AdaptiveQualityController::new(300, Some(50.0), QualityLimits::default());
        assert_eq!(ctl.full_grid_size(), 300);
        assert_eq!(ctl.fast_grid_size(), 100);

        let small = AdaptiveQualityController::new(30, Some(50.0), QualityLimits::default());
        assert_eq!(small.fast_grid_size(), 10);
    }

    #[test]
    fn test_on_target_is_stable() {
        let mut ctl = AdaptiveQualityController::new(200, Some(50.0), QualityLimits::default());
        assert!((ctl.record(50.0, 200) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_slow_render_shrinks() {
        let mut ctl = AdaptiveQualityController::new(200, Some(50.0), QualityLimits::default());
        let after = ctl.record(200.0, 200);
        // ratio clamps to 0.5: new = 200 / sqrt(2)
        let expected = 0.3 * 200.0 / 2f64.sqrt() + 0.7 * 200.0;
        assert!((after - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fast_pass_uses_measured_time() {
        let mut ctl = AdaptiveQualityController::new(300, Some(90.0), QualityLimits::default());
        // ratio 9 clamps to 2: new = 300 * sqrt(2)
        let expected = 0.3 * 300.0 * 2f64.sqrt() + 0.7 * 300.0;
        assert!((ctl.record(10.0, 100) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_projected_fast_pass_is_on_target() {
        let limits = QualityLimits {
            project_fast_passes: true,
            ..QualityLimits::default()
        };
        let mut ctl = AdaptiveQualityController::new(300, Some(90.0), limits);
        // One ninth of the target at one third of the resolution
        assert!((ctl.record(10.0, 100) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_target_freezes() {
        let mut ctl = AdaptiveQualityController::new(120, None, QualityLimits::default());
        assert_eq!(ctl.record(1000.0, 120), 120.0);
        ctl.set_target_ms(Some(-5.0));
        assert_eq!(ctl.target_ms(), None);
    }
}
