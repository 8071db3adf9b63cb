//! Tests for the adaptive quality controller.

use renderer::{AdaptiveQualityController, Quality, QualityLimits};
use test_utils::assert_approx_eq;

// ============================================================================
// Stability
// ============================================================================

#[test]
fn test_alternating_durations_stay_bounded() {
    let limits = QualityLimits::default();
    let mut ctl = AdaptiveQualityController::new(300, Some(50.0), limits);
    let mut previous = ctl.adaptive_size();

    for step in 0..200 {
        let duration = if step % 2 == 0 { 5_000.0 } else { 0.01 };
        let next = ctl.record(duration, ctl.full_grid_size());

        assert!(
            (30.0..=500.0).contains(&next),
            "step {}: size {} out of limits",
            step,
            next
        );
        assert!(
            next <= previous * 2.0 && next >= previous / 2.0,
            "step {}: jumped from {} to {}",
            step,
            previous,
            next
        );
        assert!((30..=500).contains(&ctl.full_grid_size()));
        previous = next;
    }
}

#[test]
fn test_sustained_overload_reaches_minimum() {
    let mut ctl = AdaptiveQualityController::new(300, Some(10.0), QualityLimits::default());
    for _ in 0..100 {
        ctl.record(10_000.0, ctl.full_grid_size());
    }
    assert_eq!(ctl.full_grid_size(), 30);
    assert_eq!(ctl.fast_grid_size(), 10);
}

#[test]
fn test_sustained_headroom_reaches_maximum() {
    let mut ctl = AdaptiveQualityController::new(100, Some(200.0), QualityLimits::default());
    for _ in 0..100 {
        ctl.record(0.5, ctl.full_grid_size());
    }
    assert_eq!(ctl.full_grid_size(), 500);
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_converges_on_quadratic_cost() {
    // Cost grows with the square of the resolution; 200 cells hit 50 ms
    let cost = |size: usize| 50.0 * (size as f64 / 200.0).powi(2);
    let mut ctl = AdaptiveQualityController::new(450, Some(50.0), QualityLimits::default());

    for _ in 0..80 {
        let size = ctl.full_grid_size();
        ctl.record(cost(size), size);
    }
    assert_approx_eq!(ctl.adaptive_size(), 200.0, 1.0);
}

#[test]
fn test_fast_passes_push_resolution_up() {
    // Each fast pass at a third of the resolution costs a ninth of the time
    let cost = |size: usize| 50.0 * (size as f64 / 200.0).powi(2);
    let mut ctl = AdaptiveQualityController::new(200, Some(50.0), QualityLimits::default());

    let fast = ctl.fast_grid_size();
    let after = ctl.record(cost(fast), fast);
    assert_approx_eq!(after, 0.3 * 200.0 * 2f64.sqrt() + 0.7 * 200.0, 1e-9);

    let full = ctl.full_grid_size();
    assert!(full > 200, "fast pass should raise the full size, got {}", full);
}

#[test]
fn test_projected_fast_passes_do_not_bias_convergence() {
    let cost = |size: usize| 50.0 * (size as f64 / 200.0).powi(2);
    let limits = QualityLimits {
        project_fast_passes: true,
        ..QualityLimits::default()
    };
    let mut ctl = AdaptiveQualityController::new(120, Some(50.0), limits);

    for _ in 0..80 {
        let fast = ctl.fast_grid_size();
        ctl.record(cost(fast), fast);
        let full = ctl.full_grid_size();
        ctl.record(cost(full), full);
    }
    assert_approx_eq!(ctl.adaptive_size(), 200.0, 2.0);
}

// ============================================================================
// Presets
// ============================================================================

#[test]
fn test_preset_targets() {
    let expected = [
        (Quality::VeryLow, 10.0),
        (Quality::Low, 20.0),
        (Quality::Medium, 50.0),
        (Quality::High, 100.0),
        (Quality::VeryHigh, 200.0),
    ];
    for (quality, ms) in expected {
        assert_eq!(quality.target_ms(None), ms, "{}", quality);
        assert_eq!(quality.as_str().parse::<Quality>().unwrap(), quality);
    }
    assert_eq!(Quality::Adaptive.target_ms(Some(75.0)), 75.0);
}

#[test]
fn test_custom_limits() {
    let limits = QualityLimits {
        min_grid_size: 50,
        max_grid_size: 80,
        fast_shrink_factor: 4,
        fast_min_grid_size: 5,
        project_fast_passes: false,
    };
    let ctl = AdaptiveQualityController::new(1_000, Some(50.0), limits);
    assert_eq!(ctl.full_grid_size(), 80);
    assert_eq!(ctl.fast_grid_size(), 20);
}
