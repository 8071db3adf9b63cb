//! Tests for the synchronous heatmap renderer.
//!
//! Covers:
//! - Color range normalization and NaN transparency
//! - Insufficient data and boundary handling
//! - Fast and refined passes, frame placement
//! - Excluded indices and auto-fit boundaries
//! - Configuration setters

use field_common::{BoundaryShape, BoundingBox, DataContainer, FieldError, Point2, PointSet};
use renderer::{colorize, Colormap, HeatmapConfig, HeatmapRenderer, Quality, RenderPass};
use test_utils::{
    assert_approx_eq, random_points, temperature_field, three_points, triangle_boundary,
};

fn renderer() -> HeatmapRenderer {
    let config = HeatmapConfig {
        initial_grid_size: 60,
        ..Default::default()
    };
    HeatmapRenderer::new(config).unwrap()
}

fn square(size: f64) -> BoundaryShape {
    BoundaryShape::rect(BoundingBox::new(0.0, 0.0, size, size))
}

fn three_point_set() -> PointSet {
    let (points, values) = three_points();
    PointSet::new(points, values).unwrap()
}

// ============================================================================
// Color range
// ============================================================================

#[test]
fn test_explicit_color_range_mapping() {
    let mut r = renderer();
    r.set_color_range(2.0, 8.0).unwrap();
    assert_eq!(r.color_range(), Some((2.0, 8.0)));

    let lut = r.lut().clone();
    let px = colorize(&[0.0, 5.0, 10.0, f64::NAN], &lut, 2.0, 8.0);

    assert_eq!(&px[0..4], &lut.map(0.0).to_array());
    assert_eq!(&px[4..8], &lut.map(0.5).to_array());
    assert_eq!(&px[8..12], &lut.map(1.0).to_array());
    assert_eq!(px[15], 0, "NaN must be fully transparent");
}

#[test]
fn test_render_uses_configured_color_range() {
    let mut r = renderer();
    r.set_boundary(&square(100.0)).unwrap();
    r.set_color_range(2.0, 8.0).unwrap();

    let (points, _) = three_points();
    r.update_data(PointSet::new(points, vec![5.0; 3]).unwrap())
        .expect("constant field renders");

    let mid = r.lut().map(0.5).to_array();
    let image = r.image().unwrap();
    assert!(
        image.pixels.chunks(4).all(|px| px == mid),
        "every cell of a constant 5.0 field should map to the middle of 2..8"
    );
}

#[test]
fn test_equal_color_range_rejected() {
    let mut r = renderer();
    let err = r.set_color_range(5.0, 5.0).unwrap_err();
    assert!(matches!(err, FieldError::InvalidColorRange { .. }));
    assert!(r.set_color_range(8.0, 2.0).is_err());

    // Still following the data
    r.update_data(three_point_set());
    assert_eq!(r.color_range(), Some((0.0, 10.0)));
}

#[test]
fn test_auto_color_range_follows_working_values() {
    let mut r = renderer();
    r.set_color_range(-100.0, 100.0).unwrap();
    r.update_data(three_point_set());
    assert_eq!(r.color_range(), Some((-100.0, 100.0)));

    r.set_auto_color_range();
    r.add_excluded_index(2);
    assert_eq!(r.color_range(), Some((0.0, 5.0)));
}

// ============================================================================
// Rendering lifecycle
// ============================================================================

#[test]
fn test_one_point_then_three_points() {
    let mut container = DataContainer::new();
    container
        .set_data(vec![Point2::new(40.0, 80.0)], vec![10.0])
        .unwrap();

    let mut r = renderer();
    assert!(r.set_boundary(&square(100.0)).unwrap().is_none());
    assert!(r.update_data(container.snapshot()).is_none());
    assert!(r.image().is_none());

    container
        .add_points(
            vec![Point2::new(10.0, 10.0), Point2::new(90.0, 20.0)],
            vec![0.0, 5.0],
        )
        .unwrap();

    let event = r.update_data(container.snapshot()).expect("three points render");
    assert_eq!(event.pass, RenderPass::Fast);
    assert_eq!(event.grid_size, 20);
    assert!(event.duration_ms >= 0.0);

    // 20 cells over 100 units: one 5-unit cell of margin per side
    let image = r.image().unwrap();
    assert_eq!((image.width, image.height), (22, 22));
    assert_eq!(image.pixels.len(), 22 * 22 * 4);
    assert_approx_eq!(image.bounds.min_x, -5.0, 1e-9);
    assert_approx_eq!(image.bounds.min_y, -5.0, 1e-9);
    assert_approx_eq!(image.bounds.max_x, 105.0, 1e-9);
    assert_approx_eq!(image.bounds.max_y, 105.0, 1e-9);

    // Square domain covers every cell
    assert!(image.pixels.chunks(4).all(|px| px[3] == 255));
}

#[test]
fn test_refined_pass_uses_full_grid_size() {
    let mut r = renderer();
    r.set_boundary(&square(100.0)).unwrap();
    r.update_data(three_point_set()).unwrap();
    assert!(r.take_refinement_request());

    let expected = r.controller().full_grid_size();
    let event = r.refine().unwrap();
    assert_eq!(event.pass, RenderPass::Refined);
    assert_eq!(event.grid_size, expected);

    let image = r.image().unwrap();
    assert_eq!(image.pass, RenderPass::Refined);
    assert_eq!(image.width, expected + 2);

    // Refinement itself does not request another one
    assert!(!r.take_refinement_request());
}

#[test]
fn test_outside_domain_is_transparent() {
    let mut r = renderer();
    r.set_boundary_polygon(triangle_boundary(100.0));
    let points = vec![
        Point2::new(10.0, 10.0),
        Point2::new(60.0, 10.0),
        Point2::new(10.0, 60.0),
        Point2::new(30.0, 30.0),
    ];
    let values = temperature_field(&points);
    r.update_data(PointSet::new(points, values).unwrap()).unwrap();

    let image = r.image().unwrap();
    let corner = image.pixel(image.width - 1, image.height - 1).unwrap();
    assert_eq!(corner.a, 0);
    assert_eq!(image.pixel(2, 2).unwrap().a, 255);
}

#[test]
fn test_degenerate_boundary_clears_image() {
    let mut r = renderer();
    r.update_data(three_point_set()).unwrap();
    assert!(r.image().is_some());

    r.set_boundary_polygon(field_common::Polygon::new(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 1.0),
    ]));
    assert!(r.image().is_none());
}

#[test]
fn test_failed_fit_keeps_previous_frame() {
    let mut r = renderer();
    r.set_boundary(&square(100.0)).unwrap();
    r.update_data(three_point_set()).unwrap();
    let before = r.image().cloned().unwrap();

    // Duplicate positions make the system singular
    let data = PointSet::new(
        vec![
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(90.0, 20.0),
            Point2::new(40.0, 80.0),
        ],
        vec![0.0, 1.0, 5.0, 10.0],
    )
    .unwrap();
    assert!(r.update_data(data).is_none());
    assert_eq!(r.image(), Some(&before));
}

#[test]
fn test_value_only_update_hits_cache() {
    // Pin the resolution so both fast passes share a grid
    let config = HeatmapConfig {
        initial_grid_size: 60,
        min_grid_size: 60,
        max_grid_size: 60,
        ..Default::default()
    };
    let mut r = HeatmapRenderer::new(config).unwrap();
    r.set_boundary(&square(100.0)).unwrap();
    let (points, values) = three_points();
    r.update_data(PointSet::new(points.clone(), values).unwrap()).unwrap();
    let misses = r.cache_stats().misses;

    r.update_data(PointSet::new(points, vec![3.0, 2.0, 1.0]).unwrap()).unwrap();
    let stats = r.cache_stats();
    assert_eq!(stats.misses, misses);
    assert!(stats.hits >= 1);
}

// ============================================================================
// Excluded indices
// ============================================================================

#[test]
fn test_excluded_indices() {
    let mut r = renderer();
    let points = random_points(4, &BoundingBox::new(0.0, 0.0, 50.0, 50.0), 11);
    let values = temperature_field(&points);
    r.update_data(PointSet::new(points, values).unwrap()).unwrap();

    assert!(r.add_excluded_index(0).is_some());
    assert_eq!(r.working_data().0.len(), 3);

    // Two left: nothing to draw
    assert!(r.add_excluded_index(3).is_none());
    assert!(r.image().is_none());

    assert!(r.remove_excluded_index(3).is_some());
    assert!(r.image().is_some());

    r.set_excluded_indices([0, 1, 2]);
    assert!(r.image().is_none());

    assert!(r.clear_excluded_indices().is_some());
    assert!(r.excluded_indices().is_empty());
    // The container data itself is untouched
    assert_eq!(r.data().len(), 4);
}

#[test]
fn test_removing_unexcluded_index_is_silent() {
    let mut r = renderer();
    r.update_data(three_point_set()).unwrap();
    assert!(r.take_refinement_request());

    assert!(r.remove_excluded_index(1).is_none());
    assert!(!r.take_refinement_request());
    assert!(r.image().is_some(), "frame is kept");

    r.add_excluded_index(1);
    assert!(r.take_refinement_request());
    r.remove_excluded_index(1);
    assert!(r.take_refinement_request());
    assert!(r.excluded_indices().is_empty());
}

// ============================================================================
// Boundary selection
// ============================================================================

#[test]
fn test_auto_fit_and_explicit_boundary() {
    let mut r = renderer();
    assert!(r.auto_fit());
    r.update_data(three_point_set()).unwrap();

    // Data spans 10..90 x 10..80; 10% margin
    let fitted = r.effective_boundary().unwrap().bounding_box().unwrap();
    assert_approx_eq!(fitted.min_x, 2.0, 1e-9);
    assert_approx_eq!(fitted.max_x, 98.0, 1e-9);
    assert_approx_eq!(fitted.min_y, 3.0, 1e-9);
    assert_approx_eq!(fitted.max_y, 87.0, 1e-9);

    r.set_boundary(&square(200.0)).unwrap();
    assert!(!r.auto_fit());
    let explicit = r.effective_boundary().unwrap().bounding_box().unwrap();
    assert_eq!(explicit, BoundingBox::new(0.0, 0.0, 200.0, 200.0));

    r.set_auto_fit(true);
    assert_eq!(r.effective_boundary().unwrap().bounding_box(), Some(fitted));
}

#[test]
fn test_invalid_shape_rejected() {
    let mut r = renderer();
    let err = r
        .set_boundary(&BoundaryShape::circle(Point2::new(0.0, 0.0), -1.0))
        .unwrap_err();
    assert!(matches!(err, FieldError::InvalidShape(_)));
    assert!(r.auto_fit());
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_colormap_by_name() {
    let mut r = renderer();
    r.set_colormap("Plasma").unwrap();
    assert_eq!(r.config().colormap, Colormap::Plasma);
    assert_eq!(r.lut(), &Colormap::Plasma.lut());

    let err = r.set_colormap("rainbow").unwrap_err();
    assert!(matches!(err, FieldError::UnknownColormap(_)));
    assert_eq!(r.config().colormap, Colormap::Plasma);
}

#[test]
fn test_neighbors_and_epsilon_validation() {
    let mut r = renderer();
    assert!(r.set_neighbors(Some(0)).is_err());
    assert!(r.set_epsilon(0.0).is_err());
    assert!(r.set_epsilon(f64::NAN).is_err());

    r.update_data(three_point_set()).unwrap();
    let event = r.set_neighbors(None).unwrap();
    assert!(event.is_some());
    assert_eq!(r.config().neighbors, None);
}

#[test]
fn test_quality_and_target() {
    let mut r = renderer();
    r.set_quality(Quality::High);
    assert_eq!(r.controller().target_ms(), Some(100.0));

    r.set_target_render_time(35.0).unwrap();
    assert_eq!(r.config().quality, Quality::Adaptive);
    assert_eq!(r.controller().target_ms(), Some(35.0));

    assert!(r.set_target_render_time(0.0).is_err());
}

#[test]
fn test_invalid_config_rejected() {
    let config = HeatmapConfig {
        min_grid_size: 600,
        ..Default::default()
    };
    assert!(HeatmapRenderer::new(config).is_err());
}
