//! Tests for the point data container and its change notifications.

use field_common::{DataContainer, FieldError, Point2};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn counting_container() -> (DataContainer, Arc<AtomicU64>) {
    let mut dc = DataContainer::new();
    let count = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&count);
    dc.subscribe(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (dc, count)
}

fn pts(coords: &[(f64, f64)]) -> Vec<Point2> {
    coords.iter().map(|&c| Point2::from(c)).collect()
}

// ============================================================================
// Mutation tests
// ============================================================================

#[test]
fn test_set_data_keeps_arrays_aligned() {
    let (mut dc, count) = counting_container();
    dc.set_data(pts(&[(0.0, 0.0), (1.0, 1.0)]), vec![1.0, 2.0])
        .unwrap();

    assert_eq!(dc.len(), 2);
    assert_eq!(dc.values(), &[1.0, 2.0]);
    assert_eq!(dc.labels().len(), 2);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(dc.version(), 1);
}

#[test]
fn test_set_data_length_mismatch_rejected() {
    let (mut dc, count) = counting_container();
    let err = dc
        .set_data(pts(&[(0.0, 0.0), (1.0, 1.0)]), vec![1.0])
        .unwrap_err();

    assert!(matches!(err, FieldError::LengthMismatch { points: 2, values: 1, .. }));
    assert!(dc.is_empty());
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_add_points_single_notification() {
    let (mut dc, count) = counting_container();
    dc.set_data(pts(&[(0.0, 0.0)]), vec![1.0]).unwrap();
    dc.add_labeled_points(
        pts(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]),
        vec![2.0, 3.0, 4.0],
        vec!["a".into(), "b".into(), "c".into()],
    )
    .unwrap();

    assert_eq!(dc.len(), 4);
    assert_eq!(dc.labels()[3], "c");
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_add_nothing_is_silent() {
    let (mut dc, count) = counting_container();
    dc.add_points(vec![], vec![]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_update_point() {
    let (mut dc, count) = counting_container();
    dc.set_data(pts(&[(0.0, 0.0), (1.0, 1.0)]), vec![1.0, 2.0])
        .unwrap();

    dc.update_point(1, Some(9.0), Some(Point2::new(5.0, 5.0)), None)
        .unwrap();
    assert_eq!(dc.values()[1], 9.0);
    assert_eq!(dc.points()[1], Point2::new(5.0, 5.0));
    assert_eq!(count.load(Ordering::SeqCst), 2);

    dc.update_point(0, None, None, None).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    let err = dc.update_point(7, Some(1.0), None, None).unwrap_err();
    assert!(matches!(err, FieldError::IndexOutOfRange { index: 7, len: 2 }));
}

#[test]
fn test_update_point_with_label_is_one_change() {
    let (mut dc, count) = counting_container();
    dc.set_data(pts(&[(0.0, 0.0), (1.0, 1.0)]), vec![1.0, 2.0])
        .unwrap();

    dc.update_point(0, Some(4.0), None, Some("north".into()))
        .unwrap();
    assert_eq!(dc.values()[0], 4.0);
    assert_eq!(dc.labels()[0], "north");
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(dc.version(), 2);

    // Label alone is still a change
    dc.update_point(1, None, None, Some("south".into())).unwrap();
    assert_eq!(dc.labels()[1], "south");
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_remove_points() {
    let (mut dc, count) = counting_container();
    dc.set_labeled_data(
        pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]),
        vec![0.0, 1.0, 2.0, 3.0],
        vec!["a".into(), "b".into(), "c".into(), "d".into()],
    )
    .unwrap();

    dc.remove_points(&[2, 0, 2]).unwrap();
    assert_eq!(dc.values(), &[1.0, 3.0]);
    assert_eq!(dc.labels(), &["b".to_string(), "d".to_string()]);
    assert_eq!(count.load(Ordering::SeqCst), 2);

    assert!(dc.remove_points(&[0, 5]).is_err());
    assert_eq!(dc.len(), 2);
}

#[test]
fn test_clear_notifies() {
    let (mut dc, count) = counting_container();
    dc.set_data(pts(&[(0.0, 0.0)]), vec![1.0]).unwrap();
    dc.clear();
    assert!(dc.is_empty());
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsubscribe() {
    let (mut dc, count) = counting_container();
    let extra = Arc::new(AtomicU64::new(0));
    let extra_counter = Arc::clone(&extra);
    let id = dc.subscribe(move |_, _| {
        extra_counter.fetch_add(1, Ordering::SeqCst);
    });

    dc.clear();
    assert!(dc.unsubscribe(id));
    assert!(!dc.unsubscribe(id));
    dc.clear();

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(extra.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observer_sees_new_version() {
    let mut dc = DataContainer::new();
    let seen = Arc::new(AtomicU64::new(0));
    let seen_version = Arc::clone(&seen);
    dc.subscribe(move |data, version| {
        assert_eq!(data.len(), 1);
        seen_version.store(version, Ordering::SeqCst);
    });
    dc.set_data(pts(&[(3.0, 4.0)]), vec![1.0]).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Query tests
// ============================================================================

#[test]
fn test_closest_point() {
    let mut dc = DataContainer::new();
    dc.set_data(pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]), vec![0.0; 3])
        .unwrap();

    assert_eq!(dc.closest_point(9.0, 1.0, None), Some(1));
    assert_eq!(dc.closest_point(9.0, 1.0, Some(0.5)), None);
    assert_eq!(dc.closest_point(0.0, 9.0, Some(2.0)), Some(2));
    assert_eq!(DataContainer::new().closest_point(0.0, 0.0, None), None);
}

#[test]
fn test_subset_excluding() {
    let mut dc = DataContainer::new();
    dc.set_data(pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]), vec![0.0, 1.0, 2.0])
        .unwrap();

    let excluded = [1usize].into_iter().collect();
    let (points, values) = dc.data().subset_excluding(&excluded);
    assert_eq!(points, pts(&[(0.0, 0.0), (2.0, 0.0)]));
    assert_eq!(values, vec![0.0, 2.0]);
}
