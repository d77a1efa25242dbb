use nalgebra::{Point3, Vector3};
use slicecsg::{
    Plane,
    csg::{PlaneTolerance, SimilarPlaneFinder},
};

#[test]
fn flip() {
    let mut plane = Plane::from_normal(Vector3::y(), 2.0);
    plane.flip();
    assert_eq!(plane.normal(), Vector3::new(0.0, -1.0, 0.0));
    assert_eq!(plane.offset(), -2.0);
}

#[test]
fn from_points_is_counter_clockwise() {
    let plane = Plane::from_points(
        &Point3::new(0.0, 0.0, 1.0),
        &Point3::new(1.0, 0.0, 1.0),
        &Point3::new(0.0, 1.0, 1.0),
    );
    assert_eq!(plane.normal(), Vector3::z());
    assert_eq!(plane.offset(), 1.0);

    let collinear = Plane::from_points(
        &Point3::origin(),
        &Point3::new(1.0, 1.0, 1.0),
        &Point3::new(2.0, 2.0, 2.0),
    );
    assert!(!collinear.is_finite());
}

#[test]
fn frame_round_trips_points_on_the_plane() {
    for normal in [
        Vector3::z(),
        -Vector3::z(),
        Vector3::x(),
        Vector3::new(1.0, -2.0, 0.5),
    ] {
        let plane = Plane::from_normal(normal, 0.75);
        let frame = plane.frame();
        let on_plane = plane.project_point(&Point3::new(0.3, -1.2, 2.0));
        let xy = frame.project(&on_plane);
        let back = frame.lift(xy.x, xy.y);
        assert!((back - on_plane).norm() < 1e-12);
        assert!(plane.signed_distance(&back).abs() < 1e-12);
        // the normal maps onto +Z
        let up = frame.to_xy.transform_vector(&plane.normal());
        assert!((up - Vector3::z()).norm() < 1e-12);
    }
}

#[test]
fn canonical_plane_is_stable() {
    let tolerance = PlaneTolerance::default();
    let mut finder = SimilarPlaneFinder::new();
    let planes: Vec<Plane> = (0..20)
        .map(|i| Plane::from_normal(Vector3::new(0.0, 1e-7 * i as f64, 1.0), 2.0 + 1e-7 * i as f64))
        .collect();
    for plane in &planes {
        finder.register(*plane);
    }
    let first: Vec<_> = planes.iter().map(|p| finder.find(p, &tolerance)).collect();
    assert!(first.iter().all(|id| id.is_some() && *id == first[0]));

    // repeated queries resolve the same way
    let again: Vec<_> = planes.iter().map(|p| finder.find(p, &tolerance)).collect();
    assert_eq!(first, again);
    assert_eq!(finder.representatives().len(), 1);
}

#[test]
fn canonical_plane_is_idempotent() {
    let tolerance = PlaneTolerance::default();
    let mut finder = SimilarPlaneFinder::new();
    let plane = Plane::from_normal(Vector3::new(0.3, 0.4, 0.866), -1.5);
    let id = finder.find_or_register(&plane, &tolerance).unwrap();
    let canonical = *finder.plane(id);
    assert_eq!(finder.find(&canonical, &tolerance), Some(id));
    assert_eq!(finder.lookup(&canonical, &tolerance), Some(id));
    assert!(finder.is_representative(id));
}

#[test]
fn distinct_planes_stay_apart() {
    let tolerance = PlaneTolerance::default();
    let mut finder = SimilarPlaneFinder::new();
    let a = finder.find_or_register(&Plane::from_normal(Vector3::x(), 0.0), &tolerance);
    let b = finder.find_or_register(&Plane::from_normal(Vector3::x(), 0.01), &tolerance);
    let c = finder.find_or_register(&Plane::from_normal(-Vector3::x(), 0.0), &tolerance);
    let d = finder.find_or_register(&Plane::from_normal(Vector3::y(), 0.0), &tolerance);
    let ids = [a, b, c, d];
    for i in 0..ids.len() {
        for j in i + 1..ids.len() {
            assert_ne!(ids[i], ids[j]);
        }
    }
}
