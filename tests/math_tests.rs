use phys_hands::math::{self, Aabb, Isometry, Quaternion, Transform, Vector3};
use std::f32::consts::PI;
use approx::assert_relative_eq;

#[test]
fn test_transform_point_applies_scale_then_rotation() {
    let transform = Transform::new(
        Vector3::new(1.0, 0.0, 0.0),
        Quaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0),
        Vector3::new(2.0, 1.0, 1.0),
    );

    // (1, 0, 0) scaled to (2, 0, 0), rotated to (0, 2, 0), then moved
    let p = transform.transform_point(&Vector3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(p, Vector3::new(1.0, 2.0, 0.0), epsilon = 1.0e-5);

    let back = transform.inverse_transform_point(&p);
    assert_relative_eq!(back, Vector3::new(1.0, 0.0, 0.0), epsilon = 1.0e-5);

    // A collapsed axis maps back to zero rather than infinity
    let flat = Transform::new(Vector3::zeros(), Quaternion::identity(), Vector3::new(1.0, 0.0, 1.0));
    assert_relative_eq!(
        flat.inverse_transform_point(&Vector3::new(1.0, 3.0, 2.0)),
        Vector3::new(1.0, 0.0, 2.0)
    );

    // Directions ignore scale and translation
    let d = transform.transform_direction(&Vector3::x());
    assert_relative_eq!(d, Vector3::y(), epsilon = 1.0e-5);
}

#[test]
fn test_transform_isometry_round_trip_drops_scale() {
    let iso = Isometry::new(Vector3::new(0.5, -1.0, 2.0), Vector3::new(0.1, 0.2, 0.3));
    let transform = Transform::from_isometry(&iso);
    assert_eq!(transform.scale, Vector3::new(1.0, 1.0, 1.0));
    assert_relative_eq!(transform.to_isometry().translation.vector, iso.translation.vector);
}

#[test]
fn test_transform_interpolate_keeps_scale() {
    let a = Transform::new(Vector3::zeros(), Quaternion::identity(), Vector3::new(1.0, 2.0, 3.0));
    let b = Transform::from_position(Vector3::new(2.0, 0.0, 0.0));
    let mid = a.interpolate(&b, 0.5);
    assert_relative_eq!(mid.position, Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(mid.scale, a.scale);
}

#[test]
fn test_aabb_operations() {
    let aabb = Aabb::from_center_half_extents(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
    assert!(aabb.contains_point(&Vector3::new(0.5, -0.5, 0.9)));
    assert!(!aabb.contains_point(&Vector3::new(1.5, 0.0, 0.0)));

    let other = Aabb::new(Vector3::new(0.5, 0.5, 0.5), Vector3::new(2.0, 2.0, 2.0));
    assert!(aabb.intersects(&other));
    assert!(!aabb.intersects(&Aabb::new(Vector3::new(3.0, 3.0, 3.0), Vector3::new(4.0, 4.0, 4.0))));

    assert_relative_eq!(aabb.squared_distance_to_point(&Vector3::new(3.0, 0.0, 0.0)), 4.0);
    assert_relative_eq!(aabb.squared_distance_to_point(&Vector3::new(0.2, 0.1, 0.0)), 0.0);
    assert_relative_eq!(aabb.closest_point(&Vector3::new(3.0, 0.5, -4.0)), Vector3::new(1.0, 0.5, -1.0));

    let points = [Vector3::new(-1.0, 2.0, 0.0), Vector3::new(3.0, -2.0, 1.0)];
    let bounds = Aabb::from_points(&points).unwrap();
    assert_relative_eq!(bounds.center(), Vector3::new(1.0, 0.0, 0.5));
    assert!(Aabb::from_points(&[]).is_none());
}

#[test]
fn test_math_helpers() {
    assert!(math::approx_zero(1.0e-7));
    assert!(!math::approx_zero(1.0e-3));
    assert_eq!(math::normalize_or_zero(&Vector3::zeros()), Vector3::zeros());
    assert_relative_eq!(math::normalize_or_zero(&Vector3::new(0.0, 3.0, 4.0)).norm(), 1.0);
    assert!(!math::is_finite(&Vector3::new(f32::NAN, 0.0, 0.0)));
    assert_relative_eq!(math::to_degrees(PI), 180.0, epsilon = 1.0e-4);
}
