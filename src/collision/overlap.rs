//! Boolean overlap tests between world-space collider shapes.
//!
//! Spheres and capsules are both handled as swept spheres around a segment
//! (a sphere is a segment of zero length), which leaves three real cases:
//! segment/segment, segment/box and box/box.

use crate::math::{Aabb, Quaternion, Vector3, EPSILON};
use crate::shapes::WorldShape;

/// Iterations of the golden-section search used for segment/box distance
const SEGMENT_BOX_ITERATIONS: usize = 32;

/// Returns whether two world shapes touch or interpenetrate
pub fn overlaps(a: &WorldShape, b: &WorldShape) -> bool {
    if !a.bounds().intersects(&b.bounds()) {
        return false;
    }

    match (as_swept(a), as_swept(b)) {
        (Some((a0, a1, ra)), Some((b0, b1, rb))) => {
            let r = ra + rb;
            segment_segment_distance_squared(&a0, &a1, &b0, &b1) <= r * r
        }
        (Some((s0, s1, r)), None) => segment_box_overlap(&s0, &s1, r, b),
        (None, Some((s0, s1, r))) => segment_box_overlap(&s0, &s1, r, a),
        (None, None) => box_box_overlap(a, b),
    }
}

/// Splits a shape into (segment start, segment end, radius) when it is round
fn as_swept(shape: &WorldShape) -> Option<(Vector3, Vector3, f32)> {
    match *shape {
        WorldShape::Sphere { center, radius } => Some((center, center, radius)),
        WorldShape::Capsule { a, b, radius } => Some((a, b, radius)),
        WorldShape::Box { .. } => None,
    }
}

/// Squared distance from a point to the segment `[a, b]`
pub fn point_segment_distance_squared(p: &Vector3, a: &Vector3, b: &Vector3) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= EPSILON {
        return (p - a).norm_squared();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm_squared()
}

/// Squared distance between the segments `[p1, q1]` and `[p2, q2]`
pub fn segment_segment_distance_squared(p1: &Vector3, q1: &Vector3, p2: &Vector3, q2: &Vector3) -> f32 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    // Both segments degenerate into points
    if a <= EPSILON && e <= EPSILON {
        return r.norm_squared();
    }

    let (s, t) = if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;

            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let c1 = p1 + d1 * s;
    let c2 = p2 + d2 * t;
    (c1 - c2).norm_squared()
}

/// Swept sphere against an oriented box
fn segment_box_overlap(s0: &Vector3, s1: &Vector3, radius: f32, shape: &WorldShape) -> bool {
    let (center, rotation, half_extents) = match *shape {
        WorldShape::Box { center, rotation, half_extents } => (center, rotation, half_extents),
        _ => return false,
    };

    // Work in the box's local frame, where it is an AABB around the origin
    let inv = rotation.inverse();
    let a = inv * (s0 - center);
    let b = inv * (s1 - center);
    let local = Aabb::from_center_half_extents(Vector3::zeros(), half_extents);

    segment_aabb_distance_squared(&a, &b, &local) <= radius * radius
}

/// Squared distance between a segment and an AABB.
///
/// The distance from a point to a convex set is convex along a line, so a
/// golden-section search over the segment parameter converges to the minimum.
pub fn segment_aabb_distance_squared(a: &Vector3, b: &Vector3, aabb: &Aabb) -> f32 {
    let ab = b - a;
    let at = |t: f32| aabb.squared_distance_to_point(&(a + ab * t));

    if ab.norm_squared() <= EPSILON {
        return at(0.0);
    }

    let ratio = 0.5 * (5.0f32.sqrt() - 1.0);
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let mut f1 = at(x1);
    let mut f2 = at(x2);

    for _ in 0..SEGMENT_BOX_ITERATIONS {
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = at(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = at(x2);
        }
    }

    f1.min(f2).min(at(0.0)).min(at(1.0))
}

/// Separating axis test between two oriented boxes
fn box_box_overlap(a: &WorldShape, b: &WorldShape) -> bool {
    let (ca, ra, ha) = match *a {
        WorldShape::Box { center, rotation, half_extents } => (center, rotation, half_extents),
        _ => return false,
    };
    let (cb, rb, hb) = match *b {
        WorldShape::Box { center, rotation, half_extents } => (center, rotation, half_extents),
        _ => return false,
    };

    let axes_a = box_axes(&ra);
    let axes_b = box_axes(&rb);
    let delta = cb - ca;

    let separated_on = |axis: &Vector3| -> bool {
        let len_sq = axis.norm_squared();
        if len_sq <= EPSILON {
            // Parallel edge pair, the face axes already cover it
            return false;
        }
        let axis = axis / len_sq.sqrt();
        let project = |axes: &[Vector3; 3], h: &Vector3| {
            axes[0].dot(&axis).abs() * h.x
                + axes[1].dot(&axis).abs() * h.y
                + axes[2].dot(&axis).abs() * h.z
        };
        delta.dot(&axis).abs() > project(&axes_a, &ha) + project(&axes_b, &hb)
    };

    for axis in axes_a.iter().chain(axes_b.iter()) {
        if separated_on(axis) {
            return false;
        }
    }
    for ea in &axes_a {
        for eb in &axes_b {
            if separated_on(&ea.cross(eb)) {
                return false;
            }
        }
    }

    true
}

fn box_axes(rotation: &Quaternion) -> [Vector3; 3] {
    [
        rotation * Vector3::x(),
        rotation * Vector3::y(),
        rotation * Vector3::z(),
    ]
}

/// Maximum marching steps for [`ray_distance`]
const RAY_MARCH_STEPS: usize = 64;

/// Distance below which a marching ray counts as a hit
const RAY_HIT_TOLERANCE: f32 = 1.0e-4;

/// Distance from a point to the surface of a shape, zero inside it
pub fn point_distance(p: &Vector3, shape: &WorldShape) -> f32 {
    match *shape {
        WorldShape::Sphere { center, radius } => ((p - center).norm() - radius).max(0.0),
        WorldShape::Capsule { a, b, radius } => {
            (point_segment_distance_squared(p, &a, &b).sqrt() - radius).max(0.0)
        }
        WorldShape::Box { center, rotation, half_extents } => {
            let local = rotation.inverse() * (p - center);
            Aabb::from_center_half_extents(Vector3::zeros(), half_extents)
                .squared_distance_to_point(&local)
                .sqrt()
        }
    }
}

/// Marches a ray against a shape and returns the distance to the first hit.
///
/// `direction` must be unit length. Every shape here is convex, so sphere
/// tracing with the exact point distance never steps through the surface.
pub fn ray_distance(origin: &Vector3, direction: &Vector3, max_distance: f32, shape: &WorldShape) -> Option<f32> {
    let mut t = 0.0f32;
    for _ in 0..RAY_MARCH_STEPS {
        let d = point_distance(&(origin + direction * t), shape);
        if d <= RAY_HIT_TOLERANCE {
            return Some(t);
        }
        t += d;
        if t > max_distance {
            return None;
        }
    }
    None
}
