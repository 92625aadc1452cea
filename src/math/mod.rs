mod transform;
mod aabb;

pub use transform::Transform;
pub use aabb::Aabb;

use nalgebra as na;

/// A 3D vector in world or local space (meters)
pub type Vector3 = na::Vector3<f32>;

/// A unit quaternion rotation
pub type Quaternion = na::UnitQuaternion<f32>;

/// A rigid transform (rotation + translation, no scale)
pub type Isometry = na::Isometry3<f32>;

/// Constant for a very small number, used for comparisons
pub const EPSILON: f32 = 1.0e-6;

/// Returns true if the value is approximately zero
#[inline]
pub fn approx_zero(a: f32) -> bool {
    approx::abs_diff_eq!(a, 0.0, epsilon = EPSILON)
}

/// Component-wise absolute value
#[inline]
pub fn abs_vec(v: &Vector3) -> Vector3 {
    v.map(f32::abs)
}

/// Largest component of the vector
#[inline]
pub fn max_component(v: &Vector3) -> f32 {
    v.x.max(v.y).max(v.z)
}

/// Returns true if every component of the vector is finite
#[inline]
pub fn is_finite(v: &Vector3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Normalizes a vector, returning zero instead of NaN for degenerate input
#[inline]
pub fn normalize_or_zero(v: &Vector3) -> Vector3 {
    v.try_normalize(EPSILON).unwrap_or_else(Vector3::zeros)
}

/// Converts radians to degrees
#[inline]
pub fn to_degrees(radians: f32) -> f32 {
    radians * 180.0 / std::f32::consts::PI
}
