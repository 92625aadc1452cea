use crate::math::{approx_zero, Isometry, Quaternion, Vector3};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A world-space placement of a body: position, rotation and (possibly
/// non-uniform) scale
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position in 3D space
    pub position: Vector3,

    /// Rotation as a unit quaternion
    pub rotation: Quaternion,

    /// Scale in each local axis
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Creates a new transform with the given position, rotation, and scale
    #[inline]
    pub fn new(position: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Creates a new identity transform (no translation, no rotation, unit scale)
    #[inline]
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Quaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    /// Creates a new transform from just a position
    #[inline]
    pub fn from_position(position: Vector3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Creates a new transform from a position and rotation
    #[inline]
    pub fn from_position_rotation(position: Vector3, rotation: Quaternion) -> Self {
        Self {
            position,
            rotation,
            scale: Vector3::repeat(1.0),
        }
    }

    /// Creates a unit-scale transform from a rigid isometry
    #[inline]
    pub fn from_isometry(isometry: &Isometry) -> Self {
        Self::from_position_rotation(isometry.translation.vector, isometry.rotation)
    }

    /// Drops the scale and returns the rigid part of this transform
    #[inline]
    pub fn to_isometry(&self) -> Isometry {
        Isometry::from_parts(self.position.into(), self.rotation)
    }

    /// Transforms a point by this transform (scale, then rotate, then translate)
    #[inline]
    pub fn transform_point(&self, point: &Vector3) -> Vector3 {
        self.rotation * point.component_mul(&self.scale) + self.position
    }

    /// Transforms a direction vector by this transform, ignoring translation and scale
    #[inline]
    pub fn transform_direction(&self, direction: &Vector3) -> Vector3 {
        self.rotation * direction
    }

    /// Transforms a world-space point into the local space of this transform
    pub fn inverse_transform_point(&self, point: &Vector3) -> Vector3 {
        let local = self.rotation.inverse() * (point - self.position);
        Vector3::new(
            if approx_zero(self.scale.x) { 0.0 } else { local.x / self.scale.x },
            if approx_zero(self.scale.y) { 0.0 } else { local.y / self.scale.y },
            if approx_zero(self.scale.z) { 0.0 } else { local.z / self.scale.z },
        )
    }

    /// Interpolates position and rotation toward another transform; scale is kept
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            position: self.position.lerp(&other.position, t),
            rotation: self.rotation.slerp(&other.rotation, t),
            scale: self.scale,
        }
    }
}
