use crate::shapes::{Shape, WorldShape};
use crate::math::{self, Transform, Vector3};

/// A box (cuboid) collision shape
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    /// Local-space center of the box
    center: Vector3,

    /// The half-extents of the box (half-width, half-height, half-depth)
    half_extents: Vector3,
}

impl BoxShape {
    /// Creates a new box with the given half-extents
    pub fn new(half_extents: Vector3) -> Self {
        Self {
            center: Vector3::zeros(),
            half_extents: half_extents.sup(&Vector3::zeros()),
        }
    }

    /// Sets the local-space center of the box
    pub fn with_center(mut self, center: Vector3) -> Self {
        self.center = center;
        self
    }

    /// Returns the half-extents of the box
    pub fn get_half_extents(&self) -> Vector3 {
        self.half_extents
    }

    /// Returns the local-space center of the box
    pub fn get_center(&self) -> Vector3 {
        self.center
    }

    /// Half-extents after applying the absolute value of a (non-uniform) scale
    pub fn scaled_half_extents(&self, scale: &Vector3) -> Vector3 {
        math::abs_vec(scale).component_mul(&self.half_extents)
    }
}

impl Shape for BoxShape {
    fn to_world(&self, transform: &Transform) -> WorldShape {
        WorldShape::Box {
            center: transform.transform_point(&self.center),
            rotation: transform.rotation,
            half_extents: self.scaled_half_extents(&transform.scale),
        }
    }
}
