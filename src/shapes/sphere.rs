use crate::shapes::{Shape, WorldShape};
use crate::math::{self, Transform, Vector3};

/// A spherical collision shape
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    /// Local-space center of the sphere
    center: Vector3,

    /// The radius of the sphere
    radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given radius
    pub fn new(radius: f32) -> Self {
        Self {
            center: Vector3::zeros(),
            radius: radius.max(0.0),
        }
    }

    /// Sets the local-space center of the sphere
    pub fn with_center(mut self, center: Vector3) -> Self {
        self.center = center;
        self
    }

    /// Returns the radius of the sphere
    pub fn get_radius(&self) -> f32 {
        self.radius
    }
}

impl Shape for Sphere {
    fn to_world(&self, transform: &Transform) -> WorldShape {
        // The largest scale axis wins so the sphere stays a sphere
        let scale = math::max_component(&math::abs_vec(&transform.scale));
        WorldShape::Sphere {
            center: transform.transform_point(&self.center),
            radius: self.radius * scale,
        }
    }
}
