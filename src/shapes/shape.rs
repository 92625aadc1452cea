use crate::math::{Aabb, Quaternion, Transform, Vector3};
use crate::shapes::{BoxShape, Capsule, Sphere};
use std::fmt::Debug;

/// Base trait for collider shapes described in the local space of a body
pub trait Shape: Send + Sync + Debug {
    /// Places the shape in world space using the owning body's transform,
    /// honouring non-uniform scale
    fn to_world(&self, transform: &Transform) -> WorldShape;
}

/// The closed set of collider shapes a body can carry
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere(Sphere),
    Capsule(Capsule),
    Box(BoxShape),
}

impl Shape for ColliderShape {
    fn to_world(&self, transform: &Transform) -> WorldShape {
        match self {
            Self::Sphere(s) => s.to_world(transform),
            Self::Capsule(c) => c.to_world(transform),
            Self::Box(b) => b.to_world(transform),
        }
    }
}

impl From<Sphere> for ColliderShape {
    fn from(shape: Sphere) -> Self {
        Self::Sphere(shape)
    }
}

impl From<Capsule> for ColliderShape {
    fn from(shape: Capsule) -> Self {
        Self::Capsule(shape)
    }
}

impl From<BoxShape> for ColliderShape {
    fn from(shape: BoxShape) -> Self {
        Self::Box(shape)
    }
}

/// A collider resolved into world space, ready for overlap tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldShape {
    /// A sphere around a world-space center
    Sphere {
        center: Vector3,
        radius: f32,
    },

    /// A swept sphere between two world-space segment endpoints.
    /// `a == b` is a valid sphere-like capsule.
    Capsule {
        a: Vector3,
        b: Vector3,
        radius: f32,
    },

    /// An oriented box
    Box {
        center: Vector3,
        rotation: Quaternion,
        half_extents: Vector3,
    },
}

impl WorldShape {
    /// Returns the world-space bounds of the shape
    pub fn bounds(&self) -> Aabb {
        match *self {
            Self::Sphere { center, radius } => {
                Aabb::from_center_half_extents(center, Vector3::repeat(radius))
            }
            Self::Capsule { a, b, radius } => {
                Aabb::new(a.inf(&b), a.sup(&b)).expand(radius)
            }
            Self::Box { center, rotation, half_extents } => {
                // Project the rotated half-extents onto the world axes
                let extent = rotation.to_rotation_matrix().matrix().abs() * half_extents;
                Aabb::from_center_half_extents(center, extent)
            }
        }
    }

    /// Returns a copy of the shape grown by `radius` in every direction.
    /// Boxes grow their half-extents, which is slightly conservative at the corners.
    pub fn inflated(&self, radius: f32) -> Self {
        if radius == 0.0 {
            return *self;
        }
        match *self {
            Self::Sphere { center, radius: r } => Self::Sphere {
                center,
                radius: (r + radius).max(0.0),
            },
            Self::Capsule { a, b, radius: r } => Self::Capsule {
                a,
                b,
                radius: (r + radius).max(0.0),
            },
            Self::Box { center, rotation, half_extents } => Self::Box {
                center,
                rotation,
                half_extents: (half_extents + Vector3::repeat(radius)).sup(&Vector3::zeros()),
            },
        }
    }

    /// Returns the world-space center of the shape
    pub fn center(&self) -> Vector3 {
        match *self {
            Self::Sphere { center, .. } => center,
            Self::Capsule { a, b, .. } => (a + b) * 0.5,
            Self::Box { center, .. } => center,
        }
    }
}
