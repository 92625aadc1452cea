use crate::shapes::{Shape, WorldShape};
use crate::math::{self, Transform, Vector3};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// The local axis a capsule's segment runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum CapsuleAxis {
    X,
    Y,
    Z,
}

impl CapsuleAxis {
    /// Unit vector of the axis in local space
    pub fn unit(&self) -> Vector3 {
        match self {
            Self::X => Vector3::x(),
            Self::Y => Vector3::y(),
            Self::Z => Vector3::z(),
        }
    }

    /// Scale along the axis and the larger of the two perpendicular scales
    fn split_scale(&self, scale: &Vector3) -> (f32, f32) {
        match self {
            Self::X => (scale.x, scale.y.max(scale.z)),
            Self::Y => (scale.y, scale.x.max(scale.z)),
            Self::Z => (scale.z, scale.x.max(scale.y)),
        }
    }
}

/// A capsule collision shape (cylinder with hemisphere caps at both ends)
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    /// Local-space center of the capsule
    center: Vector3,

    /// The radius of the capsule
    radius: f32,

    /// The total height of the capsule, tip to tip, including both caps
    height: f32,

    /// The local axis the capsule is aligned with
    axis: CapsuleAxis,
}

impl Capsule {
    /// Creates a new capsule with the given radius and total height
    pub fn new(radius: f32, height: f32, axis: CapsuleAxis) -> Self {
        Self {
            center: Vector3::zeros(),
            radius: radius.max(0.0),
            height: height.max(0.0),
            axis,
        }
    }

    /// Sets the local-space center of the capsule
    pub fn with_center(mut self, center: Vector3) -> Self {
        self.center = center;
        self
    }

    /// Returns the radius of the capsule
    pub fn get_radius(&self) -> f32 {
        self.radius
    }

    /// Returns the total height of the capsule (including hemisphere caps)
    pub fn get_height(&self) -> f32 {
        self.height
    }

    /// Returns the local axis of the capsule
    pub fn get_axis(&self) -> CapsuleAxis {
        self.axis
    }

    /// Returns the local-space center of the capsule
    pub fn get_center(&self) -> Vector3 {
        self.center
    }

    /// Resolves the capsule into world space.
    ///
    /// Radius takes the larger of the two scale components perpendicular to
    /// the axis, height takes the axial component. A capsule whose height
    /// does not exceed its diameter is a sphere: its direction is zero and
    /// both segment endpoints coincide with the center.
    pub fn to_world_capsule(&self, transform: &Transform) -> WorldCapsule {
        let scale = math::abs_vec(&transform.scale);
        let (axial, perpendicular) = self.axis.split_scale(&scale);

        let radius = perpendicular * self.radius;
        let height = axial * self.height;
        let center = transform.transform_point(&self.center);

        let direction = if height <= radius * 2.0 {
            Vector3::zeros()
        } else {
            math::normalize_or_zero(&transform.transform_direction(&self.axis.unit()))
        };

        let offset = direction * (height * 0.5 - radius).max(0.0);

        WorldCapsule {
            center,
            direction,
            height,
            radius,
            a: center + offset,
            b: center - offset,
        }
    }
}

/// A capsule resolved into world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCapsule {
    /// Center of the capsule
    pub center: Vector3,

    /// Unit direction of the segment, or zero for a sphere-like capsule
    pub direction: Vector3,

    /// Total scaled height
    pub height: f32,

    /// Scaled radius
    pub radius: f32,

    /// Segment endpoint toward `+direction`
    pub a: Vector3,

    /// Segment endpoint toward `-direction`
    pub b: Vector3,
}

impl WorldCapsule {
    /// Length of the inner segment
    pub fn segment_length(&self) -> f32 {
        (self.a - self.b).norm()
    }
}

impl Shape for Capsule {
    fn to_world(&self, transform: &Transform) -> WorldShape {
        let capsule = self.to_world_capsule(transform);
        WorldShape::Capsule {
            a: capsule.a,
            b: capsule.b,
            radius: capsule.radius,
        }
    }
}
