use crate::math::Vector3;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Axis-Aligned Bounding Box used as the broad-phase reject for overlap queries
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the AABB
    pub min: Vector3,

    /// Maximum corner of the AABB
    pub max: Vector3,
}

impl Aabb {
    /// Creates a new AABB from minimum and maximum points
    #[inline]
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    /// Creates an AABB centered at a position with the given half extents
    #[inline]
    pub fn from_center_half_extents(center: Vector3, half_extents: Vector3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates an AABB from a set of points
    pub fn from_points(points: &[Vector3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for point in rest {
            aabb.expand_to_include_point(point);
        }
        Some(aabb)
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    /// Returns half the extents of the AABB in each dimension
    #[inline]
    pub fn half_extents(&self) -> Vector3 {
        (self.max - self.min) * 0.5
    }

    /// Checks if this AABB contains a point
    #[inline]
    pub fn contains_point(&self, point: &Vector3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Checks if this AABB intersects with another AABB
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Expands this AABB to include a point
    #[inline]
    pub fn expand_to_include_point(&mut self, point: &Vector3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Expands this AABB by a margin in all directions
    #[inline]
    pub fn expand(&self, margin: f32) -> Self {
        let margin_vec = Vector3::repeat(margin);
        Self {
            min: self.min - margin_vec,
            max: self.max + margin_vec,
        }
    }

    /// Returns the closest point on (or in) the AABB to a given point
    #[inline]
    pub fn closest_point(&self, point: &Vector3) -> Vector3 {
        point.sup(&self.min).inf(&self.max)
    }

    /// Returns the squared distance from a point to the AABB
    #[inline]
    pub fn squared_distance_to_point(&self, point: &Vector3) -> f32 {
        (self.closest_point(point) - point).norm_squared()
    }
}
