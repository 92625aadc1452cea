//! The seam between the hands and the rigid-body solver that simulates them.
//!
//! The hands never integrate anything themselves. They create bodies, push
//! drive targets, toggle collision filtering and read back transforms and
//! contacts through this trait.

use crate::bodies::{RigidBodyDesc, RigidBodyType};
use crate::collision::{LayerMask, LayerMatrix};
use crate::core::{BodyHandle, ColliderHandle, ContactEvent};
use crate::math::{Isometry, Transform, Vector3};
use crate::shapes::WorldShape;
use crate::Result;

/// A single ray query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The collider that was hit
    pub collider: ColliderHandle,

    /// The body owning the collider
    pub body: BodyHandle,

    /// Distance along the ray to the hit
    pub distance: f32,
}

/// Operations the hands need from a rigid-body solver
pub trait PhysicsBackend {
    /// Creates a body with its colliders and returns its handle
    fn create_body(&mut self, desc: RigidBodyDesc) -> BodyHandle;

    /// Removes a body and its colliders. Returns whether it existed.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// Returns whether the body exists
    fn contains_body(&self, body: BodyHandle) -> bool;

    /// Returns how the solver treats the body
    fn body_type(&self, body: BodyHandle) -> Option<RigidBodyType>;

    /// Returns the live transform of the body, scale included
    fn body_transform(&self, body: BodyHandle) -> Option<Transform>;

    /// Moves the body to a pose immediately, cancelling any pending drive
    fn teleport_body(&mut self, body: BodyHandle, pose: &Isometry) -> Result<()>;

    /// Pulls the body toward a pose during the next step.
    ///
    /// `strength` is the fraction of the error removed by the step; 1.0
    /// reaches the target exactly.
    fn drive_body(&mut self, body: BodyHandle, target: &Isometry, strength: f32) -> Result<()>;

    /// Moves the body to another collision layer
    fn set_body_layer(&mut self, body: BodyHandle, layer: u8) -> Result<()>;

    /// Returns the body's collision layer
    fn body_layer(&self, body: BodyHandle) -> Option<u8>;

    /// Returns the colliders attached to the body
    fn body_colliders(&self, body: BodyHandle) -> Vec<ColliderHandle>;

    /// Returns the body a collider is attached to
    fn collider_body(&self, collider: ColliderHandle) -> Option<BodyHandle>;

    /// Returns the collider resolved into world space
    fn collider_shape(&self, collider: ColliderHandle) -> Option<WorldShape>;

    /// Enables or disables collision between two specific colliders
    fn ignore_collision(&mut self, a: ColliderHandle, b: ColliderHandle, ignore: bool);

    /// Returns whether collision between two colliders is disabled pairwise
    fn is_collision_ignored(&self, a: ColliderHandle, b: ColliderHandle) -> bool;

    /// Every collider on a layer in `mask` that overlaps `shape`, in handle order
    fn overlap(&self, shape: &WorldShape, mask: LayerMask) -> Vec<ColliderHandle>;

    /// Every collider on a layer in `mask` hit by the ray, nearest first
    fn raycast(&self, origin: &Vector3, direction: &Vector3, max_distance: f32, mask: LayerMask) -> Vec<RayHit>;

    /// Current position of the joint linking the body to its parent, in degrees
    fn joint_position(&self, body: BodyHandle) -> Option<f32>;

    /// The layer ignore-matrix
    fn layers(&self) -> &LayerMatrix;

    /// Mutable access to the layer ignore-matrix
    fn layers_mut(&mut self) -> &mut LayerMatrix;

    /// Removes and returns the contact events produced since the last call
    fn drain_contact_events(&mut self) -> Vec<ContactEvent>;
}
