use std::collections::BTreeSet;

use tracing::warn;

use crate::bodies::{Material, RigidBodyDesc, RigidBodyType, SolverSettings};
use crate::collision::LayerMask;
use crate::core::{BodyHandle, ColliderHandle, PhysicsBackend};
use crate::math::{Isometry, Quaternion, Transform, Vector3};
use crate::shapes::{BoxShape, Capsule, CapsuleAxis, ColliderShape, Shape, WorldCapsule, WorldShape};
use crate::tracking::{BonePose, Chirality, HandPose};

/// Finger index used for the palm
pub const PALM_FINGER: usize = 5;

/// Simulated joints per finger; the metacarpal is not simulated
pub const JOINTS_PER_FINGER: usize = 3;

/// Palm plus every finger joint
pub const BONE_COUNT: usize = 1 + 5 * JOINTS_PER_FINGER;

/// Thickness of the palm box (m)
const PALM_THICKNESS: f32 = 0.025;

/// Fraction of the capsule height the grasp ray origin is pushed towards the tip
const GRASP_RAY_FORWARD: f32 = 0.25;

/// Index of a bone in a hand's bone array: the palm first, then each finger's joints
pub fn bone_index(finger: usize, joint: usize) -> usize {
    if finger == PALM_FINGER {
        0
    } else {
        finger * JOINTS_PER_FINGER + joint + 1
    }
}

/// World-space geometry of a bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoneGeometry {
    /// A finger joint
    Capsule(WorldCapsule),

    /// The palm
    Box {
        center: Vector3,
        rotation: Quaternion,
        half_extents: Vector3,
    },
}

impl BoneGeometry {
    /// Capsule geometry of a tracked bone spanning its two joints
    pub fn from_bone_pose(bone: &BonePose) -> Self {
        let radius = bone.radius();
        let length = bone.length();
        let direction = bone.direction();
        let center = bone.center();
        let offset = direction * (length * 0.5);
        BoneGeometry::Capsule(WorldCapsule {
            center,
            direction,
            height: length + 2.0 * radius,
            radius,
            a: center + offset,
            b: center - offset,
        })
    }

    /// Box geometry of a tracked palm
    pub fn from_palm(hand: &HandPose) -> Self {
        BoneGeometry::Box {
            center: hand.palm_position,
            rotation: hand.palm_rotation,
            half_extents: palm_half_extents(hand.palm_width),
        }
    }

    /// The geometry as an overlap-testable shape
    pub fn to_shape(&self) -> WorldShape {
        match *self {
            BoneGeometry::Capsule(c) => WorldShape::Capsule { a: c.a, b: c.b, radius: c.radius },
            BoneGeometry::Box { center, rotation, half_extents } => WorldShape::Box {
                center,
                rotation,
                half_extents,
            },
        }
    }

    /// Center of the geometry
    pub fn center(&self) -> Vector3 {
        match *self {
            BoneGeometry::Capsule(c) => c.center,
            BoneGeometry::Box { center, .. } => center,
        }
    }
}

fn palm_half_extents(width: f32) -> Vector3 {
    Vector3::new(width * 0.5, PALM_THICKNESS * 0.5, width * 0.5)
}

/// Parameters for creating a simulated bone body
#[derive(Debug, Clone)]
pub struct BodyParams {
    /// Collision layer of the body
    pub layer: u8,

    /// Mass of the body (kg)
    pub mass: f32,

    /// Collider material
    pub material: Material,

    /// Solver tuning
    pub solver: SolverSettings,

    /// Body the joint attaches to, if any
    pub parent: Option<BodyHandle>,
}

/// How a bone is represented, chosen when the bone is generated
#[derive(Debug, Clone, PartialEq)]
pub enum BoneBody {
    /// Geometry only, mirrored from tracking
    Data,

    /// A body in the solver
    Simulated {
        body: BodyHandle,
        colliders: Vec<ColliderHandle>,
        shape: ColliderShape,
    },
}

/// One segment of a simulated hand: the palm or a finger joint.
///
/// Bones are owned by their [`SimHand`](crate::hands::SimHand) and refer to
/// their neighbours by index into the hand's bone array.
#[derive(Debug, Clone)]
pub struct SimBone {
    hand: Chirality,
    finger: usize,
    joint: usize,
    prev: Option<usize>,
    next: Option<usize>,
    body: BoneBody,
    tracked: Option<BoneGeometry>,
    tracked_rotation: Quaternion,
    geometry: Option<BoneGeometry>,
    rotation: Quaternion,
    contacting: BTreeSet<BodyHandle>,
    grasping: BTreeSet<BodyHandle>,
    original_drive_limit: Option<f32>,
    drive_limit: Option<f32>,
}

impl SimBone {
    /// Creates an ungenerated bone bound to a hand, finger and joint
    pub fn new(hand: Chirality, finger: usize, joint: usize) -> Self {
        Self {
            hand,
            finger,
            joint: if finger == PALM_FINGER { 0 } else { joint },
            prev: None,
            next: None,
            body: BoneBody::Data,
            tracked: None,
            tracked_rotation: Quaternion::identity(),
            geometry: None,
            rotation: Quaternion::identity(),
            contacting: BTreeSet::new(),
            grasping: BTreeSet::new(),
            original_drive_limit: None,
            drive_limit: None,
        }
    }

    /// Returns the owning hand
    pub fn get_hand(&self) -> Chirality {
        self.hand
    }

    /// Returns the finger index, [`PALM_FINGER`] for the palm
    pub fn get_finger(&self) -> usize {
        self.finger
    }

    /// Returns the joint index within the finger
    pub fn get_joint(&self) -> usize {
        self.joint
    }

    /// Whether this is the palm bone
    pub fn is_palm(&self) -> bool {
        self.finger == PALM_FINGER
    }

    /// Index of the previous bone in the hand's array
    pub fn get_prev(&self) -> Option<usize> {
        self.prev
    }

    /// Index of the next bone in the hand's array
    pub fn get_next(&self) -> Option<usize> {
        self.next
    }

    pub(crate) fn set_links(&mut self, prev: Option<usize>, next: Option<usize>) {
        self.prev = prev;
        self.next = next;
    }

    /// Returns how the bone is represented
    pub fn get_body(&self) -> &BoneBody {
        &self.body
    }

    /// Returns the solver body, for simulated bones
    pub fn body_handle(&self) -> Option<BodyHandle> {
        match &self.body {
            BoneBody::Simulated { body, .. } => Some(*body),
            BoneBody::Data => None,
        }
    }

    /// Returns the solver colliders, empty for data-only bones
    pub fn colliders(&self) -> &[ColliderHandle] {
        match &self.body {
            BoneBody::Simulated { colliders, .. } => colliders,
            BoneBody::Data => &[],
        }
    }

    /// Creates a finger joint from a tracked bone. `params` is `None` for a
    /// data-only bone. `previous` is the index of the preceding joint.
    pub fn generate_bone(
        &mut self,
        source: &BonePose,
        previous: Option<usize>,
        params: Option<&BodyParams>,
        backend: &mut dyn PhysicsBackend,
    ) {
        self.prev = previous;
        self.tracked = Some(BoneGeometry::from_bone_pose(source));
        self.tracked_rotation = source.rotation;

        if let Some(params) = params {
            let shape = ColliderShape::from(Capsule::new(
                source.radius(),
                source.length() + source.width,
                CapsuleAxis::Z,
            ));
            let transform = Transform::from_position_rotation(source.center(), source.rotation);
            self.body = self.create_body(shape, transform, params, backend);
        }
    }

    /// Creates the palm from a tracked hand. `params` is `None` for a data-only bone.
    pub fn generate_palm_bone(&mut self, source: &HandPose, params: Option<&BodyParams>, backend: &mut dyn PhysicsBackend) {
        self.tracked = Some(BoneGeometry::from_palm(source));
        self.tracked_rotation = source.palm_rotation;

        if let Some(params) = params {
            let shape = ColliderShape::from(BoxShape::new(palm_half_extents(source.palm_width)));
            let transform = Transform::from_position_rotation(source.palm_position, source.palm_rotation);
            self.body = self.create_body(shape, transform, params, backend);
        }
    }

    fn create_body(
        &self,
        shape: ColliderShape,
        transform: Transform,
        params: &BodyParams,
        backend: &mut dyn PhysicsBackend,
    ) -> BoneBody {
        let name = if self.is_palm() {
            format!("{} Palm", self.hand.name())
        } else {
            format!("{} {} {}", self.hand.name(), self.finger, self.joint)
        };
        let desc = RigidBodyDesc::new(shape.clone(), transform, RigidBodyType::Articulated)
            .with_name(name)
            .with_mass(params.mass)
            .with_layer(params.layer)
            .with_material(params.material)
            .with_solver(params.solver)
            .with_parent(params.parent);
        let body = backend.create_body(desc);
        let colliders = backend.body_colliders(body);
        BoneBody::Simulated { body, colliders, shape }
    }

    /// Records the latest tracked pose of this bone
    pub fn update_tracked(&mut self, hand: &HandPose) {
        if self.is_palm() {
            self.tracked = Some(BoneGeometry::from_palm(hand));
            self.tracked_rotation = hand.palm_rotation;
        } else {
            let bone = hand.bone(self.finger, self.joint + 1);
            self.tracked = Some(BoneGeometry::from_bone_pose(bone));
            self.tracked_rotation = bone.rotation;
        }
    }

    /// Returns the latest tracked geometry
    pub fn get_tracked(&self) -> Option<&BoneGeometry> {
        self.tracked.as_ref()
    }

    /// Pose the bone's body should reach to match tracking
    pub fn tracked_pose(&self) -> Option<Isometry> {
        self.tracked
            .map(|g| Isometry::from_parts(g.center().into(), self.tracked_rotation))
    }

    /// Refreshes the world-space geometry.
    ///
    /// Data-only bones copy the tracked geometry. Simulated bones read the
    /// live body transform, including non-uniform scale, and resolve their
    /// collider into world space.
    pub fn compute(&mut self, backend: &dyn PhysicsBackend) {
        match &self.body {
            BoneBody::Data => {
                if let Some(tracked) = self.tracked {
                    self.geometry = Some(tracked);
                    self.rotation = self.tracked_rotation;
                }
            }
            BoneBody::Simulated { body, shape, .. } => {
                let Some(transform) = backend.body_transform(*body) else {
                    warn!(hand = self.hand.name(), finger = self.finger, joint = self.joint, "bone body is missing");
                    return;
                };
                let geometry = match shape {
                    ColliderShape::Capsule(capsule) => BoneGeometry::Capsule(capsule.to_world_capsule(&transform)),
                    ColliderShape::Box(b) => BoneGeometry::Box {
                        center: transform.transform_point(&b.get_center()),
                        rotation: transform.rotation,
                        half_extents: b.scaled_half_extents(&transform.scale),
                    },
                    ColliderShape::Sphere(s) => {
                        let WorldShape::Sphere { center, radius } = s.to_world(&transform) else {
                            return;
                        };
                        BoneGeometry::Capsule(WorldCapsule {
                            center,
                            direction: Vector3::zeros(),
                            height: 2.0 * radius,
                            radius,
                            a: center,
                            b: center,
                        })
                    }
                };
                self.geometry = Some(geometry);
                self.rotation = transform.rotation;
            }
        }
    }

    /// Returns the world-space geometry once the bone has been computed
    pub fn get_geometry(&self) -> Option<&BoneGeometry> {
        self.geometry.as_ref()
    }

    /// Whether the bone has been positioned at least once
    pub fn is_positioned(&self) -> bool {
        self.geometry.is_some()
    }

    /// Orientation of the bone as last computed
    pub fn get_rotation(&self) -> Quaternion {
        self.rotation
    }

    /// The computed geometry as a tracked bone, joints ordered wrist to tip.
    /// `None` for the palm and for bones not yet computed.
    pub fn to_bone_pose(&self) -> Option<BonePose> {
        match self.geometry? {
            BoneGeometry::Capsule(c) => Some(BonePose {
                prev_joint: c.b,
                next_joint: c.a,
                width: c.radius * 2.0,
                rotation: self.rotation,
            }),
            BoneGeometry::Box { .. } => None,
        }
    }

    /// Bodies currently touching the bone
    pub fn contacting(&self) -> &BTreeSet<BodyHandle> {
        &self.contacting
    }

    /// Bodies the bone is currently grasping
    pub fn grasping(&self) -> &BTreeSet<BodyHandle> {
        &self.grasping
    }

    pub fn is_contacting(&self) -> bool {
        !self.contacting.is_empty()
    }

    pub fn is_grasping(&self) -> bool {
        !self.grasping.is_empty()
    }

    pub fn add_contacting(&mut self, body: BodyHandle) {
        self.contacting.insert(body);
    }

    pub fn remove_contacting(&mut self, body: BodyHandle) {
        self.contacting.remove(&body);
    }

    /// Marks the bone as grasping a body. The first grasp snapshots the
    /// current joint position as the drive limit.
    pub fn add_grasping(&mut self, body: BodyHandle, backend: &dyn PhysicsBackend) {
        if self.grasping.is_empty() {
            if let Some(handle) = self.body_handle() {
                if let Some(position) = backend.joint_position(handle) {
                    if self.original_drive_limit.is_none() {
                        self.original_drive_limit = self.drive_limit;
                    }
                    self.drive_limit = Some(position);
                }
            }
        }
        self.grasping.insert(body);
    }

    /// Stops grasping a body. The drive limit is restored once nothing is grasped.
    pub fn remove_grasping(&mut self, body: BodyHandle) {
        self.grasping.remove(&body);
        if self.grasping.is_empty() {
            self.drive_limit = self.original_drive_limit.take();
        }
    }

    /// Joint drive limit in degrees captured when the grasp began
    pub fn get_drive_limit(&self) -> Option<f32> {
        self.drive_limit
    }

    /// Distance from a point a quarter along the bone, cast out of the bone's
    /// underside, to the nearest body it grasps.
    ///
    /// Only finger bones past the first joint that are grasping something
    /// produce a distance.
    pub fn grasp_distance(&self, backend: &dyn PhysicsBackend, mask: LayerMask) -> Option<f32> {
        if self.is_palm() || self.joint == 0 || self.grasping.is_empty() {
            return None;
        }
        let body = self.body_handle()?;
        let transform = backend.body_transform(body)?;
        let BoneGeometry::Capsule(capsule) = self.geometry? else {
            return None;
        };

        let origin = capsule.center + transform.rotation * Vector3::new(0.0, 0.0, capsule.height * GRASP_RAY_FORWARD);
        let direction = -(transform.rotation * Vector3::y());

        backend
            .raycast(&origin, &direction, capsule.height, mask)
            .into_iter()
            .filter(|hit| self.grasping.contains(&hit.body))
            .map(|hit| hit.distance)
            .reduce(f32::min)
    }

    /// Drops every contact and grasp, used when the hand is torn down
    pub(crate) fn clear(&mut self) {
        self.contacting.clear();
        self.grasping.clear();
        self.drive_limit = self.original_drive_limit.take();
    }

    /// Removes the bone's body from the solver
    pub(crate) fn destroy(&mut self, backend: &mut dyn PhysicsBackend) {
        if let Some(body) = self.body_handle() {
            backend.remove_body(body);
        }
        self.body = BoneBody::Data;
        self.geometry = None;
        self.clear();
    }
}
