use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::collision::{LayerAssignment, LayerMask};
use crate::core::{BodyHandle, ColliderHandle, HandsConfig, PhysicsBackend};
use crate::hands::bone::{bone_index, BodyParams, BoneGeometry, SimBone, BONE_COUNT, JOINTS_PER_FINGER, PALM_FINGER};
use crate::hands::SimulationStrategy;
use crate::math::{Isometry, Vector3};
use crate::tracking::{Chirality, HandPose, FINGER_COUNT};

/// A timed collision ignore between a hand and one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IgnoreEntry {
    /// Seconds left before the entry may be released
    pub timeout: f32,

    /// Clearance the body needs from the hand before the entry is released
    pub radius: f32,
}

/// The collision layers a hand uses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLayers {
    /// Layer while interacting
    pub active: u8,

    /// Layer while ghosted after a reset
    pub reset: u8,

    /// Layers searched by the radius queries
    pub hover: LayerMask,

    /// Layers searched when measuring grasps
    pub contact: LayerMask,
}

impl Default for HandLayers {
    fn default() -> Self {
        Self {
            active: 0,
            reset: 0,
            hover: LayerMask::ALL,
            contact: LayerMask::ALL,
        }
    }
}

impl HandLayers {
    /// Layers taken from a generated assignment
    pub fn from_assignment(assignment: &LayerAssignment) -> Self {
        Self {
            active: assignment.hands,
            reset: assignment.hands_reset,
            hover: assignment.hover_mask,
            contact: assignment.contact_mask,
        }
    }
}

/// A simulated hand: a palm and fifteen finger joints that mirror a tracked
/// hand, plus the timed ignore list used when letting go of objects.
#[derive(Debug)]
pub struct SimHand {
    chirality: Chirality,
    strategy: Arc<dyn SimulationStrategy>,
    layers: HandLayers,
    pub(crate) bones: Vec<SimBone>,
    pub(crate) data: Option<HandPose>,
    pub(crate) modified: Option<HandPose>,
    pub(crate) has_reset: bool,
    pub(crate) ghosted: bool,
    ignored: BTreeMap<BodyHandle, IgnoreEntry>,
}

impl SimHand {
    /// Creates an ungenerated hand
    pub fn new(chirality: Chirality, strategy: Arc<dyn SimulationStrategy>, layers: HandLayers) -> Self {
        Self {
            chirality,
            strategy,
            layers,
            bones: Vec::new(),
            data: None,
            modified: None,
            has_reset: false,
            ghosted: false,
            ignored: BTreeMap::new(),
        }
    }

    /// Returns the hand's chirality
    pub fn get_chirality(&self) -> Chirality {
        self.chirality
    }

    /// Returns the simulation strategy
    pub fn get_strategy(&self) -> &Arc<dyn SimulationStrategy> {
        &self.strategy
    }

    /// Returns the hand's layers
    pub fn get_layers(&self) -> &HandLayers {
        &self.layers
    }

    /// Whether the bones exist
    pub fn is_generated(&self) -> bool {
        self.bones.len() == BONE_COUNT
    }

    /// Creates every bone from a tracked hand. Simulated bones get solver
    /// bodies linked palm to tip, and collisions between the hand's own
    /// colliders are disabled.
    pub fn generate(&mut self, source: &HandPose, config: &HandsConfig, backend: &mut dyn PhysicsBackend) {
        if self.is_generated() {
            return;
        }

        let simulated = self.strategy.is_simulated();
        let params = |mass: f32, parent: Option<BodyHandle>| BodyParams {
            layer: self.layers.active,
            mass,
            material: config.material,
            solver: config.solver_settings(),
            parent,
        };

        let mut bones = Vec::with_capacity(BONE_COUNT);

        let mut palm = SimBone::new(self.chirality, PALM_FINGER, 0);
        let palm_params = params(config.palm_mass(), None);
        palm.generate_palm_bone(source, simulated.then_some(&palm_params), backend);
        let palm_body = palm.body_handle();
        bones.push(palm);

        for finger in 0..FINGER_COUNT {
            let mut parent = palm_body;
            for joint in 0..JOINTS_PER_FINGER {
                let mut bone = SimBone::new(self.chirality, finger, joint);
                let previous = if joint == 0 { 0 } else { bone_index(finger, joint - 1) };
                let joint_params = params(config.per_bone_mass, parent);
                bone.generate_bone(source.bone(finger, joint + 1), Some(previous), simulated.then_some(&joint_params), backend);
                parent = bone.body_handle();
                bones.push(bone);
            }
        }

        // Link each finger joint forward to its successor
        for finger in 0..FINGER_COUNT {
            for joint in 0..JOINTS_PER_FINGER {
                let index = bone_index(finger, joint);
                let prev = bones[index].get_prev();
                let next = (joint + 1 < JOINTS_PER_FINGER).then(|| bone_index(finger, joint + 1));
                bones[index].set_links(prev, next);
            }
        }

        let own: Vec<ColliderHandle> = bones.iter().flat_map(|b| b.colliders().iter().copied()).collect();
        for (i, a) in own.iter().enumerate() {
            for b in own.iter().skip(i + 1) {
                backend.ignore_collision(*a, *b, true);
            }
        }

        self.bones = bones;
        self.data = Some(*source);
        debug!(hand = self.chirality.name(), simulated, "generated hand");
    }

    /// Feeds a tracked pose into the hand. During a fixed step the strategy
    /// also advances the simulated hand.
    pub fn update_from_tracked_pose(
        &mut self,
        pose: &HandPose,
        in_fixed_step: bool,
        config: &HandsConfig,
        backend: &mut dyn PhysicsBackend,
    ) {
        self.data = Some(*pose);
        for bone in self.bones.iter_mut() {
            bone.update_tracked(pose);
        }

        if in_fixed_step && self.is_generated() {
            let strategy = Arc::clone(&self.strategy);
            strategy.update_hand(self, config, backend);
        }
    }

    /// Refreshes the world geometry of every bone
    pub fn compute_bones(&mut self, backend: &dyn PhysicsBackend) {
        for bone in self.bones.iter_mut() {
            bone.compute(backend);
        }
    }

    /// Whether every bone exists and has been positioned at least once, and
    /// the strategy considers the hand settled
    pub fn is_ready(&self) -> bool {
        self.is_generated() && self.bones.iter().all(SimBone::is_positioned) && self.strategy.is_ready(self)
    }

    /// The simulated hand, once ready
    pub fn get_hand(&self) -> Option<&HandPose> {
        if self.is_ready() {
            self.modified.as_ref()
        } else {
            None
        }
    }

    /// The latest tracked hand
    pub fn get_data_hand(&self) -> Option<&HandPose> {
        self.data.as_ref()
    }

    /// Geometry of a bone, once the hand is ready
    pub fn bone_geometry(&self, finger: usize, joint: usize) -> Option<&BoneGeometry> {
        if !self.is_ready() {
            return None;
        }
        self.bone(finger, joint).and_then(SimBone::get_geometry)
    }

    /// All bones, palm first
    pub fn bones(&self) -> &[SimBone] {
        &self.bones
    }

    /// A bone by finger and joint
    pub fn bone(&self, finger: usize, joint: usize) -> Option<&SimBone> {
        self.bones.get(bone_index(finger, joint))
    }

    /// Mutable access to a bone by finger and joint
    pub fn bone_mut(&mut self, finger: usize, joint: usize) -> Option<&mut SimBone> {
        self.bones.get_mut(bone_index(finger, joint))
    }

    pub(crate) fn bones_mut(&mut self) -> &mut [SimBone] {
        &mut self.bones
    }

    /// Index of the bone owning a collider
    pub fn bone_for_collider(&self, collider: ColliderHandle) -> Option<usize> {
        self.bones.iter().position(|b| b.colliders().contains(&collider))
    }

    /// Whether the collider belongs to this hand
    pub fn owns_collider(&self, collider: ColliderHandle) -> bool {
        self.bone_for_collider(collider).is_some()
    }

    /// Whether any bone is grasping something
    pub fn is_grasping(&self) -> bool {
        self.bones.iter().any(SimBone::is_grasping)
    }

    /// Whether the hand has been moved to its reset layer
    pub fn is_ghosted(&self) -> bool {
        self.ghosted
    }

    /// Pose of the simulated palm, falling back to the tracked palm
    pub fn palm_pose(&self) -> Option<Isometry> {
        let palm = self.bones.first()?;
        match palm.get_geometry() {
            Some(geometry) => Some(Isometry::from_parts(geometry.center().into(), palm.get_rotation())),
            None => self.data.map(|d| d.palm_isometry()),
        }
    }

    /// Bodies with colliders inside any bone grown by `radius`, the hand's own excluded
    fn bodies_in_radius(&self, radius: f32, backend: &dyn PhysicsBackend) -> Vec<BodyHandle> {
        let mut found = Vec::new();
        for geometry in self.bones.iter().filter_map(SimBone::get_geometry) {
            let shape = geometry.to_shape().inflated(radius);
            for collider in backend.overlap(&shape, self.layers.hover) {
                if self.owns_collider(collider) {
                    continue;
                }
                if let Some(body) = backend.collider_body(collider) {
                    if !found.contains(&body) {
                        found.push(body);
                    }
                }
            }
        }
        found
    }

    /// Grasp distance of one bone, searched on the hand's contact layers
    pub fn grasp_distance(&self, finger: usize, joint: usize, backend: &dyn PhysicsBackend) -> Option<f32> {
        self.bone(finger, joint)?.grasp_distance(backend, self.layers.contact)
    }

    /// Whether any foreign collider is within `radius` of the hand
    pub fn is_any_object_in_hand_radius(&self, radius: f32, backend: &dyn PhysicsBackend) -> bool {
        !self.bodies_in_radius(radius, backend).is_empty()
    }

    /// Whether the given body is within `radius` of the hand
    pub fn is_object_in_hand_radius(&self, body: BodyHandle, radius: f32, backend: &dyn PhysicsBackend) -> bool {
        self.bodies_in_radius(radius, backend).contains(&body)
    }

    /// Moves every bone body to a layer
    pub(crate) fn set_layer(&mut self, layer: u8, backend: &mut dyn PhysicsBackend) {
        for body in self.bones.iter().filter_map(SimBone::body_handle) {
            if let Err(e) = backend.set_body_layer(body, layer) {
                tracing::warn!(hand = self.chirality.name(), error = %e, "failed to move bone to layer");
            }
        }
    }

    /// Disables collision between every bone and every collider of `body`
    /// for at least `timeout` seconds, and until the body is `radius` away.
    /// Issuing it again for the same body refreshes the entry.
    pub fn ignore_collision(&mut self, body: BodyHandle, timeout: f32, radius: f32, backend: &mut dyn PhysicsBackend) {
        self.set_pairs_ignored(body, true, backend);
        self.ignored.insert(body, IgnoreEntry { timeout, radius });
    }

    fn set_pairs_ignored(&self, body: BodyHandle, ignore: bool, backend: &mut dyn PhysicsBackend) {
        let others = backend.body_colliders(body);
        for own in self.bones.iter().flat_map(|b| b.colliders().iter()) {
            for other in &others {
                backend.ignore_collision(*own, *other, ignore);
            }
        }
    }

    /// The current ignore entry for a body
    pub fn ignore_entry(&self, body: BodyHandle) -> Option<&IgnoreEntry> {
        self.ignored.get(&body)
    }

    /// Number of bodies currently ignored
    pub fn ignored_count(&self) -> usize {
        self.ignored.len()
    }

    /// Counts down the ignore entries and releases those that have both
    /// expired and cleared the hand
    pub fn handle_ignored_objects(&mut self, dt: f32, backend: &mut dyn PhysicsBackend) {
        let bodies: Vec<BodyHandle> = self.ignored.keys().copied().collect();
        for body in bodies {
            if !backend.contains_body(body) {
                self.ignored.remove(&body);
                continue;
            }

            let Some(entry) = self.ignored.get_mut(&body) else {
                continue;
            };
            entry.timeout -= dt;
            let (timeout, radius) = (entry.timeout, entry.radius);

            if timeout <= 0.0 && !self.is_object_in_hand_radius(body, radius, backend) {
                self.set_pairs_ignored(body, false, backend);
                self.ignored.remove(&body);
                debug!(hand = self.chirality.name(), body = body.raw(), "collision restored");
            }
        }
    }

    /// Rebuilds the published hand from the computed bones. Metacarpals are
    /// carried along with the simulated palm.
    pub(crate) fn build_modified_pose(&self, data: &HandPose) -> HandPose {
        let mut hand = *data;
        let Some(palm) = self.palm_pose() else {
            return hand;
        };
        let delta = palm * data.palm_isometry().inverse();

        hand.palm_position = palm.translation.vector;
        hand.palm_rotation = palm.rotation;
        for finger in 0..FINGER_COUNT {
            *hand.bone_mut(finger, 0) = data.bone(finger, 0).transformed(&delta);
            for joint in 0..JOINTS_PER_FINGER {
                if let Some(pose) = self.bone(finger, joint).and_then(SimBone::to_bone_pose) {
                    *hand.bone_mut(finger, joint + 1) = pose;
                }
            }
        }
        hand
    }

    /// Moves every simulated bone onto its tracked pose
    pub(crate) fn teleport_to_tracked(&mut self, backend: &mut dyn PhysicsBackend) {
        for bone in self.bones.iter() {
            if let (Some(body), Some(pose)) = (bone.body_handle(), bone.tracked_pose()) {
                if let Err(e) = backend.teleport_body(body, &pose) {
                    tracing::warn!(hand = self.chirality.name(), error = %e, "failed to teleport bone");
                }
            }
        }
    }

    /// Distance between the simulated and tracked palm
    pub fn palm_divergence(&self) -> Option<f32> {
        let palm = self.palm_pose()?;
        let data = self.data?;
        Some((palm.translation.vector - data.palm_position).norm())
    }

    /// Removes the hand's bodies and forgets all contacts and ignores
    pub fn destroy(&mut self, backend: &mut dyn PhysicsBackend) {
        let ignored: Vec<BodyHandle> = self.ignored.keys().copied().collect();
        for body in ignored {
            if backend.contains_body(body) {
                self.set_pairs_ignored(body, false, backend);
            }
        }
        self.ignored.clear();

        for bone in self.bones.iter_mut() {
            bone.destroy(backend);
        }
        self.bones.clear();
        self.modified = None;
        self.has_reset = false;
        self.ghosted = false;
        debug!(hand = self.chirality.name(), "destroyed hand");
    }

    /// World position of a finger tip on the simulated hand
    pub fn finger_tip(&self, finger: usize) -> Option<Vector3> {
        match self.bone(finger, JOINTS_PER_FINGER - 1)?.get_geometry()? {
            BoneGeometry::Capsule(c) => Some(c.a + c.direction * c.radius),
            BoneGeometry::Box { center, .. } => Some(*center),
        }
    }
}
