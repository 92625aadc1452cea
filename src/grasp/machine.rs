use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::core::{BodyHandle, PhysicsBackend};
use crate::grasp::config::{channel_strengths, GRASP_CHANNELS, PALM, THUMB};
use crate::grasp::{GrabConfig, GraspRegistry};
use crate::hands::{SimHand, PALM_FINGER};
use crate::math::{Isometry, Quaternion, Vector3};
use crate::tracking::{Chirality, FINGER_COUNT};

/// Grasp classification of one hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraspState {
    /// Nothing touched
    Idle,

    /// Touching something without holding it
    Contact,

    /// Holding a body
    Grab,
}

/// A (finger, joint) pair; the palm is `(PALM_FINGER, 0)`
type BoneKey = (usize, usize);

/// Bones of one hand counted toward one body
#[derive(Debug, Clone, Default)]
struct Candidate {
    bones: BTreeSet<BoneKey>,
    cooldowns: BTreeMap<BoneKey, f32>,
    streak: u32,
}

impl Candidate {
    fn has_channel(&self, channel: usize) -> bool {
        self.bones.iter().any(|(finger, _)| *finger == channel)
    }

    fn has_joint(&self, finger: usize, joint: usize) -> bool {
        self.bones.contains(&(finger, joint))
    }

    /// Thumb and palm need any contact, index and middle a joint past the
    /// first, ring and pinky the last joint
    fn grasped(&self, channel: usize) -> bool {
        match channel {
            THUMB | PALM => self.has_channel(channel),
            1 | 2 => self.bones.iter().any(|&(f, j)| f == channel && j != 0),
            3 | 4 => self.has_joint(channel, 2),
            _ => false,
        }
    }
}

/// Snapshot taken when a grab begins
#[derive(Debug, Clone, PartialEq)]
pub struct GrabValues {
    /// Channel strengths when the grab began
    pub entry_strength: [f32; GRASP_CHANNELS],

    /// Channel strengths at the latest step
    pub current_strength: [f32; GRASP_CHANNELS],

    /// Channels that were grasping when the grab began
    pub grasping_channels: [bool; GRASP_CHANNELS],

    /// Finger tip positions when the grab began, thumb first
    pub entry_tips: [Vector3; FINGER_COUNT],

    /// Object position in the palm's frame
    pub offset: Vector3,

    /// Object rotation relative to the palm
    pub rotation_offset: Quaternion,

    /// Pinch distance when the grab began (m)
    pub entry_pinch_distance: f32,
}

impl GrabValues {
    /// The object pose that keeps it fixed relative to a palm pose
    pub fn carry_pose(&self, palm: &Isometry) -> Isometry {
        palm * Isometry::from_parts(self.offset.into(), self.rotation_offset)
    }
}

/// What changed during one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraspUpdate {
    /// Body grabbed this step
    pub grabbed: Option<BodyHandle>,

    /// Body released this step
    pub released: Option<BodyHandle>,

    /// Body being held and the pose it should be moved to
    pub carry: Option<(BodyHandle, Isometry)>,
}

/// Per-hand Idle, Contact and Grab classification with hysteresis
#[derive(Debug)]
pub struct GraspStateMachine {
    chirality: Chirality,
    config: GrabConfig,
    state: GraspState,
    candidates: BTreeMap<BodyHandle, Candidate>,
    grabbed: Option<(BodyHandle, GrabValues)>,
}

impl GraspStateMachine {
    pub fn new(chirality: Chirality, config: GrabConfig) -> Self {
        Self {
            chirality,
            config,
            state: GraspState::Idle,
            candidates: BTreeMap::new(),
            grabbed: None,
        }
    }

    /// Returns the hand this machine classifies
    pub fn get_chirality(&self) -> Chirality {
        self.chirality
    }

    /// Returns the thresholds in use
    pub fn get_config(&self) -> &GrabConfig {
        &self.config
    }

    /// Returns the current state
    pub fn state(&self) -> GraspState {
        self.state
    }

    /// The body being held
    pub fn grabbed_body(&self) -> Option<BodyHandle> {
        self.grabbed.as_ref().map(|(body, _)| *body)
    }

    /// Values captured when the current grab began
    pub fn grab_values(&self) -> Option<&GrabValues> {
        self.grabbed.as_ref().map(|(_, values)| values)
    }

    /// Bodies with bones counted toward them, in handle order
    pub fn candidate_bodies(&self) -> Vec<BodyHandle> {
        self.candidates.keys().copied().collect()
    }

    /// Whether a bone currently counts toward a body, cooldown included
    pub fn is_bone_counted(&self, body: BodyHandle, finger: usize, joint: usize) -> bool {
        self.candidates
            .get(&body)
            .map_or(false, |c| c.has_joint(finger, joint))
    }

    /// Advances the classification by one physics step
    pub fn evaluate(
        &mut self,
        hand: &mut SimHand,
        registry: &mut GraspRegistry,
        dt: f32,
        backend: &dyn PhysicsBackend,
    ) -> GraspUpdate {
        let mut update = GraspUpdate::default();
        let signals = hand.get_data_hand().map(|h| h.signals).unwrap_or_default();
        let strengths = channel_strengths(&signals);

        self.refresh_candidates(hand, dt);

        if self.state == GraspState::Idle {
            let config = &self.config;
            if self.candidates.values().any(|c| meets_contact_entry(c, &strengths, config)) {
                self.set_state(GraspState::Contact);
            }
        }

        match self.state {
            GraspState::Idle => {
                for candidate in self.candidates.values_mut() {
                    candidate.streak = 0;
                }
            }
            GraspState::Contact => {
                if self.candidates.is_empty() {
                    self.set_state(GraspState::Idle);
                    return update;
                }

                let mut chosen = None;
                for (body, candidate) in self.candidates.iter_mut() {
                    if meets_grab_entry(candidate, &strengths, &self.config) {
                        candidate.streak += 1;
                    } else {
                        candidate.streak = 0;
                    }
                    if chosen.is_none()
                        && candidate.streak >= self.config.grab_entry_steps
                        && !registry.is_owned_by_other(*body, self.chirality)
                    {
                        chosen = Some(*body);
                    }
                }

                if let Some(body) = chosen {
                    if self.begin_grab(body, hand, registry, &strengths, signals.pinch_distance, backend) {
                        update.grabbed = Some(body);
                    }
                }
            }
            GraspState::Grab => {
                let Some((body, values)) = self.grabbed.as_mut() else {
                    self.set_state(GraspState::Contact);
                    return update;
                };
                let body = *body;
                values.current_strength = strengths;

                if !backend.contains_body(body)
                    || should_release(values, &strengths, signals.pinch_distance, &self.config)
                {
                    self.release(hand, registry);
                    update.released = Some(body);
                } else {
                    self.sync_grasping(body, hand, backend);
                    if let (Some(palm), Some((_, values))) = (hand.palm_pose(), self.grabbed.as_ref()) {
                        update.carry = Some((body, values.carry_pose(&palm)));
                    }
                }
            }
        }

        update
    }

    /// Drops any grab and every candidate, returning the released body
    pub fn force_release(&mut self, hand: &mut SimHand, registry: &mut GraspRegistry) -> Option<BodyHandle> {
        let released = self.grabbed_body();
        if released.is_some() {
            self.release(hand, registry);
        }
        self.candidates.clear();
        self.set_state(GraspState::Idle);
        released
    }

    fn set_state(&mut self, state: GraspState) {
        if self.state != state {
            debug!(hand = self.chirality.name(), from = ?self.state, to = ?state, "grasp state changed");
            self.state = state;
        }
    }

    /// Merges this step's contacts into the candidates and runs the cooldowns
    fn refresh_candidates(&mut self, hand: &SimHand, dt: f32) {
        let mut current: BTreeMap<BodyHandle, BTreeSet<BoneKey>> = BTreeMap::new();
        for bone in hand.bones() {
            let key = (bone.get_finger(), bone.get_joint());
            for body in bone.contacting() {
                current.entry(*body).or_default().insert(key);
            }
        }

        for (body, bones) in &current {
            let candidate = self.candidates.entry(*body).or_default();
            for key in bones {
                candidate.bones.insert(*key);
                candidate.cooldowns.remove(key);
            }
        }

        let cooldown = self.config.grab_cooldown;
        for (body, candidate) in self.candidates.iter_mut() {
            let live = current.get(body);
            let dropped: Vec<BoneKey> = candidate
                .bones
                .iter()
                .filter(|key| live.map_or(true, |l| !l.contains(key)))
                .copied()
                .collect();

            for key in dropped {
                let expired = match candidate.cooldowns.get_mut(&key) {
                    Some(timer) => {
                        *timer -= dt;
                        *timer <= 0.0
                    }
                    None if cooldown > 0.0 => {
                        candidate.cooldowns.insert(key, cooldown);
                        false
                    }
                    None => true,
                };
                if expired {
                    candidate.bones.remove(&key);
                    candidate.cooldowns.remove(&key);
                }
            }
        }

        let grabbed = self.grabbed_body();
        self.candidates
            .retain(|body, c| !c.bones.is_empty() || Some(*body) == grabbed);
    }

    fn begin_grab(
        &mut self,
        body: BodyHandle,
        hand: &mut SimHand,
        registry: &mut GraspRegistry,
        strengths: &[f32; GRASP_CHANNELS],
        pinch_distance: f32,
        backend: &dyn PhysicsBackend,
    ) -> bool {
        let (Some(palm), Some(object)) = (hand.palm_pose(), backend.body_transform(body)) else {
            return false;
        };
        let Some(candidate) = self.candidates.get(&body) else {
            return false;
        };
        if !registry.claim(body, self.chirality) {
            return false;
        }

        let mut grasping_channels = [false; GRASP_CHANNELS];
        for (channel, grasping) in grasping_channels.iter_mut().enumerate() {
            *grasping = candidate.grasped(channel) && strengths[channel] >= self.config.grab_entry[channel];
        }

        let mut entry_tips = [Vector3::zeros(); FINGER_COUNT];
        for (finger, tip) in entry_tips.iter_mut().enumerate() {
            *tip = hand.finger_tip(finger).unwrap_or_else(Vector3::zeros);
        }

        let relative = palm.inverse() * object.to_isometry();
        let values = GrabValues {
            entry_strength: *strengths,
            current_strength: *strengths,
            grasping_channels,
            entry_tips,
            offset: relative.translation.vector,
            rotation_offset: relative.rotation,
            entry_pinch_distance: pinch_distance,
        };

        let bones: Vec<BoneKey> = candidate.bones.iter().copied().collect();
        for (finger, joint) in bones {
            if let Some(bone) = hand.bone_mut(finger, joint) {
                bone.add_grasping(body, backend);
            }
        }

        self.grabbed = Some((body, values));
        self.set_state(GraspState::Grab);
        debug!(hand = self.chirality.name(), body = body.raw(), "grabbed");
        true
    }

    /// Keeps the bones' grasping sets in line with the counted bones
    fn sync_grasping(&self, body: BodyHandle, hand: &mut SimHand, backend: &dyn PhysicsBackend) {
        let counted = self.candidates.get(&body).map(|c| c.bones.clone()).unwrap_or_default();
        for bone in hand.bones_mut() {
            let key = (bone.get_finger(), bone.get_joint());
            let holding = bone.grasping().contains(&body);
            if counted.contains(&key) && !holding {
                bone.add_grasping(body, backend);
            } else if !counted.contains(&key) && holding {
                bone.remove_grasping(body);
            }
        }
    }

    fn release(&mut self, hand: &mut SimHand, registry: &mut GraspRegistry) {
        let Some((body, _)) = self.grabbed.take() else {
            return;
        };
        for bone in hand.bones_mut() {
            bone.remove_grasping(body);
        }
        registry.release(body, self.chirality);
        for candidate in self.candidates.values_mut() {
            candidate.streak = 0;
        }
        self.set_state(GraspState::Contact);
        debug!(hand = self.chirality.name(), body = body.raw(), "released");
    }
}

/// Palm or thumb touching at contact strength, plus a qualifying finger joint
fn meets_contact_entry(candidate: &Candidate, strengths: &[f32; GRASP_CHANNELS], config: &GrabConfig) -> bool {
    let reaches = |channel: usize| strengths[channel] >= config.contact_entry[channel];

    let anchor = (candidate.has_channel(PALM_FINGER) && reaches(PALM))
        || (candidate.has_channel(THUMB) && reaches(THUMB));

    let finger = ((candidate.has_joint(1, 1) || candidate.has_joint(1, 2)) && reaches(1))
        || (candidate.has_joint(2, 2) && reaches(2))
        || (candidate.has_joint(3, 2) && reaches(3))
        || (candidate.has_joint(4, 2) && reaches(4));

    anchor && finger
}

/// A grasped anchor and at least one grasped finger at grab strength
fn meets_grab_entry(candidate: &Candidate, strengths: &[f32; GRASP_CHANNELS], config: &GrabConfig) -> bool {
    let holds = |channel: usize| candidate.grasped(channel) && strengths[channel] >= config.grab_entry[channel];
    (holds(THUMB) || holds(PALM)) && (1..FINGER_COUNT).any(holds)
}

fn should_release(values: &GrabValues, strengths: &[f32; GRASP_CHANNELS], pinch_distance: f32, config: &GrabConfig) -> bool {
    let below = |channel: usize| strengths[channel] < config.exit[channel];

    let fingers: Vec<usize> = (1..FINGER_COUNT).filter(|&f| values.grasping_channels[f]).collect();
    if fingers.iter().all(|&f| below(f)) {
        return true;
    }

    let anchors: Vec<usize> = [THUMB, PALM]
        .into_iter()
        .filter(|&a| values.grasping_channels[a])
        .collect();
    if anchors.iter().all(|&a| below(a)) {
        return true;
    }

    values.grasping_channels[THUMB]
        && fingers.len() == 1
        && pinch_distance - values.entry_pinch_distance > config.required_pinch_distance
}
