//! Drives the hands from incoming tracking frames.
//!
//! The host calls [`HandsProvider::process_frame`] on two cadences: a
//! variable-rate update tick that only refreshes the tracked pose, and a
//! fixed physics tick that advances the simulated hands and grasping. Both
//! write the simulated hands back into the frame.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::collision::LayerConfig;
use crate::core::{BodyHandle, ContactEventType, HandsConfig, PhysicsBackend};
use crate::grasp::{GrabConfig, GraspRegistry, GraspState, GraspStateMachine, GraspUpdate};
use crate::hands::{HandLayers, PhysicsDriven, SimHand, SimulationStrategy};
use crate::tracking::{Chirality, Frame};
use crate::Result;

/// Which cadence a frame is delivered on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Variable-rate refresh of the tracked pose
    Update,

    /// Fixed-rate physics step of `dt` seconds
    Fixed { dt: f32 },
}

/// A hand together with its grasp classification
#[derive(Debug)]
struct HandSlot {
    hand: SimHand,
    grasp: GraspStateMachine,
    missing_for: f32,
    tracked: bool,
}

impl HandSlot {
    fn new(chirality: Chirality, strategy: Arc<dyn SimulationStrategy>, grab_config: GrabConfig, layers: HandLayers) -> Self {
        Self {
            hand: SimHand::new(chirality, strategy, layers),
            grasp: GraspStateMachine::new(chirality, grab_config),
            missing_for: 0.0,
            tracked: false,
        }
    }
}

/// Owns both hands and runs them frame by frame
#[derive(Debug)]
pub struct HandsProvider {
    config: HandsConfig,
    grab_config: GrabConfig,
    layer_config: LayerConfig,
    strategy: Arc<dyn SimulationStrategy>,
    hands: BTreeMap<Chirality, HandSlot>,
    registry: GraspRegistry,
    last_update_frame: Option<i64>,
    last_fixed_frame: Option<i64>,
}

impl Default for HandsProvider {
    fn default() -> Self {
        Self::new(
            HandsConfig::default(),
            GrabConfig::default(),
            LayerConfig::default(),
            Arc::new(PhysicsDriven),
        )
    }
}

impl HandsProvider {
    pub fn new(
        config: HandsConfig,
        grab_config: GrabConfig,
        layer_config: LayerConfig,
        strategy: Arc<dyn SimulationStrategy>,
    ) -> Self {
        Self {
            config,
            grab_config,
            layer_config,
            strategy,
            hands: BTreeMap::new(),
            registry: GraspRegistry::new(),
            last_update_frame: None,
            last_fixed_frame: None,
        }
    }

    /// Returns the hand configuration
    pub fn get_config(&self) -> &HandsConfig {
        &self.config
    }

    /// Returns the grasp thresholds
    pub fn get_grab_config(&self) -> &GrabConfig {
        &self.grab_config
    }

    /// Returns the layer configuration
    pub fn get_layer_config(&self) -> &LayerConfig {
        &self.layer_config
    }

    /// Returns the grasp ownership table
    pub fn registry(&self) -> &GraspRegistry {
        &self.registry
    }

    /// A generated hand
    pub fn hand(&self, chirality: Chirality) -> Option<&SimHand> {
        self.hands.get(&chirality).map(|slot| &slot.hand)
    }

    /// Grasp state of a generated hand
    pub fn grasp_state(&self, chirality: Chirality) -> Option<GraspState> {
        self.hands.get(&chirality).map(|slot| slot.grasp.state())
    }

    /// The grasp machine of a generated hand
    pub fn grasp(&self, chirality: Chirality) -> Option<&GraspStateMachine> {
        self.hands.get(&chirality).map(|slot| &slot.grasp)
    }

    /// Validates the configuration and sets up the collision layers.
    ///
    /// Running out of free layers is logged and the hands carry on with
    /// whatever layers the host set up by hand.
    pub fn initialize(&mut self, backend: &mut dyn PhysicsBackend) -> Result<()> {
        self.config.validate()?;
        self.grab_config.validate()?;

        if let Err(e) = self.layer_config.generate_layers(backend.layers_mut()) {
            error!(error = %e, "hand layer generation failed");
            return Ok(());
        }
        if let Err(e) = self.layer_config.apply_collision_rules(backend.layers_mut()) {
            warn!(error = %e, "hand collision rules not applied");
        }
        Ok(())
    }

    /// Releases every grasp and removes both hands
    pub fn shutdown(&mut self, backend: &mut dyn PhysicsBackend) {
        for (_, mut slot) in std::mem::take(&mut self.hands) {
            slot.grasp.force_release(&mut slot.hand, &mut self.registry);
            slot.hand.destroy(backend);
        }
        self.last_update_frame = None;
        self.last_fixed_frame = None;
    }

    /// Advances the hands from a frame and writes the simulated hands back
    /// into it. A frame whose id is not newer than the last one seen on the
    /// same cadence changes nothing but is still written back.
    pub fn process_frame(&mut self, frame: &mut Frame, tick: Tick, backend: &mut dyn PhysicsBackend) {
        let last = match tick {
            Tick::Update => &mut self.last_update_frame,
            Tick::Fixed { .. } => &mut self.last_fixed_frame,
        };
        let fresh = last.map_or(true, |id| frame.id > id);

        if fresh {
            *last = Some(frame.id);
            match tick {
                Tick::Update => self.update_step(frame, backend),
                Tick::Fixed { dt } => self.fixed_step(frame, dt, backend),
            }
        }

        self.publish(frame);
    }

    fn update_step(&mut self, frame: &Frame, backend: &mut dyn PhysicsBackend) {
        for chirality in Chirality::BOTH {
            if let (Some(pose), Some(slot)) = (frame.hand(chirality), self.hands.get_mut(&chirality)) {
                slot.hand.update_from_tracked_pose(pose, false, &self.config, backend);
            }
        }
    }

    fn fixed_step(&mut self, frame: &Frame, dt: f32, backend: &mut dyn PhysicsBackend) {
        self.route_contacts(backend);

        for chirality in Chirality::BOTH {
            match frame.hand(chirality) {
                Some(pose) => {
                    let layers = self.hand_layers();
                    let strategy = &self.strategy;
                    let grab_config = &self.grab_config;
                    let slot = self
                        .hands
                        .entry(chirality)
                        .or_insert_with(|| HandSlot::new(chirality, Arc::clone(strategy), grab_config.clone(), layers));
                    slot.tracked = true;
                    slot.missing_for = 0.0;
                    if !slot.hand.is_generated() {
                        slot.hand.generate(pose, &self.config, backend);
                    }
                    slot.hand.update_from_tracked_pose(pose, true, &self.config, backend);
                }
                None => {
                    let Some(slot) = self.hands.get_mut(&chirality) else {
                        continue;
                    };
                    // The grasp is frozen until the grace period runs out
                    if slot.tracked {
                        slot.tracked = false;
                        debug!(hand = chirality.name(), "tracking lost");
                    }
                    slot.missing_for += dt;
                    if slot.missing_for > self.config.lost_tracking_grace {
                        if let Some(mut slot) = self.hands.remove(&chirality) {
                            slot.grasp.force_release(&mut slot.hand, &mut self.registry);
                            slot.hand.destroy(backend);
                        }
                        debug!(hand = chirality.name(), "hand destroyed after losing tracking");
                    }
                }
            }
        }

        let mut updates: Vec<(Chirality, GraspUpdate)> = Vec::new();
        for chirality in Chirality::BOTH {
            if let Some(slot) = self.hands.get_mut(&chirality) {
                if slot.tracked && slot.hand.is_generated() {
                    let update = slot.grasp.evaluate(&mut slot.hand, &mut self.registry, dt, backend);
                    updates.push((chirality, update));
                }
            }
        }

        let mut released: Vec<(Chirality, BodyHandle)> = Vec::new();
        for (chirality, update) in updates {
            if let Some((body, pose)) = update.carry {
                if let Err(e) = backend.drive_body(body, &pose, 1.0) {
                    warn!(hand = chirality.name(), error = %e, "failed to carry grasped body");
                }
            }
            if let Some(body) = update.released {
                released.push((chirality, body));
            }
        }

        for (chirality, body) in released {
            if let Some(slot) = self.hands.get_mut(&chirality) {
                slot.hand.ignore_collision(
                    body,
                    self.config.release_ignore_timeout,
                    self.config.release_ignore_radius,
                    backend,
                );
            }
        }

        for slot in self.hands.values_mut() {
            slot.hand.handle_ignored_objects(dt, backend);
        }
    }

    /// Feeds solver contact events into the bones. Only dynamic bodies are
    /// tracked as contacts.
    fn route_contacts(&mut self, backend: &mut dyn PhysicsBackend) {
        for event in backend.drain_contact_events() {
            if event.event_type == ContactEventType::Begin
                && !backend.body_type(event.other_body).map_or(false, |t| t.is_graspable())
            {
                continue;
            }
            for slot in self.hands.values_mut() {
                let Some(index) = slot.hand.bone_for_collider(event.collider) else {
                    continue;
                };
                let bone = &mut slot.hand.bones_mut()[index];
                match event.event_type {
                    ContactEventType::Begin => bone.add_contacting(event.other_body),
                    ContactEventType::End => bone.remove_contacting(event.other_body),
                }
            }
        }
    }

    /// Layers new hands are created on
    fn hand_layers(&self) -> HandLayers {
        self.layer_config
            .assignment()
            .map(HandLayers::from_assignment)
            .unwrap_or_default()
    }

    /// Ready hands overwrite their frame entry; every other hand is removed
    fn publish(&self, frame: &mut Frame) {
        for chirality in Chirality::BOTH {
            let ready = self.hands.get(&chirality).and_then(|slot| slot.hand.get_hand());
            match ready {
                Some(pose) if frame.hand_index(chirality).is_some() => frame.set_hand(*pose),
                _ => {
                    frame.remove_hand(chirality);
                }
            }
        }
    }
}
