//! How a hand follows its tracked pose.
//!
//! A strategy is chosen when the hand is created and never switched.

use std::fmt::Debug;

use tracing::debug;

use crate::core::{HandsConfig, PhysicsBackend};
use crate::hands::{SimBone, SimHand};

/// Advances a simulated hand from its latest tracked pose
pub trait SimulationStrategy: Send + Sync + Debug {
    /// Returns the name of the strategy
    fn name(&self) -> &'static str;

    /// Whether bones get bodies in the solver
    fn is_simulated(&self) -> bool;

    /// Runs once per fixed step after the tracked pose has been stored
    fn update_hand(&self, hand: &mut SimHand, config: &HandsConfig, backend: &mut dyn PhysicsBackend);

    /// Extra readiness condition on top of every bone being positioned
    fn is_ready(&self, _hand: &SimHand) -> bool {
        true
    }
}

/// Bones mirror tracking exactly; the published hand is the tracked hand
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDriven;

impl SimulationStrategy for DataDriven {
    fn name(&self) -> &'static str {
        "DataDriven"
    }

    fn is_simulated(&self) -> bool {
        false
    }

    fn update_hand(&self, hand: &mut SimHand, _config: &HandsConfig, backend: &mut dyn PhysicsBackend) {
        hand.compute_bones(backend);
        hand.modified = hand.data;
    }
}

/// Bones are solver bodies driven toward the tracked pose.
///
/// When the simulated palm strays too far from the tracked palm the whole
/// hand is teleported back and moved to the reset layer, where it stays
/// until nothing is near it. The hand only becomes ready after its first
/// reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsDriven;

impl SimulationStrategy for PhysicsDriven {
    fn name(&self) -> &'static str {
        "PhysicsDriven"
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn update_hand(&self, hand: &mut SimHand, config: &HandsConfig, backend: &mut dyn PhysicsBackend) {
        let Some(data) = hand.data else {
            return;
        };

        hand.compute_bones(backend);

        let limit = if hand.is_grasping() {
            config.hand_grasp_teleport_distance
        } else {
            config.hand_teleport_distance
        };
        let divergence = hand.palm_divergence().unwrap_or(f32::INFINITY);

        if !hand.has_reset || divergence > limit {
            hand.teleport_to_tracked(backend);
            hand.compute_bones(backend);
            let reset = hand.get_layers().reset;
            hand.set_layer(reset, backend);
            hand.ghosted = true;
            hand.has_reset = true;
            debug!(hand = hand.get_chirality().name(), divergence, limit, "hand reset");
        } else if hand.ghosted && !hand.is_any_object_in_hand_radius(config.reset_clearance_radius, backend) {
            let active = hand.get_layers().active;
            hand.set_layer(active, backend);
            hand.ghosted = false;
            debug!(hand = hand.get_chirality().name(), "hand left reset layer");
        }

        for bone in hand.bones().iter() {
            if let (Some(body), Some(target)) = (bone.body_handle(), bone.tracked_pose()) {
                if let Err(e) = backend.drive_body(body, &target, config.strength) {
                    tracing::warn!(error = %e, "failed to drive bone");
                }
            }
        }

        hand.modified = Some(hand.build_modified_pose(&data));
    }

    fn is_ready(&self, hand: &SimHand) -> bool {
        hand.has_reset && hand.bones().iter().all(SimBone::is_positioned)
    }
}
