use crate::bodies::{Material, SolverSettings};
use crate::error::HandsError;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Configuration parameters for the simulated hands
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct HandsConfig {
    /// Fraction of the remaining pose error the bone drives remove per step
    pub strength: f32,

    /// Mass of each finger bone (kg)
    pub per_bone_mass: f32,

    /// Palm mass as a multiple of `per_bone_mass`
    pub palm_mass_multiplier: f32,

    /// Palm divergence (m) beyond which the simulated hand snaps back
    pub hand_teleport_distance: f32,

    /// Palm divergence (m) tolerated while any bone is grasping
    pub hand_grasp_teleport_distance: f32,

    /// Position iterations requested from the solver for hand bones
    pub solver_iterations: u32,

    /// Velocity iterations requested from the solver for hand bones
    pub solver_velocity_iterations: u32,

    /// Angular damping of hand bones
    pub angular_damping: f32,

    /// Maximum angular velocity of hand bones (rad/s)
    pub max_angular_velocity: f32,

    /// Maximum depenetration speed of hand bones (m/s)
    pub max_depenetration_velocity: f32,

    /// Seconds a hand may be missing from the frame before it is destroyed
    pub lost_tracking_grace: f32,

    /// Seconds a released object is ignored by the releasing hand
    pub release_ignore_timeout: f32,

    /// Clearance (m) a released object needs before collisions come back
    pub release_ignore_radius: f32,

    /// Clearance (m) a ghosted hand needs before it returns to the active layer
    pub reset_clearance_radius: f32,

    /// Surface material of the hand colliders
    pub material: Material,
}

impl Default for HandsConfig {
    fn default() -> Self {
        Self {
            strength: 1.0,
            per_bone_mass: 0.6,
            palm_mass_multiplier: 3.0,
            hand_teleport_distance: 0.1,
            hand_grasp_teleport_distance: 0.2,
            solver_iterations: 50,
            solver_velocity_iterations: 20,
            angular_damping: 50.0,
            max_angular_velocity: 1.75,
            max_depenetration_velocity: 3.0,
            lost_tracking_grace: 0.5,
            release_ignore_timeout: 0.1,
            release_ignore_radius: 0.005,
            reset_clearance_radius: 0.005,
            material: Material::hand(),
        }
    }
}

impl HandsConfig {
    /// Solver tuning applied to every hand bone
    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            solver_iterations: self.solver_iterations,
            solver_velocity_iterations: self.solver_velocity_iterations,
            angular_damping: self.angular_damping,
            max_angular_velocity: self.max_angular_velocity,
            max_depenetration_velocity: self.max_depenetration_velocity,
        }
    }

    /// Mass of the palm body
    pub fn palm_mass(&self) -> f32 {
        self.per_bone_mass * self.palm_mass_multiplier
    }

    /// Checks that every value is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.strength > 0.0 && self.strength <= 1.0) {
            return Err(HandsError::InvalidParameter(format!(
                "strength must be in (0, 1], got {}",
                self.strength
            )));
        }
        if self.per_bone_mass <= 0.0 || self.palm_mass_multiplier <= 0.0 {
            return Err(HandsError::InvalidParameter("bone masses must be positive".into()));
        }
        if self.hand_teleport_distance <= 0.0 {
            return Err(HandsError::InvalidParameter(
                "hand_teleport_distance must be positive".into(),
            ));
        }
        if self.hand_grasp_teleport_distance < self.hand_teleport_distance {
            return Err(HandsError::InvalidParameter(
                "hand_grasp_teleport_distance must not be smaller than hand_teleport_distance".into(),
            ));
        }
        if self.lost_tracking_grace < 0.0
            || self.release_ignore_timeout < 0.0
            || self.release_ignore_radius < 0.0
            || self.reset_clearance_radius < 0.0
        {
            return Err(HandsError::InvalidParameter("timeouts and radii must not be negative".into()));
        }
        Ok(())
    }
}
