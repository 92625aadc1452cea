#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// How two materials' coefficients are combined at a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum CombineMode {
    Average,
    Minimum,
    Multiply,
    Maximum,
}

/// Surface properties handed to the solver for a collider
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Material {
    /// Friction while sliding, 0-1
    pub dynamic_friction: f32,

    /// Friction at rest, 0-1
    pub static_friction: f32,

    /// Coefficient of restitution (bounciness), 0-1
    pub restitution: f32,

    /// How friction is combined with the other collider
    pub friction_combine: CombineMode,

    /// How restitution is combined with the other collider
    pub bounce_combine: CombineMode,
}

impl Material {
    /// Creates a new material with the specified properties
    pub fn new(dynamic_friction: f32, static_friction: f32, restitution: f32) -> Self {
        Self {
            dynamic_friction,
            static_friction,
            restitution,
            ..Self::default()
        }
    }

    /// Low-friction, non-bouncy material used for hand bones so held
    /// objects can slip instead of sticking to the fingers
    pub fn hand() -> Self {
        Self {
            dynamic_friction: 0.1,
            static_friction: 0.15,
            restitution: 0.0,
            friction_combine: CombineMode::Average,
            bounce_combine: CombineMode::Minimum,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            dynamic_friction: 0.6,
            static_friction: 0.6,
            restitution: 0.0,
            friction_combine: CombineMode::Average,
            bounce_combine: CombineMode::Average,
        }
    }
}
