//! Classifies what each hand is touching versus holding.
//!
//! One [`GraspStateMachine`] runs per hand. The only state shared between
//! the two hands is the [`GraspRegistry`], so hands must be evaluated in a
//! fixed order each step.

mod config;
mod registry;
mod machine;

pub use self::config::{channel_strengths, GrabConfig, GRASP_CHANNELS, PALM, THUMB};
pub use self::registry::GraspRegistry;
pub use self::machine::{GrabValues, GraspState, GraspStateMachine, GraspUpdate};
