pub mod math;
pub mod core;
pub mod bodies;
pub mod shapes;
pub mod collision;
pub mod tracking;
pub mod hands;
pub mod grasp;
pub mod provider;

/// Re-export common types for easier usage
pub use crate::core::{BodyHandle, ColliderHandle, HandsConfig, PhysicsBackend, PhysicsWorld};
pub use crate::collision::{LayerConfig, LayerMatrix};
pub use crate::tracking::{BonePose, Chirality, Frame, HandPose, HandSignals};
pub use crate::hands::{SimBone, SimHand, SimulationStrategy, DataDriven, PhysicsDriven};
pub use crate::grasp::{GrabConfig, GraspRegistry, GraspState, GraspStateMachine};
pub use crate::provider::{HandsProvider, Tick};
pub use crate::math::Vector3;

/// Error types for the hands core
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum HandsError {
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        #[error("Resource not found: {0}")]
        ResourceNotFound(String),

        #[error("Not enough free collision layers for automatic setup (need {needed}); manual setup is required")]
        LayerExhausted { needed: usize },

        #[error("Layer index {0} is out of range")]
        InvalidLayer(u8),

        #[error("Collision layers have not been generated")]
        LayersNotGenerated,
    }
}

/// Result type for hands core operations
pub type Result<T> = std::result::Result<T, error::HandsError>;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
