mod bone;
mod hand;
mod strategy;

pub use self::bone::{
    bone_index, BodyParams, BoneBody, BoneGeometry, SimBone, BONE_COUNT, JOINTS_PER_FINGER, PALM_FINGER,
};
pub use self::hand::{HandLayers, IgnoreEntry, SimHand};
pub use self::strategy::{DataDriven, PhysicsDriven, SimulationStrategy};
