//! The tracked-frame contract: what arrives from the tracking source each
//! frame and what is handed downstream after simulation.

mod pose;
mod frame;
pub mod factory;

pub use self::pose::{
    BonePose, Chirality, FingerPose, HandPose, HandSignals, BONES_PER_FINGER, FINGER_COUNT,
};
pub use self::frame::Frame;
pub use self::factory::{test_hand, test_hand_at};
