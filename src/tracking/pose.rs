use crate::math::{normalize_or_zero, Isometry, Quaternion, Vector3};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Number of fingers on a hand
pub const FINGER_COUNT: usize = 5;

/// Number of tracked bones per finger (metacarpal, proximal, intermediate, distal)
pub const BONES_PER_FINGER: usize = 4;

/// Handedness of a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Chirality {
    Left,
    Right,
}

impl Chirality {
    /// Both hands in evaluation order
    pub const BOTH: [Chirality; 2] = [Chirality::Left, Chirality::Right];

    /// The opposite hand
    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

/// One tracked bone: a segment between two joints with a width
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct BonePose {
    /// Joint closest to the wrist
    pub prev_joint: Vector3,

    /// Joint closest to the finger tip
    pub next_joint: Vector3,

    /// Diameter of the bone (m)
    pub width: f32,

    /// Orientation of the bone; local +Z points from `prev_joint` to `next_joint`
    pub rotation: Quaternion,
}

impl Default for BonePose {
    fn default() -> Self {
        Self {
            prev_joint: Vector3::zeros(),
            next_joint: Vector3::zeros(),
            width: 0.0,
            rotation: Quaternion::identity(),
        }
    }
}

impl BonePose {
    /// Midpoint between the two joints
    pub fn center(&self) -> Vector3 {
        (self.prev_joint + self.next_joint) * 0.5
    }

    /// Unit direction from `prev_joint` to `next_joint`, zero for a zero-length bone
    pub fn direction(&self) -> Vector3 {
        normalize_or_zero(&(self.next_joint - self.prev_joint))
    }

    /// Distance between the two joints
    pub fn length(&self) -> f32 {
        (self.next_joint - self.prev_joint).norm()
    }

    /// Half the width
    pub fn radius(&self) -> f32 {
        self.width * 0.5
    }

    /// The bone's pose as an isometry centered on the bone
    pub fn isometry(&self) -> Isometry {
        Isometry::from_parts(self.center().into(), self.rotation)
    }

    /// Applies a rigid transform to the bone
    pub fn transformed(&self, delta: &Isometry) -> Self {
        Self {
            prev_joint: delta.transform_point(&self.prev_joint.into()).coords,
            next_joint: delta.transform_point(&self.next_joint.into()).coords,
            width: self.width,
            rotation: delta.rotation * self.rotation,
        }
    }
}

/// One tracked finger
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FingerPose {
    /// Bones from the wrist outwards: metacarpal, proximal, intermediate, distal
    pub bones: [BonePose; BONES_PER_FINGER],
}

impl FingerPose {
    /// Position of the finger tip
    pub fn tip(&self) -> Vector3 {
        self.bones[BONES_PER_FINGER - 1].next_joint
    }
}

/// Scalar signals derived upstream from the joint geometry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct HandSignals {
    /// Distance between the thumb and index tips (m)
    pub pinch_distance: f32,

    /// Curl strength per finger, thumb first, in [0, 1]
    pub finger_strength: [f32; FINGER_COUNT],

    /// Overall fist strength in [0, 1]
    pub fist_strength: f32,
}

/// A complete tracked hand
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct HandPose {
    /// Which hand this is
    pub chirality: Chirality,

    /// Palm center
    pub palm_position: Vector3,

    /// Palm orientation; local +Z points towards the fingers, -Y out of the palm
    pub palm_rotation: Quaternion,

    /// Palm width (m)
    pub palm_width: f32,

    /// Fingers, thumb first
    pub fingers: [FingerPose; FINGER_COUNT],

    /// Derived strength signals
    pub signals: HandSignals,
}

impl HandPose {
    /// The palm pose as an isometry
    pub fn palm_isometry(&self) -> Isometry {
        Isometry::from_parts(self.palm_position.into(), self.palm_rotation)
    }

    /// A bone by finger and tracked bone index
    pub fn bone(&self, finger: usize, bone: usize) -> &BonePose {
        &self.fingers[finger].bones[bone]
    }

    /// Mutable access to a bone by finger and tracked bone index
    pub fn bone_mut(&mut self, finger: usize, bone: usize) -> &mut BonePose {
        &mut self.fingers[finger].bones[bone]
    }

    /// Applies a rigid transform to the whole hand
    pub fn transformed(&self, delta: &Isometry) -> Self {
        let mut hand = *self;
        hand.palm_position = delta.transform_point(&self.palm_position.into()).coords;
        hand.palm_rotation = delta.rotation * self.palm_rotation;
        for finger in hand.fingers.iter_mut() {
            for bone in finger.bones.iter_mut() {
                *bone = bone.transformed(delta);
            }
        }
        hand
    }

    /// Builder-style replacement of the strength signals
    pub fn with_signals(mut self, signals: HandSignals) -> Self {
        self.signals = signals;
        self
    }
}
