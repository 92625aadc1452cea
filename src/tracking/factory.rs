//! Builds an anatomically plausible open hand, used to lay out a hand's
//! bodies before any tracking data has arrived and as a fixture in tests.

use crate::math::{Isometry, Quaternion, Vector3};
use crate::tracking::{BonePose, Chirality, FingerPose, HandPose, HandSignals, FINGER_COUNT};

/// Palm width of the generated hand (m)
const PALM_WIDTH: f32 = 0.085;

/// Distance from the palm center to the knuckles along the palm's +Z
const KNUCKLE_OFFSET: f32 = 0.035;

/// Knuckle offsets across the palm for index..pinky, positive towards the thumb
const KNUCKLE_SPREAD: [f32; 4] = [0.024, 0.004, -0.015, -0.032];

/// Lengths of proximal, intermediate and distal bones for index..pinky
const FINGER_LENGTHS: [[f32; 3]; 4] = [
    [0.040, 0.024, 0.020],
    [0.044, 0.028, 0.021],
    [0.041, 0.027, 0.020],
    [0.032, 0.019, 0.018],
];

/// Lengths of the thumb's proximal, intermediate and distal bones
const THUMB_LENGTHS: [f32; 3] = [0.040, 0.030, 0.022];

/// Bone widths, thumb first
const FINGER_WIDTHS: [f32; FINGER_COUNT] = [0.019, 0.017, 0.017, 0.016, 0.014];

fn bone(prev_joint: Vector3, next_joint: Vector3, width: f32, rotation: Quaternion) -> BonePose {
    BonePose {
        prev_joint,
        next_joint,
        width,
        rotation,
    }
}

/// Lays out a chain of bones starting at `base` along `direction`
fn chain(base: Vector3, direction: Vector3, lengths: [f32; 4], width: f32) -> FingerPose {
    let rotation = Quaternion::rotation_between(&Vector3::z(), &direction).unwrap_or_else(Quaternion::identity);
    let mut bones = [BonePose::default(); 4];
    let mut joint = base;
    for (i, length) in lengths.iter().enumerate() {
        let next = joint + direction * *length;
        bones[i] = bone(joint, next, width, rotation);
        joint = next;
    }
    FingerPose { bones }
}

/// An open, flat hand with the palm facing -Y and the fingers along +Z in
/// the local frame of `pose`. All strength signals are zero.
pub fn test_hand(chirality: Chirality, pose: &Isometry) -> HandPose {
    // Side of the palm the thumb is on
    let side = match chirality {
        Chirality::Left => 1.0,
        Chirality::Right => -1.0,
    };

    let mut fingers = [FingerPose::default(); FINGER_COUNT];

    let thumb_direction = Vector3::new(side * 0.6, -0.2, 0.75).normalize();
    let thumb_base = Vector3::new(side * 0.02, -0.01, -0.02);
    let [p, i, d] = THUMB_LENGTHS;
    // The thumb's metacarpal has zero length
    fingers[0] = chain(thumb_base, thumb_direction, [0.0, p, i, d], FINGER_WIDTHS[0]);

    for finger in 1..FINGER_COUNT {
        let x = side * KNUCKLE_SPREAD[finger - 1];
        let wrist = Vector3::new(x, 0.0, -KNUCKLE_OFFSET);
        let [p, i, d] = FINGER_LENGTHS[finger - 1];
        fingers[finger] = chain(wrist, Vector3::z(), [2.0 * KNUCKLE_OFFSET, p, i, d], FINGER_WIDTHS[finger]);
    }

    HandPose {
        chirality,
        palm_position: Vector3::zeros(),
        palm_rotation: Quaternion::identity(),
        palm_width: PALM_WIDTH,
        fingers,
        signals: HandSignals::default(),
    }
    .transformed(pose)
}

/// [`test_hand`] placed at a position with no rotation
pub fn test_hand_at(chirality: Chirality, position: Vector3) -> HandPose {
    test_hand(chirality, &Isometry::translation(position.x, position.y, position.z))
}
