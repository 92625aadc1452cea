use crate::error::HandsError;
use crate::hands::PALM_FINGER;
use crate::tracking::HandSignals;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Number of strength channels: five fingers plus the palm
pub const GRASP_CHANNELS: usize = 6;

/// Thumb channel
pub const THUMB: usize = 0;

/// Palm channel, driven by fist strength
pub const PALM: usize = PALM_FINGER;

/// Thresholds for classifying contact into grasps.
///
/// Every per-finger array is indexed thumb, index, middle, ring, pinky, palm.
/// Strengths are dimensionless in [0, 1]; the palm reads the fist strength.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct GrabConfig {
    /// Strength needed to start a grab
    pub grab_entry: [f32; GRASP_CHANNELS],

    /// Strength needed for a touch to count as contact
    pub contact_entry: [f32; GRASP_CHANNELS],

    /// Strength below which a grab lets go; strictly below `grab_entry`
    pub exit: [f32; GRASP_CHANNELS],

    /// Pinch opening (m) since the grab began that releases a thumb and
    /// single finger grab
    pub required_pinch_distance: f32,

    /// Seconds a bone keeps counting after its contact disappears
    pub grab_cooldown: f32,

    /// Consecutive steps the grab criteria must hold before grabbing
    pub grab_entry_steps: u32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            grab_entry: [0.2, 0.25, 0.25, 0.25, 0.25, 0.1],
            contact_entry: [0.15, 0.15, 0.15, 0.15, 0.15, 0.0],
            exit: [0.1, 0.05, 0.05, 0.05, 0.05, 0.05],
            required_pinch_distance: 0.018,
            grab_cooldown: 0.025,
            grab_entry_steps: 3,
        }
    }
}

impl GrabConfig {
    /// Checks threshold ranges and that every exit threshold is strictly
    /// below its entry threshold
    pub fn validate(&self) -> Result<()> {
        let all = self.grab_entry.iter().chain(self.contact_entry.iter()).chain(self.exit.iter());
        for &value in all {
            if !(0.0..=1.0).contains(&value) {
                return Err(HandsError::InvalidParameter(format!(
                    "strength threshold {} is outside [0, 1]",
                    value
                )));
            }
        }

        for channel in 0..GRASP_CHANNELS {
            if self.exit[channel] >= self.grab_entry[channel] {
                return Err(HandsError::InvalidParameter(format!(
                    "exit threshold {} must be below entry threshold {} for channel {}",
                    self.exit[channel], self.grab_entry[channel], channel
                )));
            }
        }

        if self.required_pinch_distance <= 0.0 {
            return Err(HandsError::InvalidParameter("required_pinch_distance must be positive".into()));
        }
        if self.grab_cooldown < 0.0 {
            return Err(HandsError::InvalidParameter("grab_cooldown must not be negative".into()));
        }
        if self.grab_entry_steps == 0 {
            return Err(HandsError::InvalidParameter("grab_entry_steps must be at least 1".into()));
        }
        Ok(())
    }
}

/// Per-channel strengths read from the tracking signals
pub fn channel_strengths(signals: &HandSignals) -> [f32; GRASP_CHANNELS] {
    let mut strengths = [0.0; GRASP_CHANNELS];
    strengths[..5].copy_from_slice(&signals.finger_strength);
    strengths[PALM] = signals.fist_strength;
    strengths
}
