use crate::tracking::{Chirality, HandPose};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// One tracking frame as delivered upstream and forwarded downstream
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Monotonically non-decreasing frame identifier
    pub id: i64,

    /// Hands present in the frame
    pub hands: Vec<HandPose>,
}

impl Frame {
    pub fn new(id: i64, hands: Vec<HandPose>) -> Self {
        Self { id, hands }
    }

    /// Index of the hand with the given chirality
    pub fn hand_index(&self, chirality: Chirality) -> Option<usize> {
        self.hands.iter().position(|h| h.chirality == chirality)
    }

    /// The hand with the given chirality
    pub fn hand(&self, chirality: Chirality) -> Option<&HandPose> {
        self.hands.iter().find(|h| h.chirality == chirality)
    }

    /// Overwrites the entry for the hand's chirality in place, appending it if absent
    pub fn set_hand(&mut self, hand: HandPose) {
        match self.hand_index(hand.chirality) {
            Some(i) => self.hands[i] = hand,
            None => self.hands.push(hand),
        }
    }

    /// Removes the hand with the given chirality, returning it
    pub fn remove_hand(&mut self, chirality: Chirality) -> Option<HandPose> {
        self.hand_index(chirality).map(|i| self.hands.remove(i))
    }
}
