use std::collections::BTreeMap;

use crate::core::BodyHandle;
use crate::tracking::Chirality;

/// Which hand grasps which body. A body has at most one owner.
#[derive(Debug, Clone, Default)]
pub struct GraspRegistry {
    owners: BTreeMap<BodyHandle, Chirality>,
}

impl GraspRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hand grasping the body
    pub fn owner(&self, body: BodyHandle) -> Option<Chirality> {
        self.owners.get(&body).copied()
    }

    /// Whether a hand other than `hand` grasps the body
    pub fn is_owned_by_other(&self, body: BodyHandle, hand: Chirality) -> bool {
        matches!(self.owner(body), Some(owner) if owner != hand)
    }

    /// Claims the body for a hand. Fails if another hand owns it.
    pub fn claim(&mut self, body: BodyHandle, hand: Chirality) -> bool {
        if self.is_owned_by_other(body, hand) {
            return false;
        }
        self.owners.insert(body, hand);
        true
    }

    /// Releases the body if `hand` owns it
    pub fn release(&mut self, body: BodyHandle, hand: Chirality) -> bool {
        if self.owner(body) == Some(hand) {
            self.owners.remove(&body);
            true
        } else {
            false
        }
    }

    /// Releases everything a hand owns
    pub fn release_hand(&mut self, hand: Chirality) {
        self.owners.retain(|_, owner| *owner != hand);
    }

    /// Bodies grasped by a hand
    pub fn bodies_of(&self, hand: Chirality) -> Vec<BodyHandle> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == hand)
            .map(|(body, _)| *body)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
