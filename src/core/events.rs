use crate::core::{BodyHandle, ColliderHandle};
use std::collections::VecDeque;

/// Types of contact events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEventType {
    /// The collider has just started touching the body
    Begin,

    /// The collider has just stopped touching the body
    End,
}

/// A contact change between a collider and a body.
///
/// Contacts are reported per (collider, body) pair: a body with several
/// colliders touching the same collider produces a single `Begin` and a
/// single `End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// The type of contact event
    pub event_type: ContactEventType,

    /// The collider on one side of the contact
    pub collider: ColliderHandle,

    /// The body the collider is attached to
    pub collider_body: BodyHandle,

    /// The body on the other side of the contact
    pub other_body: BodyHandle,
}

/// A FIFO queue of contact events produced by a solver step
#[derive(Debug, Default)]
pub struct EventQueue {
    contact_events: VecDeque<ContactEvent>,
}

impl EventQueue {
    /// Creates a new empty event queue
    pub fn new() -> Self {
        Self {
            contact_events: VecDeque::new(),
        }
    }

    /// Adds a contact event to the queue
    pub fn add_contact_event(&mut self, event: ContactEvent) {
        self.contact_events.push_back(event);
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.contact_events.is_empty()
    }

    /// Removes and returns every queued event in order
    pub fn drain(&mut self) -> Vec<ContactEvent> {
        self.contact_events.drain(..).collect()
    }
}
