pub mod world;
pub mod config;
pub mod storage;
pub mod events;
pub mod backend;

pub use self::world::PhysicsWorld;
pub use self::config::HandsConfig;
pub use self::storage::{HandleStorage, Storage};
pub use self::events::{ContactEvent, ContactEventType, EventQueue};
pub use self::backend::{PhysicsBackend, RayHit};

/// A unique identifier for a rigid body owned by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u32);

impl BodyHandle {
    /// Wraps a raw solver id
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// The raw solver id
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// A unique identifier for a collider owned by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderHandle(pub(crate) u32);

impl ColliderHandle {
    /// Wraps a raw solver id
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// The raw solver id
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Conversion from a raw id, used by [`HandleStorage`]
pub trait RawHandle: Copy + Ord {
    fn from_id(id: u32) -> Self;
}

impl RawHandle for BodyHandle {
    fn from_id(id: u32) -> Self {
        Self(id)
    }
}

impl RawHandle for ColliderHandle {
    fn from_id(id: u32) -> Self {
        Self(id)
    }
}
