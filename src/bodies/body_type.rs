/// Type of rigid body, determining how the solver treats it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigidBodyType {
    /// Fully simulated; these are the bodies a hand can touch and grasp
    Dynamic,

    /// Articulation link driven toward a target pose (hand bones)
    Articulated,

    /// Moved programmatically but pushes dynamic bodies
    Kinematic,

    /// Never moves (scenery)
    Static,
}

impl RigidBodyType {
    /// Whether bodies of this type can be grasped
    pub fn is_graspable(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}
