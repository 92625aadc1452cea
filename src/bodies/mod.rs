mod rigid_body;
mod material;
mod body_type;

pub use self::rigid_body::{Drive, RigidBody, RigidBodyDesc, SolverSettings};
pub use self::material::{CombineMode, Material};
pub use self::body_type::RigidBodyType;
