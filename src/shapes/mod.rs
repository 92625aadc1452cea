mod shape;
pub mod capsule;
pub mod box_shape;
pub mod sphere;

pub use self::shape::{Shape, ColliderShape, WorldShape};
pub use self::capsule::{Capsule, CapsuleAxis, WorldCapsule};
pub use self::box_shape::BoxShape;
pub use self::sphere::Sphere;
