use crate::bodies::{Material, RigidBodyType};
use crate::core::{BodyHandle, ColliderHandle};
use crate::math::{Isometry, Transform, Vector3};
use crate::shapes::ColliderShape;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Solver tuning passed through to the external solver for hand bones
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SolverSettings {
    /// Position iterations per step
    pub solver_iterations: u32,

    /// Velocity iterations per step
    pub solver_velocity_iterations: u32,

    /// Angular damping of the body
    pub angular_damping: f32,

    /// Maximum angular velocity (rad/s)
    pub max_angular_velocity: f32,

    /// Maximum speed used to push the body out of penetration (m/s)
    pub max_depenetration_velocity: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            solver_iterations: 6,
            solver_velocity_iterations: 1,
            angular_damping: 0.05,
            max_angular_velocity: 7.0,
            max_depenetration_velocity: 10.0,
        }
    }
}

/// Everything the solver needs to create a body
#[derive(Debug, Clone)]
pub struct RigidBodyDesc {
    /// Debug name of the body
    pub name: String,

    /// Initial placement
    pub transform: Transform,

    /// How the solver treats the body
    pub body_type: RigidBodyType,

    /// Mass in kilograms
    pub mass: f32,

    /// Collision layer index
    pub layer: u8,

    /// Colliders attached to the body, in body-local space
    pub colliders: Vec<ColliderShape>,

    /// Surface material shared by all colliders
    pub material: Material,

    /// Solver tuning
    pub solver: SolverSettings,

    /// Articulation parent, for bodies linked by a joint
    pub parent: Option<BodyHandle>,
}

impl RigidBodyDesc {
    /// Creates a description with a single collider
    pub fn new(shape: impl Into<ColliderShape>, transform: Transform, body_type: RigidBodyType) -> Self {
        Self {
            name: String::new(),
            transform,
            body_type,
            mass: 1.0,
            layer: 0,
            colliders: vec![shape.into()],
            material: Material::default(),
            solver: SolverSettings::default(),
            parent: None,
        }
    }

    /// Creates a dynamic (graspable) body at a position
    pub fn new_dynamic(shape: impl Into<ColliderShape>, position: Vector3) -> Self {
        Self::new(shape, Transform::from_position(position), RigidBodyType::Dynamic)
    }

    /// Creates a static body at a position
    pub fn new_static(shape: impl Into<ColliderShape>, position: Vector3) -> Self {
        Self::new(shape, Transform::from_position(position), RigidBodyType::Static)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_collider(mut self, shape: impl Into<ColliderShape>) -> Self {
        self.colliders.push(shape.into());
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_parent(mut self, parent: Option<BodyHandle>) -> Self {
        self.parent = parent;
        self
    }
}

/// A pending drive toward a target pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drive {
    /// Pose the body is pulled toward
    pub target: Isometry,

    /// Fraction of the remaining error removed per step, in (0, 1]
    pub strength: f32,
}

/// A body as stored by the reference world
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) desc: RigidBodyDesc,
    pub(crate) colliders: Vec<ColliderHandle>,
    pub(crate) drive: Option<Drive>,
}

impl RigidBody {
    pub(crate) fn new(desc: RigidBodyDesc) -> Self {
        Self {
            desc,
            colliders: Vec::new(),
            drive: None,
        }
    }

    /// Returns the body's transform
    pub fn get_transform(&self) -> Transform {
        self.desc.transform
    }

    /// Returns the body's position
    pub fn get_position(&self) -> Vector3 {
        self.desc.transform.position
    }

    /// Returns the body type
    pub fn get_body_type(&self) -> RigidBodyType {
        self.desc.body_type
    }

    /// Returns the body's mass
    pub fn get_mass(&self) -> f32 {
        self.desc.mass
    }

    /// Returns the body's collision layer
    pub fn get_layer(&self) -> u8 {
        self.desc.layer
    }

    /// Returns the body's material
    pub fn get_material(&self) -> &Material {
        &self.desc.material
    }

    /// Returns the solver tuning of the body
    pub fn get_solver_settings(&self) -> &SolverSettings {
        &self.desc.solver
    }

    /// Returns the articulation parent
    pub fn get_parent(&self) -> Option<BodyHandle> {
        self.desc.parent
    }

    /// Returns the debug name
    pub fn get_name(&self) -> &str {
        &self.desc.name
    }

    /// Returns the collider handles attached to the body
    pub fn get_colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    /// Returns the pending drive, if any
    pub fn get_drive(&self) -> Option<&Drive> {
        self.drive.as_ref()
    }
}
