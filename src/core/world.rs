use std::collections::BTreeSet;

use crate::bodies::{Drive, RigidBody, RigidBodyDesc, RigidBodyType};
use crate::collision::{overlaps, ray_distance, LayerMask, LayerMatrix};
use crate::core::storage::{HandleStorage, Storage};
use crate::core::{
    BodyHandle, ColliderHandle, ContactEvent, ContactEventType, EventQueue, PhysicsBackend, RayHit,
};
use crate::error::HandsError;
use crate::math::{to_degrees, Isometry, Transform, Vector3};
use crate::shapes::{ColliderShape, Shape, WorldShape};
use crate::Result;

/// A collider as stored by the world
#[derive(Debug, Clone)]
struct Collider {
    body: BodyHandle,
    shape: ColliderShape,
}

/// Reference kinematic scene implementing [`PhysicsBackend`].
///
/// Bodies are moved only by teleports and drives; there are no forces and
/// no impulses. Each [`step`](PhysicsWorld::step) applies pending drives and
/// then recomputes which colliders touch which bodies, emitting a `Begin` or
/// `End` event whenever a (collider, body) pair changes.
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    /// All rigid bodies in the world
    bodies: HandleStorage<BodyHandle, RigidBody>,

    /// All colliders in the world
    colliders: HandleStorage<ColliderHandle, Collider>,

    /// Collider pairs with collision disabled, stored with the smaller handle first
    ignored_pairs: BTreeSet<(ColliderHandle, ColliderHandle)>,

    /// The layer ignore-matrix
    layers: LayerMatrix,

    /// (collider, other body) pairs touching after the last step
    contacts: BTreeSet<(ColliderHandle, BodyHandle)>,

    /// Queue of contact events
    events: EventQueue,

    /// The total elapsed simulation time
    time: f32,
}

fn ordered(a: ColliderHandle, b: ColliderHandle) -> (ColliderHandle, ColliderHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl PhysicsWorld {
    /// Creates an empty world with the built-in layer names
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulation time
    pub fn get_time(&self) -> f32 {
        self.time
    }

    /// Gets a reference to a rigid body by its handle
    pub fn get_body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get_or_err(handle)
    }

    /// Returns the number of bodies in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Applies pending drives and refreshes contacts
    pub fn step(&mut self, dt: f32) -> Result<()> {
        if dt <= 0.0 {
            return Err(HandsError::InvalidParameter(format!("dt must be positive, got {}", dt)));
        }

        for (_, body) in self.bodies.iter_mut() {
            if let Some(drive) = body.drive.take() {
                let transform = &mut body.desc.transform;
                let t = drive.strength.clamp(0.0, 1.0);
                transform.position = transform.position.lerp(&drive.target.translation.vector, t);
                transform.rotation = transform
                    .rotation
                    .try_slerp(&drive.target.rotation, t, 1.0e-6)
                    .unwrap_or(drive.target.rotation);
            }
        }

        self.detect_contacts();
        self.time += dt;
        Ok(())
    }

    /// Returns whether two colliders would currently generate contacts
    fn pair_enabled(&self, a: ColliderHandle, ca: &Collider, b: ColliderHandle, cb: &Collider) -> bool {
        if ca.body == cb.body || self.ignored_pairs.contains(&ordered(a, b)) {
            return false;
        }
        let (Some(ba), Some(bb)) = (self.bodies.get(ca.body), self.bodies.get(cb.body)) else {
            return false;
        };
        if ba.get_body_type() == RigidBodyType::Static && bb.get_body_type() == RigidBodyType::Static {
            return false;
        }
        self.layers.collides(ba.get_layer(), bb.get_layer())
    }

    fn world_shape(&self, collider: &Collider) -> Option<WorldShape> {
        let body = self.bodies.get(collider.body)?;
        Some(collider.shape.to_world(&body.get_transform()))
    }

    fn detect_contacts(&mut self) {
        let resolved: Vec<(ColliderHandle, &Collider, WorldShape)> = self
            .colliders
            .iter()
            .filter_map(|(h, c)| self.world_shape(c).map(|s| (h, c, s)))
            .collect();

        let mut current = BTreeSet::new();
        for (i, (ha, ca, sa)) in resolved.iter().enumerate() {
            for (hb, cb, sb) in resolved.iter().skip(i + 1) {
                if self.pair_enabled(*ha, ca, *hb, cb) && overlaps(sa, sb) {
                    current.insert((*ha, cb.body));
                    current.insert((*hb, ca.body));
                }
            }
        }

        for &(collider, other_body) in current.difference(&self.contacts) {
            if let Some(c) = self.colliders.get(collider) {
                self.events.add_contact_event(ContactEvent {
                    event_type: ContactEventType::Begin,
                    collider,
                    collider_body: c.body,
                    other_body,
                });
            }
        }
        for &(collider, other_body) in self.contacts.difference(&current) {
            if let Some(c) = self.colliders.get(collider) {
                self.events.add_contact_event(ContactEvent {
                    event_type: ContactEventType::End,
                    collider,
                    collider_body: c.body,
                    other_body,
                });
            }
        }

        self.contacts = current;
    }

    fn body_mut(&mut self, body: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies.get_mut_or_err(body)
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn create_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        let shapes = desc.colliders.clone();
        let handle = self.bodies.add(RigidBody::new(desc));
        let colliders: Vec<ColliderHandle> = shapes
            .into_iter()
            .map(|shape| self.colliders.add(Collider { body: handle, shape }))
            .collect();
        if let Some(body) = self.bodies.get_mut(handle) {
            body.colliders = colliders;
        }
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(removed) = self.bodies.remove(body) else {
            return false;
        };

        // Close out every contact the body took part in
        let stale: Vec<(ColliderHandle, BodyHandle)> = self
            .contacts
            .iter()
            .filter(|(c, other)| *other == body || removed.colliders.contains(c))
            .copied()
            .collect();
        for (collider, other_body) in stale {
            self.contacts.remove(&(collider, other_body));
            let collider_body = self.colliders.get(collider).map(|c| c.body).unwrap_or(body);
            self.events.add_contact_event(ContactEvent {
                event_type: ContactEventType::End,
                collider,
                collider_body,
                other_body,
            });
        }

        for collider in &removed.colliders {
            self.colliders.remove(*collider);
        }
        self.ignored_pairs
            .retain(|(a, b)| !removed.colliders.contains(a) && !removed.colliders.contains(b));
        true
    }

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.bodies.get(body).is_some()
    }

    fn body_type(&self, body: BodyHandle) -> Option<RigidBodyType> {
        self.bodies.get(body).map(|b| b.get_body_type())
    }

    fn body_transform(&self, body: BodyHandle) -> Option<Transform> {
        self.bodies.get(body).map(|b| b.get_transform())
    }

    fn teleport_body(&mut self, body: BodyHandle, pose: &Isometry) -> Result<()> {
        let body = self.body_mut(body)?;
        body.desc.transform.position = pose.translation.vector;
        body.desc.transform.rotation = pose.rotation;
        body.drive = None;
        Ok(())
    }

    fn drive_body(&mut self, body: BodyHandle, target: &Isometry, strength: f32) -> Result<()> {
        if !strength.is_finite() || strength <= 0.0 {
            return Err(HandsError::InvalidParameter(format!(
                "drive strength must be positive, got {}",
                strength
            )));
        }
        let body = self.body_mut(body)?;
        body.drive = Some(Drive {
            target: *target,
            strength: strength.min(1.0),
        });
        Ok(())
    }

    fn set_body_layer(&mut self, body: BodyHandle, layer: u8) -> Result<()> {
        if layer >= crate::collision::LAYER_COUNT {
            return Err(HandsError::InvalidLayer(layer));
        }
        self.body_mut(body)?.desc.layer = layer;
        Ok(())
    }

    fn body_layer(&self, body: BodyHandle) -> Option<u8> {
        self.bodies.get(body).map(|b| b.get_layer())
    }

    fn body_colliders(&self, body: BodyHandle) -> Vec<ColliderHandle> {
        self.bodies
            .get(body)
            .map(|b| b.get_colliders().to_vec())
            .unwrap_or_default()
    }

    fn collider_body(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        self.colliders.get(collider).map(|c| c.body)
    }

    fn collider_shape(&self, collider: ColliderHandle) -> Option<WorldShape> {
        self.colliders.get(collider).and_then(|c| self.world_shape(c))
    }

    fn ignore_collision(&mut self, a: ColliderHandle, b: ColliderHandle, ignore: bool) {
        if ignore {
            self.ignored_pairs.insert(ordered(a, b));
        } else {
            self.ignored_pairs.remove(&ordered(a, b));
        }
    }

    fn is_collision_ignored(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        self.ignored_pairs.contains(&ordered(a, b))
    }

    fn overlap(&self, shape: &WorldShape, mask: LayerMask) -> Vec<ColliderHandle> {
        self.colliders
            .iter()
            .filter(|(_, c)| {
                self.bodies
                    .get(c.body)
                    .map_or(false, |b| mask.has_layer(b.get_layer()))
            })
            .filter_map(|(h, c)| self.world_shape(c).map(|s| (h, s)))
            .filter(|(_, s)| overlaps(shape, s))
            .map(|(h, _)| h)
            .collect()
    }

    fn raycast(&self, origin: &Vector3, direction: &Vector3, max_distance: f32, mask: LayerMask) -> Vec<RayHit> {
        let Some(direction) = direction.try_normalize(1.0e-9) else {
            return Vec::new();
        };

        let mut hits: Vec<RayHit> = self
            .colliders
            .iter()
            .filter_map(|(h, c)| {
                let body = self.bodies.get(c.body)?;
                if !mask.has_layer(body.get_layer()) {
                    return None;
                }
                let shape = self.world_shape(c)?;
                ray_distance(origin, &direction, max_distance, &shape).map(|distance| RayHit {
                    collider: h,
                    body: c.body,
                    distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn joint_position(&self, body: BodyHandle) -> Option<f32> {
        let child = self.bodies.get(body)?;
        let parent = self.bodies.get(child.get_parent()?)?;
        let relative = parent.get_transform().rotation.inverse() * child.get_transform().rotation;
        // Twist of the relative rotation around the joint's local X axis
        let q = relative.quaternion();
        let angle = 2.0 * q.i.atan2(q.w);
        let angle = if angle > std::f32::consts::PI {
            angle - 2.0 * std::f32::consts::PI
        } else if angle < -std::f32::consts::PI {
            angle + 2.0 * std::f32::consts::PI
        } else {
            angle
        };
        Some(to_degrees(angle))
    }

    fn layers(&self) -> &LayerMatrix {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut LayerMatrix {
        &mut self.layers
    }

    fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        self.events.drain()
    }
}
