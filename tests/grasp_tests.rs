use std::sync::Arc;

use approx::assert_relative_eq;
use phys_hands::bodies::RigidBodyDesc;
use phys_hands::core::{BodyHandle, HandsConfig, PhysicsBackend, PhysicsWorld};
use phys_hands::grasp::{GrabConfig, GraspRegistry, GraspState, GraspStateMachine, GraspUpdate};
use phys_hands::hands::{DataDriven, HandLayers, SimHand, PALM_FINGER};
use phys_hands::math::{Isometry, Vector3};
use phys_hands::shapes::Sphere;
use phys_hands::tracking::{test_hand_at, Chirality, HandPose, HandSignals};
use rand::{rngs::StdRng, Rng, SeedableRng};

const DT: f32 = 0.02;

/// A data-driven hand with its grasp machine
struct TestHand {
    hand: SimHand,
    grasp: GraspStateMachine,
    pose: HandPose,
}

impl TestHand {
    fn new(chirality: Chirality, position: Vector3, world: &mut PhysicsWorld) -> Self {
        let pose = test_hand_at(chirality, position);
        let mut hand = SimHand::new(chirality, Arc::new(DataDriven), HandLayers::default());
        hand.generate(&pose, &HandsConfig::default(), world);
        hand.update_from_tracked_pose(&pose, true, &HandsConfig::default(), world);
        Self {
            hand,
            grasp: GraspStateMachine::new(chirality, GrabConfig::default()),
            pose,
        }
    }

    fn touch(&mut self, body: BodyHandle, bones: &[(usize, usize)]) {
        for &(finger, joint) in bones {
            self.hand.bone_mut(finger, joint).unwrap().add_contacting(body);
        }
    }

    fn untouch(&mut self, body: BodyHandle, bones: &[(usize, usize)]) {
        for &(finger, joint) in bones {
            self.hand.bone_mut(finger, joint).unwrap().remove_contacting(body);
        }
    }

    fn signals(&mut self, signals: HandSignals, world: &mut PhysicsWorld) {
        let pose = self.pose.with_signals(signals);
        self.hand.update_from_tracked_pose(&pose, true, &HandsConfig::default(), world);
    }

    fn step(&mut self, registry: &mut GraspRegistry, world: &PhysicsWorld) -> GraspUpdate {
        self.grasp.evaluate(&mut self.hand, registry, DT, world)
    }
}

fn strong() -> HandSignals {
    HandSignals {
        pinch_distance: 0.02,
        finger_strength: [0.5; 5],
        fist_strength: 0.5,
    }
}

fn weak_fingers() -> HandSignals {
    HandSignals {
        finger_strength: [0.5, 0.01, 0.01, 0.01, 0.01],
        ..strong()
    }
}

fn add_ball(world: &mut PhysicsWorld, position: Vector3) -> BodyHandle {
    world.create_body(RigidBodyDesc::new_dynamic(Sphere::new(0.03), position))
}

const PALM_AND_INDEX: [(usize, usize); 2] = [(PALM_FINGER, 0), (1, 1)];

#[test]
fn test_full_cycle() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.signals(strong(), &mut world);

    assert_eq!(left.grasp.state(), GraspState::Idle);
    assert_eq!(left.step(&mut registry, &world), GraspUpdate::default());
    assert_eq!(left.grasp.state(), GraspState::Idle);

    left.touch(ball, &PALM_AND_INDEX);

    // Two steps of contact, the third one grabs
    for _ in 0..2 {
        let update = left.step(&mut registry, &world);
        assert_eq!(update.grabbed, None);
        assert_eq!(left.grasp.state(), GraspState::Contact);
    }
    let update = left.step(&mut registry, &world);
    assert_eq!(update.grabbed, Some(ball));
    assert_eq!(left.grasp.state(), GraspState::Grab);
    assert_eq!(left.grasp.grabbed_body(), Some(ball));
    assert_eq!(registry.owner(ball), Some(Chirality::Left));
    assert!(left.hand.bone(PALM_FINGER, 0).unwrap().grasping().contains(&ball));
    assert!(left.hand.bone(1, 1).unwrap().grasping().contains(&ball));
    assert!(left.hand.is_grasping());

    let values = left.grasp.grab_values().unwrap();
    assert_eq!(values.grasping_channels, [false, true, false, false, false, true]);
    assert_relative_eq!(values.offset, Vector3::new(0.0, -0.04, 0.02), epsilon = 1.0e-6);

    // Fingers open below their exit thresholds
    left.signals(weak_fingers(), &mut world);
    let update = left.step(&mut registry, &world);
    assert_eq!(update.released, Some(ball));
    assert_eq!(left.grasp.state(), GraspState::Contact);
    assert!(registry.is_empty());
    assert!(!left.hand.is_grasping());

    // Contact lingers for the cooldown after the bones let go
    left.untouch(ball, &PALM_AND_INDEX);
    left.step(&mut registry, &world);
    assert_eq!(left.grasp.state(), GraspState::Contact);
    assert!(left.grasp.is_bone_counted(ball, 1, 1));
    left.step(&mut registry, &world);
    assert_eq!(left.grasp.state(), GraspState::Contact);
    left.step(&mut registry, &world);
    assert_eq!(left.grasp.state(), GraspState::Idle);
    assert!(left.grasp.candidate_bodies().is_empty());
}

#[test]
fn test_thumb_and_index_cycle() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.01, -0.03, 0.05));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    let grip = |thumb: f32| HandSignals {
        pinch_distance: 0.02,
        finger_strength: [thumb, 0.5, 0.0, 0.0, 0.0],
        fist_strength: 0.0,
    };
    left.signals(grip(0.5), &mut world);

    let thumb_and_index = [(0, 1), (1, 1)];
    left.touch(ball, &thumb_and_index);
    for _ in 0..2 {
        assert_eq!(left.step(&mut registry, &world).grabbed, None);
        assert_eq!(left.grasp.state(), GraspState::Contact);
    }
    assert_eq!(left.step(&mut registry, &world).grabbed, Some(ball));
    assert_eq!(left.grasp.state(), GraspState::Grab);
    assert_eq!(registry.owner(ball), Some(Chirality::Left));
    assert!(left.hand.bone(0, 1).unwrap().grasping().contains(&ball));

    let values = left.grasp.grab_values().unwrap();
    assert_eq!(values.grasping_channels, [true, true, false, false, false, false]);
    assert_relative_eq!(values.offset, Vector3::new(0.01, -0.03, 0.05), epsilon = 1.0e-6);

    // Still above the thumb's exit threshold
    left.signals(grip(0.12), &mut world);
    assert_eq!(left.step(&mut registry, &world).released, None);

    left.signals(grip(0.05), &mut world);
    assert_eq!(left.step(&mut registry, &world).released, Some(ball));
    assert_eq!(left.grasp.state(), GraspState::Contact);
    assert!(registry.is_empty());

    left.untouch(ball, &thumb_and_index);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Idle);
}

#[test]
fn test_contact_needs_an_anchor() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.signals(strong(), &mut world);

    left.touch(ball, &[(1, 1), (2, 2)]);
    for _ in 0..10 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Idle);

    // The first index joint alone does not qualify either
    let other = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.05));
    left.touch(other, &[(PALM_FINGER, 0), (1, 0)]);
    for _ in 0..10 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Idle);
}

#[test]
fn test_grab_needs_consecutive_steps() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &PALM_AND_INDEX);

    left.signals(strong(), &mut world);
    left.step(&mut registry, &world);
    left.step(&mut registry, &world);

    // Index strength between exit and entry breaks the streak
    left.signals(
        HandSignals {
            finger_strength: [0.5, 0.2, 0.5, 0.5, 0.5],
            ..strong()
        },
        &mut world,
    );
    left.step(&mut registry, &world);
    assert_eq!(left.grasp.state(), GraspState::Contact);

    left.signals(strong(), &mut world);
    left.step(&mut registry, &world);
    left.step(&mut registry, &world);
    assert_eq!(left.grasp.state(), GraspState::Contact);
    left.step(&mut registry, &world);
    assert_eq!(left.grasp.state(), GraspState::Grab);
}

#[test]
fn test_strengths_inside_hysteresis_band_do_not_chatter() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &PALM_AND_INDEX);
    let mut rng = StdRng::seed_from_u64(42);

    // Between contact and grab entry: never grabs
    for _ in 0..200 {
        let index = rng.gen_range(0.15..0.24);
        left.signals(
            HandSignals {
                finger_strength: [0.5, index, 0.5, 0.5, 0.5],
                ..strong()
            },
            &mut world,
        );
        let update = left.step(&mut registry, &world);
        assert_eq!(update.grabbed, None);
        assert_eq!(left.grasp.state(), GraspState::Contact);
    }

    left.signals(strong(), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Grab);

    // Above exit: never lets go
    for _ in 0..200 {
        let index = rng.gen_range(0.06..0.24);
        let fist = rng.gen_range(0.06..0.09);
        left.signals(
            HandSignals {
                finger_strength: [0.5, index, 0.5, 0.5, 0.5],
                fist_strength: fist,
                ..strong()
            },
            &mut world,
        );
        let update = left.step(&mut registry, &world);
        assert_eq!(update.released, None);
        assert_eq!(left.grasp.state(), GraspState::Grab);
    }
}

#[test]
fn test_palm_opening_releases() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &PALM_AND_INDEX);
    left.signals(strong(), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Grab);

    left.signals(
        HandSignals {
            fist_strength: 0.01,
            ..strong()
        },
        &mut world,
    );
    assert_eq!(left.step(&mut registry, &world).released, Some(ball));
}

#[test]
fn test_pinch_opening_releases_thumb_grab() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.08));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &[(0, 2), (1, 2)]);

    let pinch = |distance: f32| HandSignals {
        pinch_distance: distance,
        finger_strength: [0.5, 0.5, 0.0, 0.0, 0.0],
        fist_strength: 0.0,
    };

    left.signals(pinch(0.02), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Grab);
    let values = left.grasp.grab_values().unwrap();
    assert_eq!(values.grasping_channels, [true, true, false, false, false, false]);
    assert_relative_eq!(values.entry_pinch_distance, 0.02);

    // Wider than the required distance, but opened by only 0.01 since the grab
    left.signals(pinch(0.03), &mut world);
    assert_eq!(left.step(&mut registry, &world).released, None);

    left.signals(pinch(0.045), &mut world);
    assert_eq!(left.step(&mut registry, &world).released, Some(ball));
}

#[test]
fn test_carry_keeps_offset_to_palm() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.01, -0.04, 0.03));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &PALM_AND_INDEX);
    left.signals(strong(), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }

    let (body, pose) = left.step(&mut registry, &world).carry.unwrap();
    assert_eq!(body, ball);
    assert_relative_eq!(pose.translation.vector, Vector3::new(0.01, -0.04, 0.03), epsilon = 1.0e-6);

    left.pose = test_hand_at(Chirality::Left, Vector3::new(0.1, 0.2, 0.0));
    left.signals(strong(), &mut world);
    let (_, pose) = left.step(&mut registry, &world).carry.unwrap();
    assert_relative_eq!(pose.translation.vector, Vector3::new(0.11, 0.16, 0.03), epsilon = 1.0e-6);

    let rotated = left.grasp.grab_values().unwrap().carry_pose(&Isometry::rotation(Vector3::y() * std::f32::consts::PI));
    assert_relative_eq!(rotated.translation.vector, Vector3::new(-0.01, -0.04, -0.03), epsilon = 1.0e-6);
}

#[test]
fn test_removed_body_is_released() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &PALM_AND_INDEX);
    left.signals(strong(), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }

    world.remove_body(ball);
    assert_eq!(left.step(&mut registry, &world).released, Some(ball));
    assert!(registry.is_empty());
}

#[test]
fn test_force_release() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(ball, &PALM_AND_INDEX);
    left.signals(strong(), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }

    assert_eq!(left.grasp.force_release(&mut left.hand, &mut registry), Some(ball));
    assert_eq!(left.grasp.state(), GraspState::Idle);
    assert!(left.grasp.candidate_bodies().is_empty());
    assert!(registry.is_empty());
    assert!(!left.hand.is_grasping());
    assert_eq!(left.grasp.force_release(&mut left.hand, &mut registry), None);
}

#[test]
fn test_other_hand_takes_over_after_release() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let ball = add_ball(&mut world, Vector3::new(0.15, -0.04, 0.02));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    let mut right = TestHand::new(Chirality::Right, Vector3::new(0.3, 0.0, 0.0), &mut world);
    left.touch(ball, &PALM_AND_INDEX);
    right.touch(ball, &PALM_AND_INDEX);
    left.signals(strong(), &mut world);
    right.signals(strong(), &mut world);

    for _ in 0..10 {
        left.step(&mut registry, &world);
        right.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.state(), GraspState::Grab);
    assert_eq!(right.grasp.state(), GraspState::Contact);
    assert_eq!(registry.owner(ball), Some(Chirality::Left));

    // Left lets go first in the step, so right grabs in the same step
    left.signals(weak_fingers(), &mut world);
    assert_eq!(left.step(&mut registry, &world).released, Some(ball));
    assert_eq!(right.step(&mut registry, &world).grabbed, Some(ball));
    assert_eq!(registry.owner(ball), Some(Chirality::Right));
}

#[test]
fn test_lowest_handle_wins() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let first = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.02));
    let second = add_ball(&mut world, Vector3::new(0.0, -0.04, 0.04));
    let mut left = TestHand::new(Chirality::Left, Vector3::zeros(), &mut world);
    left.touch(second, &PALM_AND_INDEX);
    left.touch(first, &PALM_AND_INDEX);
    left.signals(strong(), &mut world);
    for _ in 0..3 {
        left.step(&mut registry, &world);
    }
    assert_eq!(left.grasp.grabbed_body(), Some(first.min(second)));
}

#[test]
fn test_grasps_stay_exclusive_under_random_input() {
    let mut world = PhysicsWorld::new();
    let mut registry = GraspRegistry::new();
    let balls = [
        add_ball(&mut world, Vector3::new(0.15, -0.04, 0.02)),
        add_ball(&mut world, Vector3::new(0.15, -0.04, 0.06)),
    ];
    let mut hands = [
        TestHand::new(Chirality::Left, Vector3::zeros(), &mut world),
        TestHand::new(Chirality::Right, Vector3::new(0.3, 0.0, 0.0), &mut world),
    ];
    let bones = [(PALM_FINGER, 0), (0, 1), (1, 1), (2, 2), (3, 2)];
    let mut rng = StdRng::seed_from_u64(1234);

    for _ in 0..2000 {
        for hand in hands.iter_mut() {
            for &ball in &balls {
                for &bone in &bones {
                    if rng.gen_bool(0.1) {
                        if rng.gen_bool(0.6) {
                            hand.touch(ball, &[bone]);
                        } else {
                            hand.untouch(ball, &[bone]);
                        }
                    }
                }
            }
            let signals = HandSignals {
                pinch_distance: rng.gen_range(0.0..0.06),
                finger_strength: [rng.gen(), rng.gen(), rng.gen(), rng.gen(), rng.gen()],
                fist_strength: rng.gen(),
            };
            hand.signals(signals, &mut world);
        }

        for hand in hands.iter_mut() {
            hand.step(&mut registry, &world);
        }

        let held: Vec<(Chirality, BodyHandle)> = hands
            .iter()
            .filter_map(|h| h.grasp.grabbed_body().map(|b| (h.grasp.get_chirality(), b)))
            .collect();
        if let &[(_, a), (_, b)] = held.as_slice() {
            assert_ne!(a, b);
        }
        for (chirality, body) in &held {
            assert_eq!(registry.owner(*body), Some(*chirality));
        }
        assert_eq!(registry.len(), held.len());
        for hand in &hands {
            assert_eq!(hand.grasp.state() == GraspState::Grab, hand.grasp.grabbed_body().is_some());
        }
    }
}

#[test]
fn test_grab_config_validation() {
    assert!(GrabConfig::default().validate().is_ok());

    let mut config = GrabConfig::default();
    config.exit[2] = config.grab_entry[2];
    assert!(config.validate().is_err());

    let mut config = GrabConfig::default();
    config.contact_entry[0] = 1.5;
    assert!(config.validate().is_err());

    let config = GrabConfig {
        grab_entry_steps: 0,
        ..GrabConfig::default()
    };
    assert!(config.validate().is_err());

    let config = GrabConfig {
        required_pinch_distance: 0.0,
        ..GrabConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_registry() {
    let mut registry = GraspRegistry::new();
    let a = BodyHandle::from_raw(1);
    let b = BodyHandle::from_raw(2);

    assert!(registry.claim(a, Chirality::Left));
    assert!(registry.claim(a, Chirality::Left));
    assert!(!registry.claim(a, Chirality::Right));
    assert!(registry.is_owned_by_other(a, Chirality::Right));
    assert!(!registry.release(a, Chirality::Right));
    assert!(registry.claim(b, Chirality::Left));
    assert_eq!(registry.bodies_of(Chirality::Left), vec![a, b]);

    registry.release_hand(Chirality::Left);
    assert!(registry.is_empty());
    assert!(registry.claim(a, Chirality::Right));
}
