use std::sync::Arc;

use approx::assert_relative_eq;
use phys_hands::bodies::RigidBodyDesc;
use phys_hands::collision::{LayerConfig, LAYER_COUNT};
use phys_hands::core::{BodyHandle, HandsConfig, PhysicsBackend, PhysicsWorld};
use phys_hands::grasp::{GrabConfig, GraspState};
use phys_hands::hands::{DataDriven, PhysicsDriven, SimulationStrategy, PALM_FINGER};
use phys_hands::math::Vector3;
use phys_hands::provider::{HandsProvider, Tick};
use phys_hands::shapes::Sphere;
use phys_hands::tracking::{test_hand_at, Chirality, Frame, HandPose, HandSignals};

const DT: f32 = 0.02;
const FIXED: Tick = Tick::Fixed { dt: DT };

fn provider(strategy: Arc<dyn SimulationStrategy>) -> HandsProvider {
    HandsProvider::new(HandsConfig::default(), GrabConfig::default(), LayerConfig::default(), strategy)
}

fn left_at(position: Vector3) -> HandPose {
    test_hand_at(Chirality::Left, position)
}

fn strong() -> HandSignals {
    HandSignals {
        pinch_distance: 0.02,
        finger_strength: [0.5; 5],
        fist_strength: 0.5,
    }
}

/// Runs one fixed step for a frame and returns what was published
fn fixed(provider: &mut HandsProvider, world: &mut PhysicsWorld, id: i64, hands: Vec<HandPose>) -> Frame {
    let mut frame = Frame::new(id, hands);
    provider.process_frame(&mut frame, FIXED, world);
    frame
}

#[test]
fn test_hand_is_removed_until_ready() {
    let mut world = PhysicsWorld::new();
    let mut provider = provider(Arc::new(DataDriven));
    let pose = left_at(Vector3::new(0.0, 1.0, 0.0));

    // Hands are only created on the fixed cadence
    let mut frame = Frame::new(1, vec![pose]);
    provider.process_frame(&mut frame, Tick::Update, &mut world);
    assert!(frame.hands.is_empty());
    assert!(provider.hand(Chirality::Left).is_none());

    let frame = fixed(&mut provider, &mut world, 1, vec![pose]);
    assert_eq!(frame.hand(Chirality::Left), Some(&pose));
    assert!(provider.hand(Chirality::Left).unwrap().is_ready());
    assert!(provider.hand(Chirality::Right).is_none());
}

#[test]
fn test_stale_frames_are_written_back_unchanged() {
    let mut world = PhysicsWorld::new();
    let mut provider = provider(Arc::new(DataDriven));
    let first = left_at(Vector3::new(0.0, 1.0, 0.0));
    let moved = left_at(Vector3::new(0.2, 1.0, 0.0));

    fixed(&mut provider, &mut world, 5, vec![first]);

    // Same and older ids are ignored on the fixed cadence
    for id in [5, 4] {
        let frame = fixed(&mut provider, &mut world, id, vec![moved]);
        assert_relative_eq!(frame.hand(Chirality::Left).unwrap().palm_position, first.palm_position);
    }

    // The update cadence keeps its own id
    let mut frame = Frame::new(5, vec![moved]);
    provider.process_frame(&mut frame, Tick::Update, &mut world);
    assert_relative_eq!(
        provider.hand(Chirality::Left).unwrap().get_data_hand().unwrap().palm_position,
        moved.palm_position
    );
    let mut frame = Frame::new(5, vec![first]);
    provider.process_frame(&mut frame, Tick::Update, &mut world);
    assert_relative_eq!(
        provider.hand(Chirality::Left).unwrap().get_data_hand().unwrap().palm_position,
        moved.palm_position
    );

    let frame = fixed(&mut provider, &mut world, 6, vec![moved]);
    assert_relative_eq!(frame.hand(Chirality::Left).unwrap().palm_position, moved.palm_position);
}

#[test]
fn test_simulated_hand_overwrites_frame() {
    let mut world = PhysicsWorld::new();
    let mut provider = provider(Arc::new(PhysicsDriven));
    let start = left_at(Vector3::new(0.0, 1.0, 0.0));
    let moved = left_at(Vector3::new(0.03, 1.0, 0.0));

    let frame = fixed(&mut provider, &mut world, 1, vec![start]);
    assert_relative_eq!(frame.hand(Chirality::Left).unwrap().palm_position, start.palm_position, epsilon = 1.0e-5);
    world.step(DT).unwrap();

    // The bodies have not moved yet, so the frame carries the old palm
    let frame = fixed(&mut provider, &mut world, 2, vec![moved]);
    assert_relative_eq!(frame.hand(Chirality::Left).unwrap().palm_position, start.palm_position, epsilon = 1.0e-5);
    world.step(DT).unwrap();

    let frame = fixed(&mut provider, &mut world, 3, vec![moved]);
    assert_relative_eq!(frame.hand(Chirality::Left).unwrap().palm_position, moved.palm_position, epsilon = 1.0e-5);
}

#[test]
fn test_lost_hand_is_destroyed_after_grace() {
    let mut world = PhysicsWorld::new();
    let config = HandsConfig {
        lost_tracking_grace: 0.5,
        ..HandsConfig::default()
    };
    let mut provider = HandsProvider::new(config, GrabConfig::default(), LayerConfig::default(), Arc::new(PhysicsDriven));
    let pose = left_at(Vector3::new(0.0, 1.0, 0.0));

    fixed(&mut provider, &mut world, 1, vec![pose]);
    assert_eq!(world.body_count(), 16);

    let lost = Tick::Fixed { dt: 0.1 };
    for id in 2..6 {
        let mut frame = Frame::new(id, Vec::new());
        provider.process_frame(&mut frame, lost, &mut world);
        // A ready hand is never added back to a frame that lacks it
        assert!(frame.hands.is_empty());
    }
    assert!(provider.hand(Chirality::Left).is_some());

    for id in 6..8 {
        let mut frame = Frame::new(id, Vec::new());
        provider.process_frame(&mut frame, lost, &mut world);
    }
    assert!(provider.hand(Chirality::Left).is_none());
    assert_eq!(world.body_count(), 0);

    // Tracking coming back builds a new hand
    fixed(&mut provider, &mut world, 8, vec![pose]);
    assert!(provider.hand(Chirality::Left).is_some());
    assert_eq!(world.body_count(), 16);
}

#[test]
fn test_hand_returning_within_grace_is_kept() {
    let mut world = PhysicsWorld::new();
    let mut provider = provider(Arc::new(PhysicsDriven));
    let pose = left_at(Vector3::new(0.0, 1.0, 0.0));

    fixed(&mut provider, &mut world, 1, vec![pose]);
    let palm = provider.hand(Chirality::Left).unwrap().bone(PALM_FINGER, 0).unwrap().body_handle();

    fixed(&mut provider, &mut world, 2, Vec::new());
    fixed(&mut provider, &mut world, 3, vec![pose]);
    let hand = provider.hand(Chirality::Left).unwrap();
    assert_eq!(hand.bone(PALM_FINGER, 0).unwrap().body_handle(), palm);
    assert_eq!(world.body_count(), 16);
}

/// Left hand placed, reset and back on its active layer
fn settled(world: &mut PhysicsWorld, pose: &HandPose) -> HandsProvider {
    let mut provider = provider(Arc::new(PhysicsDriven));
    provider.initialize(world).unwrap();
    fixed(&mut provider, world, 1, vec![*pose]);
    world.step(DT).unwrap();
    fixed(&mut provider, world, 2, vec![*pose]);
    assert!(!provider.hand(Chirality::Left).unwrap().is_ghosted());
    provider
}

#[test]
fn test_contacts_are_routed_for_dynamic_bodies_only() {
    let mut world = PhysicsWorld::new();
    let pose = left_at(Vector3::zeros());
    let mut provider = settled(&mut world, &pose);

    // Index on the left hand runs along +Z at x = 0.024, middle at x = 0.004
    let dynamic = world.create_body(RigidBodyDesc::new_dynamic(Sphere::new(0.005), Vector3::new(0.024, -0.005, 0.09)));
    let fixed_ball = world.create_body(RigidBodyDesc::new_static(Sphere::new(0.005), Vector3::new(0.004, -0.005, 0.09)));
    world.step(DT).unwrap();
    fixed(&mut provider, &mut world, 3, vec![pose]);

    let hand = provider.hand(Chirality::Left).unwrap();
    assert!(hand.bone(1, 1).unwrap().contacting().contains(&dynamic));
    assert!(!hand.bone(2, 1).unwrap().contacting().contains(&fixed_ball));

    // Contact ends once the body leaves
    world.remove_body(dynamic);
    world.step(DT).unwrap();
    fixed(&mut provider, &mut world, 4, vec![pose]);
    let hand = provider.hand(Chirality::Left).unwrap();
    assert!(!hand.bone(1, 1).unwrap().is_contacting());
}

#[test]
fn test_grab_carry_and_release_through_frames() {
    let mut world = PhysicsWorld::new();
    let pose = left_at(Vector3::zeros()).with_signals(strong());
    let mut provider = settled(&mut world, &pose);

    // Touches the palm and the first two index joints
    let ball = world.create_body(RigidBodyDesc::new_dynamic(Sphere::new(0.03), Vector3::new(0.024, -0.02, 0.06)));
    let mut id = 3;
    for _ in 0..3 {
        world.step(DT).unwrap();
        fixed(&mut provider, &mut world, id, vec![pose]);
        id += 1;
    }
    assert_eq!(provider.grasp_state(Chirality::Left), Some(GraspState::Grab));
    assert_eq!(provider.registry().owner(ball), Some(Chirality::Left));

    // The held ball follows the hand
    let moved = left_at(Vector3::new(0.02, 0.0, 0.0)).with_signals(strong());
    for _ in 0..3 {
        world.step(DT).unwrap();
        fixed(&mut provider, &mut world, id, vec![moved]);
        id += 1;
    }
    world.step(DT).unwrap();
    assert_relative_eq!(
        world.body_transform(ball).unwrap().position,
        Vector3::new(0.044, -0.02, 0.06),
        epsilon = 1.0e-4
    );

    let open = moved.with_signals(HandSignals {
        finger_strength: [0.5, 0.0, 0.0, 0.0, 0.0],
        ..strong()
    });
    fixed(&mut provider, &mut world, id, vec![open]);
    assert_eq!(provider.grasp_state(Chirality::Left), Some(GraspState::Contact));
    assert!(provider.registry().is_empty());

    // The releasing hand ignores the ball for a while
    let hand = provider.hand(Chirality::Left).unwrap();
    let entry = hand.ignore_entry(ball).unwrap();
    assert_relative_eq!(entry.timeout, 0.08, epsilon = 1.0e-6);
    assert_relative_eq!(entry.radius, 0.005);
    let ball_collider = world.body_colliders(ball)[0];
    let index = hand.bone(1, 1).unwrap().colliders()[0];
    assert!(world.is_collision_ignored(index, ball_collider));
}

/// Left hand holding a ball after three steady frames, ids 1 to 5 used
fn holding(world: &mut PhysicsWorld, pose: &HandPose) -> (HandsProvider, BodyHandle) {
    let mut provider = settled(world, pose);
    let ball = world.create_body(RigidBodyDesc::new_dynamic(Sphere::new(0.03), Vector3::new(0.024, -0.02, 0.06)));
    for id in 3..6 {
        world.step(DT).unwrap();
        fixed(&mut provider, world, id, vec![*pose]);
    }
    assert_eq!(provider.registry().owner(ball), Some(Chirality::Left));
    (provider, ball)
}

#[test]
fn test_short_tracking_dropout_keeps_grab() {
    let mut world = PhysicsWorld::new();
    let pose = left_at(Vector3::zeros()).with_signals(strong());
    let (mut provider, ball) = holding(&mut world, &pose);

    world.step(DT).unwrap();
    let frame = fixed(&mut provider, &mut world, 6, Vec::new());
    assert!(frame.hands.is_empty());
    assert_eq!(provider.grasp_state(Chirality::Left), Some(GraspState::Grab));
    assert_eq!(provider.registry().owner(ball), Some(Chirality::Left));

    world.step(DT).unwrap();
    fixed(&mut provider, &mut world, 7, vec![pose]);
    assert_eq!(provider.grasp_state(Chirality::Left), Some(GraspState::Grab));
    assert_eq!(provider.registry().owner(ball), Some(Chirality::Left));
    assert!(provider.hand(Chirality::Left).unwrap().ignore_entry(ball).is_none());
}

#[test]
fn test_losing_tracking_releases_grab_after_grace() {
    let mut world = PhysicsWorld::new();
    let pose = left_at(Vector3::zeros()).with_signals(strong());
    let (mut provider, ball) = holding(&mut world, &pose);

    // 0.4 s of the 0.5 s grace
    let lost = Tick::Fixed { dt: 0.1 };
    for id in 6..10 {
        let mut frame = Frame::new(id, Vec::new());
        provider.process_frame(&mut frame, lost, &mut world);
    }
    assert_eq!(provider.registry().owner(ball), Some(Chirality::Left));

    for id in 10..12 {
        let mut frame = Frame::new(id, Vec::new());
        provider.process_frame(&mut frame, lost, &mut world);
    }
    assert!(provider.hand(Chirality::Left).is_none());
    assert!(provider.registry().is_empty());
    assert_eq!(world.body_count(), 1);
    assert!(world.contains_body(ball));
}

#[test]
fn test_shutdown_removes_hands() {
    let mut world = PhysicsWorld::new();
    let mut provider = provider(Arc::new(PhysicsDriven));
    let ball: BodyHandle = world.create_body(RigidBodyDesc::new_dynamic(Sphere::new(0.03), Vector3::new(1.0, 0.0, 0.0)));
    fixed(
        &mut provider,
        &mut world,
        1,
        vec![left_at(Vector3::zeros()), test_hand_at(Chirality::Right, Vector3::new(0.3, 0.0, 0.0))],
    );
    assert_eq!(world.body_count(), 33);

    provider.shutdown(&mut world);
    assert!(provider.hand(Chirality::Left).is_none());
    assert!(provider.hand(Chirality::Right).is_none());
    assert_eq!(world.body_count(), 1);
    assert!(world.contains_body(ball));

    // Frame ids start over after a shutdown
    let frame = fixed(&mut provider, &mut world, 1, vec![left_at(Vector3::zeros())]);
    assert!(frame.hand(Chirality::Left).is_some());
}

#[test]
fn test_initialize_generates_layers() {
    let mut world = PhysicsWorld::new();
    let mut provider = provider(Arc::new(PhysicsDriven));
    provider.initialize(&mut world).unwrap();

    let assignment = provider.get_layer_config().assignment().unwrap().clone();
    assert!(world.layers().is_ignored(assignment.hands_reset, 0));

    fixed(&mut provider, &mut world, 1, vec![left_at(Vector3::zeros())]);
    let hand = provider.hand(Chirality::Left).unwrap();
    assert_eq!(hand.get_layers().active, assignment.hands);
    assert_eq!(hand.get_layers().reset, assignment.hands_reset);
    assert_eq!(hand.get_layers().hover, assignment.hover_mask);
    assert_eq!(hand.get_layers().contact, assignment.contact_mask);
}

#[test]
fn test_initialize_survives_layer_exhaustion() {
    let mut world = PhysicsWorld::new();
    for layer in 8..LAYER_COUNT {
        world.layers_mut().set_name(layer, format!("Host {}", layer)).unwrap();
    }
    let mut provider = provider(Arc::new(PhysicsDriven));
    assert!(provider.initialize(&mut world).is_ok());
    assert!(!provider.get_layer_config().is_generated());

    // Hands still work, on the default layer
    let frame = fixed(&mut provider, &mut world, 1, vec![left_at(Vector3::zeros())]);
    assert!(frame.hand(Chirality::Left).is_some());
    assert_eq!(provider.hand(Chirality::Left).unwrap().get_layers().active, 0);
}

#[test]
fn test_initialize_rejects_invalid_config() {
    let mut world = PhysicsWorld::new();
    let config = HandsConfig {
        strength: 0.0,
        ..HandsConfig::default()
    };
    let mut provider = HandsProvider::new(config, GrabConfig::default(), LayerConfig::default(), Arc::new(DataDriven));
    assert!(provider.initialize(&mut world).is_err());

    let grab = GrabConfig {
        grab_entry_steps: 0,
        ..GrabConfig::default()
    };
    let mut provider = HandsProvider::new(HandsConfig::default(), grab, LayerConfig::default(), Arc::new(DataDriven));
    assert!(provider.initialize(&mut world).is_err());
}
