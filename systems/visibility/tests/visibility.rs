use glam::Vec2;
use nightwatch_core::{
    AngleConvention, ColliderShape, Command, DetectionSink, Event, GeometryQuery, LayerMask,
    MeshBuffer, RotationSense, TargetId, OBSTACLE_LAYER, TARGET_LAYER,
};
use nightwatch_system_visibility::{
    TargetPolicy, ViewConfig, Visibility, VisibilityPolygon, VisibleTargets,
};
use nightwatch_world::{apply, World};

#[derive(Default)]
struct CountingSink {
    notifications: u32,
}

impl DetectionSink for CountingSink {
    fn notify_detected(&mut self) {
        self.notifications += 1;
    }
}

fn spawn(world: &mut World, shape: ColliderShape, position: Vec2, layers: LayerMask) -> TargetId {
    let mut events = Vec::new();
    apply(
        world,
        Command::SpawnCollider {
            shape,
            position,
            layers,
        },
        &mut events,
    );
    match events.as_slice() {
        [Event::ColliderSpawned { target, .. }] => *target,
        other => panic!("unexpected events: {other:?}"),
    }
}

fn spawn_player(world: &mut World, position: Vec2) -> TargetId {
    spawn(
        world,
        ColliderShape::Circle { radius: 0.1 },
        position,
        TARGET_LAYER,
    )
}

fn spawn_wall(world: &mut World, position: Vec2) -> TargetId {
    spawn(
        world,
        ColliderShape::Box {
            half_extents: Vec2::splat(0.5),
        },
        position,
        OBSTACLE_LAYER,
    )
}

fn right_facing_config() -> ViewConfig {
    ViewConfig {
        view_radius: 5.0,
        view_angle: 90.0,
        convention: AngleConvention::RightZero,
        sense: RotationSense::CounterClockwise,
        ..ViewConfig::default()
    }
}

fn scan(
    world: &World,
    origin: Vec2,
    facing: f32,
    config: &ViewConfig,
    policy: TargetPolicy,
    sink: &mut CountingSink,
) -> VisibleTargets {
    let mut visibility = Visibility::new();
    let mut visible = VisibleTargets::new();
    let _ = visibility.scan_targets(
        origin,
        facing,
        config,
        policy,
        world,
        Some(sink as &mut dyn DetectionSink),
        &mut visible,
    );
    visible
}

#[test]
fn target_in_open_view_is_detected_once() {
    let mut world = World::new();
    let player = spawn_player(&mut world, Vec2::new(3.0, 0.0));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert_eq!(visible.iter().collect::<Vec<_>>(), vec![player]);
    assert_eq!(sink.notifications, 1, "exactly one notification per scan");
}

#[test]
fn occluded_target_is_not_detected() {
    let mut world = World::new();
    let _ = spawn_player(&mut world, Vec2::new(3.0, 0.0));
    let _ = spawn_wall(&mut world, Vec2::new(1.5, 0.0));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert!(visible.is_empty());
    assert_eq!(sink.notifications, 0);
}

fn up_facing_config() -> ViewConfig {
    ViewConfig {
        view_radius: 10.0,
        view_angle: 90.0,
        convention: AngleConvention::UpZero,
        sense: RotationSense::CounterClockwise,
        ..ViewConfig::default()
    }
}

#[test]
fn target_five_units_ahead_of_an_up_facing_agent_is_detected() {
    let mut world = World::new();
    let player = spawn_player(&mut world, Vec2::new(0.0, 5.0));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &up_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert_eq!(visible.iter().collect::<Vec<_>>(), vec![player]);
    assert_eq!(sink.notifications, 1);
}

#[test]
fn wall_between_an_up_facing_agent_and_its_target_hides_it() {
    let mut world = World::new();
    let _ = spawn_player(&mut world, Vec2::new(0.0, 5.0));
    let _ = spawn_wall(&mut world, Vec2::new(0.0, 2.5));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &up_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert!(visible.is_empty());
    assert_eq!(sink.notifications, 0);
}

#[test]
fn targets_outside_the_cone_or_radius_are_ignored() {
    let mut world = World::new();
    let _behind = spawn_player(&mut world, Vec2::new(-2.0, 0.0));
    let _outside_cone = spawn_player(&mut world, Vec2::new(2.0, 2.2));
    let _too_far = spawn_player(&mut world, Vec2::new(8.0, 0.0));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert!(visible.is_empty());
    assert_eq!(sink.notifications, 0);
}

#[test]
fn up_zero_convention_looks_along_positive_y() {
    let mut world = World::new();
    let above = spawn_player(&mut world, Vec2::new(0.0, 3.0));
    let _right = spawn_player(&mut world, Vec2::new(3.0, 0.0));
    let config = ViewConfig {
        convention: AngleConvention::UpZero,
        ..right_facing_config()
    };
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &config,
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert_eq!(visible.iter().collect::<Vec<_>>(), vec![above]);
}

#[test]
fn clockwise_sense_mirrors_the_facing() {
    let mut world = World::new();
    let below = spawn_player(&mut world, Vec2::new(0.0, -3.0));
    let config = ViewConfig {
        sense: RotationSense::Clockwise,
        ..right_facing_config()
    };
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        90.0,
        &config,
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert_eq!(visible.iter().collect::<Vec<_>>(), vec![below]);
}

#[test]
fn first_match_policy_stops_after_one_target() {
    let mut world = World::new();
    let first = spawn_player(&mut world, Vec2::new(2.0, 0.0));
    let _second = spawn_player(&mut world, Vec2::new(3.0, 0.5));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        TargetPolicy::FirstMatch,
        &mut sink,
    );

    assert_eq!(visible.iter().collect::<Vec<_>>(), vec![first]);
    assert_eq!(sink.notifications, 1);
}

#[test]
fn collect_all_policy_notifies_per_target() {
    let mut world = World::new();
    let _ = spawn_player(&mut world, Vec2::new(2.0, 0.0));
    let _ = spawn_player(&mut world, Vec2::new(3.0, 0.5));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert_eq!(visible.len(), 2);
    assert_eq!(sink.notifications, 2);
}

#[test]
fn zero_radius_and_zero_angle_see_nothing() {
    let mut world = World::new();
    let _ = spawn_player(&mut world, Vec2::new(2.0, 0.0));
    let mut sink = CountingSink::default();

    let no_radius = ViewConfig {
        view_radius: 0.0,
        ..right_facing_config()
    };
    let no_angle = ViewConfig {
        view_angle: 0.0,
        ..right_facing_config()
    };

    for config in [no_radius, no_angle] {
        let visible = scan(
            &world,
            Vec2::ZERO,
            0.0,
            &config,
            TargetPolicy::CollectAll,
            &mut sink,
        );
        assert!(visible.is_empty());
    }
    assert_eq!(sink.notifications, 0);
}

#[test]
fn target_on_top_of_the_agent_is_visible() {
    let mut world = World::new();
    let player = spawn_player(&mut world, Vec2::new(1.0, 1.0));
    let mut sink = CountingSink::default();

    let visible = scan(
        &world,
        Vec2::new(1.0, 1.0),
        0.0,
        &right_facing_config(),
        TargetPolicy::CollectAll,
        &mut sink,
    );

    assert!(visible.contains(player));
    assert_eq!(sink.notifications, 1);
}

#[test]
fn scanning_without_a_sink_still_collects_targets() {
    let mut world = World::new();
    let player = spawn_player(&mut world, Vec2::new(3.0, 0.0));
    let mut visibility = Visibility::new();
    let mut visible = VisibleTargets::new();

    let count = visibility.scan_targets(
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        TargetPolicy::CollectAll,
        &world,
        None,
        &mut visible,
    );

    assert_eq!(count, 1);
    assert!(visible.contains(player));
}

#[test]
fn open_polygon_samples_every_step_at_full_radius() {
    let world = World::new();
    let mut visibility = Visibility::new();
    let mut polygon = VisibilityPolygon::new();
    let origin = Vec2::new(10.0, -4.0);

    visibility.rebuild_polygon(origin, 0.0, &right_facing_config(), &world, &mut polygon);

    assert_eq!(polygon.vertices().len(), 92, "91 samples plus the apex");
    assert_eq!(polygon.triangles().len(), 90);
    assert_eq!(polygon.vertices()[0], Vec2::ZERO);
    for vertex in &polygon.vertices()[1..] {
        assert!((vertex.length() - 5.0).abs() < 1e-4, "vertices are agent-local");
    }
    assert!(polygon.contains(origin + Vec2::new(3.0, 0.0)));
    assert!(!polygon.contains(origin + Vec2::new(-3.0, 0.0)));
}

#[test]
fn polygon_inserts_refined_points_at_silhouettes() {
    let mut world = World::new();
    let _ = spawn_wall(&mut world, Vec2::new(2.5, 0.0));
    let mut visibility = Visibility::new();
    let mut polygon = VisibilityPolygon::new();

    visibility.rebuild_polygon(
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        &world,
        &mut polygon,
    );

    // One refined point per silhouette, including the trailing one where
    // every midpoint misses and the A side stays on the last wall hit.
    let samples = 91;
    let inserted = polygon.vertices().len() - 1 - samples;
    assert_eq!(inserted, 2);
    assert_eq!(polygon.triangles().len(), polygon.vertices().len() - 2);
    assert!(!polygon.contains(Vec2::new(4.0, 0.0)), "wall shadows the area behind it");
    assert!(polygon.contains(Vec2::new(1.5, 0.0)));
}

#[test]
fn both_rotation_senses_wind_triangles_counter_clockwise() {
    let mut world = World::new();
    let _ = spawn_wall(&mut world, Vec2::new(2.5, 1.0));
    let mut visibility = Visibility::new();

    for sense in [RotationSense::CounterClockwise, RotationSense::Clockwise] {
        let config = ViewConfig {
            sense,
            ..right_facing_config()
        };
        let mut polygon = VisibilityPolygon::new();
        visibility.rebuild_polygon(Vec2::ZERO, 0.0, &config, &world, &mut polygon);

        assert!(!polygon.triangles().is_empty());
        for triangle in polygon.triangles() {
            let [a, b, c] = triangle.map(|index| polygon.vertices()[index as usize]);
            assert!((b - a).perp_dot(c - a) >= 0.0, "{sense:?} winds {triangle:?} clockwise");
        }
    }
}

#[test]
fn degenerate_polygon_is_empty() {
    let world = World::new();
    let mut visibility = Visibility::new();
    let mut polygon = VisibilityPolygon::new();
    visibility.rebuild_polygon(
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        &world,
        &mut polygon,
    );
    assert!(!polygon.is_empty());

    let degenerate = ViewConfig {
        mesh_resolution: 0.0,
        ..right_facing_config()
    };
    visibility.rebuild_polygon(Vec2::ZERO, 0.0, &degenerate, &world, &mut polygon);

    assert!(polygon.is_empty());
    assert!(polygon.triangles().is_empty());
}

#[test]
fn polygon_overwrites_the_mesh_sink() {
    let world = World::new();
    let mut visibility = Visibility::new();
    let mut polygon = VisibilityPolygon::new();
    let mut sink = MeshBuffer::new();

    visibility.rebuild_polygon(
        Vec2::ZERO,
        0.0,
        &right_facing_config(),
        &world,
        &mut polygon,
    );
    polygon.write_to(&mut sink);
    let first_len = sink.vertices().len();

    let narrow = ViewConfig {
        view_angle: 10.0,
        ..right_facing_config()
    };
    visibility.rebuild_polygon(Vec2::ZERO, 0.0, &narrow, &world, &mut polygon);
    polygon.write_to(&mut sink);

    assert_eq!(first_len, 92);
    assert_eq!(sink.vertices().len(), 12);
    assert_eq!(sink.triangles().len(), 10);
    assert_eq!(sink.revision(), 2);
}

#[test]
fn world_geometry_is_usable_through_the_trait_object() {
    let mut world = World::new();
    let _ = spawn_wall(&mut world, Vec2::new(3.0, 0.0));
    let geometry: &dyn GeometryQuery = &world;

    let hit = geometry
        .raycast(Vec2::ZERO, Vec2::X, 5.0, OBSTACLE_LAYER)
        .expect("wall ahead");
    assert!((hit.distance - 2.5).abs() < 1e-6);
}
