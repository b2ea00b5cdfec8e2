use std::cell::Cell;

use nightwatch_core::{CellCoord, Event, InstanceId, ObjectPlacement, PrefabKind};
use nightwatch_system_map_generation::{
    GenerationError, MapConfig, MapGenerator, MapLayout, MapValidator, Placement,
    ReachabilityValidator, ValidationFailure,
};
use nightwatch_world::{query, PlacementSession, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Default)]
struct RecordingHost {
    placed: Vec<Placement>,
}

impl ObjectPlacement for RecordingHost {
    fn place_object(&mut self, prefab: PrefabKind, cell: CellCoord) -> InstanceId {
        self.placed.push(Placement { prefab, cell });
        InstanceId::new(self.placed.len() as u32)
    }
}

struct RejectEverything {
    calls: Cell<u32>,
}

impl MapValidator for RejectEverything {
    fn validate(&self, _layout: &MapLayout) -> Result<(), ValidationFailure> {
        self.calls.set(self.calls.get() + 1);
        Err(ValidationFailure::ExitUnplaced)
    }
}

/// Surrounds the exit with occupied, unprotected cells, then hands the edited
/// layout to the reachability validator.
struct SealedExit {
    calls: Cell<u32>,
}

impl MapValidator for SealedExit {
    fn validate(&self, layout: &MapLayout) -> Result<(), ValidationFailure> {
        self.calls.set(self.calls.get() + 1);
        let Some(exit) = layout.exit() else {
            return ReachabilityValidator.validate(layout);
        };

        // A neighbouring treasure never blocks, so it is walled in with the exit.
        let pocket: Vec<CellCoord> = [Some(exit), layout.treasure()]
            .into_iter()
            .flatten()
            .filter(|cell| cell.manhattan_distance(exit) <= 1)
            .collect();
        let mut sealed = layout.clone();
        let ring: Vec<CellCoord> = sealed
            .grid()
            .cells()
            .filter(|cell| !pocket.contains(cell))
            .filter(|cell| pocket.iter().any(|key| key.manhattan_distance(*cell) == 1))
            .collect();
        for cell in ring {
            sealed.grid_mut().set_occupied(cell, true);
            sealed.grid_mut().set_path_protected(cell, false);
        }

        ReachabilityValidator.validate(&sealed)
    }
}

#[test]
fn ten_by_ten_map_is_accepted_on_the_first_attempt() {
    let generator = MapGenerator::new(MapConfig::sized(10, 10)).expect("valid config");
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut host = RecordingHost::default();

    let map = generator
        .generate_valid(&mut rng, &ReachabilityValidator, &mut host)
        .expect("map generates");

    assert_eq!(map.attempts(), 1);
    let layout = map.layout();
    let exit = layout.exit().expect("exit placed");
    let treasure = layout.treasure().expect("treasure placed");
    assert!(layout.route(layout.start(), exit).is_some());
    assert!(layout.route(layout.start(), treasure).is_some());
    assert_eq!(host.placed, layout.placements());
    assert_eq!(map.instances().len(), layout.placements().len());
    assert!(
        map.skipped_placements() > 0,
        "enemies cannot fit below coordinate fifteen on a ten by ten map"
    );
}

#[test]
fn sealed_exit_exhausts_every_attempt() {
    let generator = MapGenerator::new(MapConfig::sized(10, 10)).expect("valid config");
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let validator = SealedExit {
        calls: Cell::new(0),
    };
    let mut world = World::new();
    let mut events = Vec::new();

    let result = {
        let mut session = PlacementSession::new(&mut world, &mut events);
        generator.generate_valid(&mut rng, &validator, &mut session)
    };

    match result {
        Err(GenerationError::Exhausted {
            attempts,
            last_failure: ValidationFailure::ExitUnreachable(_),
        }) => assert_eq!(attempts, 3),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(validator.calls.get(), 3);
    assert!(events.is_empty(), "rejected layouts are never committed");
    assert!(query::placed_objects(&world).is_empty());
}

#[test]
fn retries_stop_at_the_attempt_cap() {
    let config = MapConfig {
        max_attempts: 5,
        ..MapConfig::sized(12, 12)
    };
    let generator = MapGenerator::new(config).expect("valid config");
    let validator = RejectEverything {
        calls: Cell::new(0),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut host = RecordingHost::default();

    let result = generator.generate_valid(&mut rng, &validator, &mut host);

    assert_eq!(
        result,
        Err(GenerationError::Exhausted {
            attempts: 5,
            last_failure: ValidationFailure::ExitUnplaced,
        })
    );
    assert_eq!(validator.calls.get(), 5);
    assert!(host.placed.is_empty());
}

#[test]
fn unreachable_distance_band_leaves_key_objects_unplaced() {
    let config = MapConfig {
        key_min_distance: Some(40.0),
        key_max_distance: Some(50.0),
        ..MapConfig::sized(10, 10)
    };
    let generator = MapGenerator::new(config).expect("valid config");
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut host = RecordingHost::default();

    let result = generator.generate_valid(&mut rng, &ReachabilityValidator, &mut host);

    assert_eq!(
        result,
        Err(GenerationError::Exhausted {
            attempts: 3,
            last_failure: ValidationFailure::ExitUnplaced,
        })
    );
}

#[test]
fn accepted_map_is_committed_to_the_world() {
    let generator = MapGenerator::new(MapConfig::sized(24, 24)).expect("valid config");
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let mut world = World::new();
    let mut events = Vec::new();

    let map = {
        let mut session = PlacementSession::new(&mut world, &mut events);
        generator
            .generate_valid(&mut rng, &ReachabilityValidator, &mut session)
            .expect("map generates")
    };

    let placed = query::placed_objects(&world);
    assert_eq!(placed.len(), map.layout().placements().len());
    let placed_events = events
        .iter()
        .filter(|event| matches!(event, Event::ObjectPlaced { .. }))
        .count();
    assert_eq!(placed_events, placed.len());
    for (object, instance) in placed.iter().zip(map.instances()) {
        assert_eq!(object.instance(), instance.instance);
        assert_eq!(object.prefab(), instance.placement.prefab);
        assert_eq!(object.cell(), instance.placement.cell);
    }
}
