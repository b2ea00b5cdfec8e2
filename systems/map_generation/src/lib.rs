#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural level layout with guaranteed reachable key objects.
//!
//! A [`MapGenerator`] lays out one [`MapLayout`] per attempt: walls around the
//! border, the exit and the treasure at a distance from the player start,
//! meandering corridors leading to both, then enemies and obstacles on the
//! remaining cells. A [`MapValidator`] accepts or rejects each layout; only an
//! accepted layout is committed to the host through
//! [`ObjectPlacement`].

mod config;
mod corridor;
mod grid;
mod navigation;

use nightwatch_core::{CellCoord, InstanceId, ObjectPlacement, PrefabKind};
use rand::{seq::SliceRandom, Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{ConfigError, CountRange, MapConfig};
pub use grid::MapGrid;
pub use navigation::find_path;

/// Prefab requested on a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Requested prefab.
    pub prefab: PrefabKind,
    /// Cell the prefab occupies.
    pub cell: CellCoord,
}

/// Outcome of a single generation attempt, not yet committed to the host.
#[derive(Clone, Debug, PartialEq)]
pub struct MapLayout {
    grid: MapGrid,
    start: CellCoord,
    exit: Option<CellCoord>,
    treasure: Option<CellCoord>,
    placements: Vec<Placement>,
    skipped_placements: u32,
}

impl MapLayout {
    /// Occupancy and path protection of the layout.
    #[must_use]
    pub const fn grid(&self) -> &MapGrid {
        &self.grid
    }

    /// Mutable access to the grid for hand-made edits before validation.
    pub fn grid_mut(&mut self) -> &mut MapGrid {
        &mut self.grid
    }

    /// Cell the player spawns on.
    #[must_use]
    pub const fn start(&self) -> CellCoord {
        self.start
    }

    /// Cell of the exit, if it could be placed.
    #[must_use]
    pub const fn exit(&self) -> Option<CellCoord> {
        self.exit
    }

    /// Cell of the treasure, if it could be placed.
    #[must_use]
    pub const fn treasure(&self) -> Option<CellCoord> {
        self.treasure
    }

    /// Every placed object in placement order, key objects first.
    #[must_use]
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Enemies and obstacles that found no free cell.
    #[must_use]
    pub const fn skipped_placements(&self) -> u32 {
        self.skipped_placements
    }

    /// Reports whether travel through `cell` is blocked.
    ///
    /// Key object cells never block.
    #[must_use]
    pub fn blocks_travel(&self, cell: CellCoord) -> bool {
        if Some(cell) == self.exit || Some(cell) == self.treasure {
            return false;
        }
        self.grid.is_blocking(cell)
    }

    /// Shortest 4-connected route between two cells, if one exists.
    #[must_use]
    pub fn route(&self, from: CellCoord, to: CellCoord) -> Option<Vec<CellCoord>> {
        find_path(&self.grid, from, to, |cell| self.blocks_travel(cell))
    }
}

/// Reasons a layout is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// No cell satisfied the exit's distance constraint.
    #[error("the exit could not be placed")]
    ExitUnplaced,
    /// No cell satisfied the treasure's distance constraint.
    #[error("the treasure could not be placed")]
    TreasureUnplaced,
    /// The exit cannot be reached from the player start.
    #[error("the exit at {0:?} cannot be reached")]
    ExitUnreachable(CellCoord),
    /// The treasure cannot be reached from the player start.
    #[error("the treasure at {0:?} cannot be reached")]
    TreasureUnreachable(CellCoord),
}

/// Accepts or rejects generated layouts.
pub trait MapValidator {
    /// Checks a single layout.
    fn validate(&self, layout: &MapLayout) -> Result<(), ValidationFailure>;
}

/// Requires both key objects to be reachable from the player start.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReachabilityValidator;

impl MapValidator for ReachabilityValidator {
    fn validate(&self, layout: &MapLayout) -> Result<(), ValidationFailure> {
        let exit = layout.exit().ok_or(ValidationFailure::ExitUnplaced)?;
        let treasure = layout.treasure().ok_or(ValidationFailure::TreasureUnplaced)?;

        if layout.route(layout.start(), exit).is_none() {
            tracing::debug!(?exit, "exit unreachable");
            return Err(ValidationFailure::ExitUnreachable(exit));
        }
        if layout.route(layout.start(), treasure).is_none() {
            tracing::debug!(?treasure, "treasure unreachable");
            return Err(ValidationFailure::TreasureUnreachable(treasure));
        }
        Ok(())
    }
}

/// Reasons map generation gives up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Every attempt produced a rejected layout.
    #[error("no valid map after {attempts} attempts: {last_failure}")]
    Exhausted {
        /// Number of layouts generated.
        attempts: u32,
        /// Rejection reason of the final layout.
        last_failure: ValidationFailure,
    },
}

/// Object committed to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedInstance {
    /// What was placed and where.
    pub placement: Placement,
    /// Instance returned by the host.
    pub instance: InstanceId,
}

/// Validated layout together with the host instances created for it.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedMap {
    layout: MapLayout,
    attempts: u32,
    instances: Vec<PlacedInstance>,
}

impl GeneratedMap {
    /// Accepted layout.
    #[must_use]
    pub const fn layout(&self) -> &MapLayout {
        &self.layout
    }

    /// Number of layouts generated, the accepted one included.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Host instances in placement order.
    #[must_use]
    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    /// Enemies and obstacles of the accepted layout that found no free cell.
    #[must_use]
    pub const fn skipped_placements(&self) -> u32 {
        self.layout.skipped_placements
    }
}

/// Generates layouts from a validated [`MapConfig`].
#[derive(Clone, Debug)]
pub struct MapGenerator {
    config: MapConfig,
}

impl MapGenerator {
    /// Creates a generator, rejecting configurations that cannot be generated.
    pub fn new(config: MapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration the generator was built with.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Generates and validates layouts until one is accepted, then commits it.
    ///
    /// Rejected layouts never reach `placement`. Gives up after
    /// `max_attempts` layouts.
    pub fn generate_valid(
        &self,
        rng: &mut dyn RngCore,
        validator: &dyn MapValidator,
        placement: &mut dyn ObjectPlacement,
    ) -> Result<GeneratedMap, GenerationError> {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let layout = self.generate(rng);

            match validator.validate(&layout) {
                Ok(()) => {
                    tracing::debug!(
                        attempt,
                        placements = layout.placements.len(),
                        skipped = layout.skipped_placements,
                        "map accepted"
                    );
                    let instances = commit(&layout, placement);
                    return Ok(GeneratedMap {
                        layout,
                        attempts: attempt,
                        instances,
                    });
                }
                Err(failure) if attempt >= max_attempts => {
                    tracing::error!(attempts = attempt, %failure, "failed to generate a valid map");
                    return Err(GenerationError::Exhausted {
                        attempts: attempt,
                        last_failure: failure,
                    });
                }
                Err(failure) => {
                    tracing::info!(attempt, max_attempts, %failure, "generated invalid map, regenerating");
                }
            }
        }
    }

    /// Lays out a single map without validating or committing it.
    pub fn generate(&self, rng: &mut dyn RngCore) -> MapLayout {
        let config = &self.config;
        let start = config.player_start;
        let mut layout = MapLayout {
            grid: MapGrid::walled(config.width, config.height, start),
            start,
            exit: None,
            treasure: None,
            placements: Vec::new(),
            skipped_placements: 0,
        };

        layout.exit = self.place_key_object(&mut layout, PrefabKind::Exit, rng);
        layout.treasure = self.place_key_object(&mut layout, PrefabKind::Treasure, rng);

        let enemies = [
            (PrefabKind::EnemyType1, config.enemy_type1.sample(rng)),
            (PrefabKind::EnemyType2, config.enemy_type2.sample(rng)),
        ];
        for (prefab, count) in enemies {
            for _ in 0..count {
                self.place_safely(&mut layout, prefab, config.enemy_min_coordinate, rng);
            }
        }

        for _ in 0..config.obstacles.sample(rng) {
            let prefab = obstacle_kind(rng.gen::<f32>());
            self.place_safely(&mut layout, prefab, config.obstacle_min_coordinate, rng);
        }

        tracing::debug!(
            exit = ?layout.exit,
            treasure = ?layout.treasure,
            placements = layout.placements.len(),
            skipped = layout.skipped_placements,
            "map laid out"
        );
        layout
    }

    fn place_key_object(
        &self,
        layout: &mut MapLayout,
        prefab: PrefabKind,
        rng: &mut dyn RngCore,
    ) -> Option<CellCoord> {
        let (min_distance, max_distance) = self.config.key_distance_range();
        let start = layout.start;
        let candidates: Vec<CellCoord> = layout
            .grid
            .cells()
            .filter(|cell| layout.grid.is_interior(*cell) && !layout.grid.is_occupied(*cell))
            .filter(|cell| {
                let distance = start.euclidean_distance(*cell);
                distance >= min_distance && distance <= max_distance
            })
            .collect();

        let Some(&cell) = candidates.choose(rng) else {
            tracing::warn!(?prefab, min_distance, max_distance, "no cell within key object distance");
            return None;
        };

        occupy(layout, prefab, cell);
        let steps = corridor::carve(
            &mut layout.grid,
            start,
            cell,
            self.config.random_step_chance,
            self.config.step_cap(),
            rng,
        );
        tracing::debug!(?prefab, ?cell, steps, "corridor carved");
        Some(cell)
    }

    fn place_safely(
        &self,
        layout: &mut MapLayout,
        prefab: PrefabKind,
        min_coordinate: u32,
        rng: &mut dyn RngCore,
    ) {
        let column_end = layout.grid.width() - 1;
        let row_end = layout.grid.height() - 1;

        if min_coordinate < column_end && min_coordinate < row_end {
            for _ in 0..self.config.placement_attempts {
                let cell = CellCoord::new(
                    rng.gen_range(min_coordinate..column_end),
                    rng.gen_range(min_coordinate..row_end),
                );
                if !layout.grid.is_occupied(cell) && !layout.grid.is_path_protected(cell) {
                    occupy(layout, prefab, cell);
                    return;
                }
            }
        }

        layout.skipped_placements += 1;
        tracing::warn!(?prefab, min_coordinate, "no free cell found, placement skipped");
    }
}

fn occupy(layout: &mut MapLayout, prefab: PrefabKind, cell: CellCoord) {
    layout.grid.set_occupied(cell, true);
    layout.placements.push(Placement { prefab, cell });
}

fn obstacle_kind(roll: f32) -> PrefabKind {
    if roll < 0.33 {
        PrefabKind::Obstacle1
    } else if roll < 0.66 {
        PrefabKind::Obstacle2
    } else {
        PrefabKind::Obstacle3
    }
}

fn commit(layout: &MapLayout, placement: &mut dyn ObjectPlacement) -> Vec<PlacedInstance> {
    layout
        .placements
        .iter()
        .map(|entry| PlacedInstance {
            placement: *entry,
            instance: placement.place_object(entry.prefab, entry.cell),
        })
        .collect()
}
