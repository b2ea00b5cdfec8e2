//! Tuning of the map generator.

use nightwatch_core::{CellCoord, DEFAULT_PLAYER_START};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive range of object counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// Smallest count drawn.
    pub min: u32,
    /// Largest count drawn.
    pub max: u32,
}

impl CountRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Reports whether the range is not inverted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub(crate) fn sample(&self, rng: &mut dyn RngCore) -> u32 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// Parameters of a generated level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Number of columns, borders included.
    pub width: u32,
    /// Number of rows, borders included.
    pub height: u32,
    /// World-space size of a single cell.
    pub cell_size: f32,
    /// Cell the player spawns on.
    pub player_start: CellCoord,
    /// Minimum distance between the start and a key object. Defaults to half
    /// the width.
    pub key_min_distance: Option<f32>,
    /// Maximum distance between the start and a key object. Defaults to the
    /// width minus two.
    pub key_max_distance: Option<f32>,
    /// Probability that a corridor step picks a random direction instead of
    /// heading for its destination.
    pub random_step_chance: f32,
    /// Number of rotating eye enemies.
    pub enemy_type1: CountRange,
    /// Number of sleeping enemies.
    pub enemy_type2: CountRange,
    /// Number of obstacles across all three kinds.
    pub obstacles: CountRange,
    /// Smallest column and row an enemy may be placed on.
    pub enemy_min_coordinate: u32,
    /// Smallest column and row an obstacle may be placed on.
    pub obstacle_min_coordinate: u32,
    /// Random cells tried per enemy or obstacle before it is skipped.
    pub placement_attempts: u32,
    /// Layouts generated before giving up.
    pub max_attempts: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            cell_size: 1.0,
            player_start: DEFAULT_PLAYER_START,
            key_min_distance: None,
            key_max_distance: None,
            random_step_chance: 0.7,
            enemy_type1: CountRange::new(5, 10),
            enemy_type2: CountRange::new(3, 7),
            obstacles: CountRange::new(10, 20),
            enemy_min_coordinate: 15,
            obstacle_min_coordinate: 1,
            placement_attempts: 200,
            max_attempts: 3,
        }
    }
}

impl MapConfig {
    /// Configuration for a map of the provided size with default tuning.
    #[must_use]
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Effective inclusive distance band for key objects.
    #[must_use]
    pub fn key_distance_range(&self) -> (f32, f32) {
        let min = self
            .key_min_distance
            .unwrap_or((self.width / 2) as f32);
        let max = self
            .key_max_distance
            .unwrap_or(self.width.saturating_sub(2) as f32);
        (min, max)
    }

    /// Upper bound on the steps of a single corridor walk.
    #[must_use]
    pub fn step_cap(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * 4
    }

    /// Checks that the configuration describes a map that can be generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 3 || self.height < 3 {
            return Err(ConfigError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }

        let start = self.player_start;
        if start.column() == 0
            || start.row() == 0
            || start.column() >= self.width - 1
            || start.row() >= self.height - 1
        {
            return Err(ConfigError::StartOutsideInterior { start });
        }

        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }

        if !(0.0..=1.0).contains(&self.random_step_chance) {
            return Err(ConfigError::InvalidProbability(self.random_step_chance));
        }

        for (name, range) in [
            ("enemy_type1", self.enemy_type1),
            ("enemy_type2", self.enemy_type2),
            ("obstacles", self.obstacles),
        ] {
            if !range.is_valid() {
                return Err(ConfigError::InvertedRange {
                    name,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        let (min, max) = self.key_distance_range();
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(ConfigError::InvertedKeyDistance { min, max });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }
}

/// Reasons a [`MapConfig`] is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The grid has no interior.
    #[error("a {width}x{height} grid has no interior cells")]
    GridTooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The player would spawn on a border or outside the grid.
    #[error("player start {start:?} is not an interior cell")]
    StartOutsideInterior {
        /// Requested start cell.
        start: CellCoord,
    },
    /// Cells must have a positive size.
    #[error("cell size {0} is not positive")]
    InvalidCellSize(f32),
    /// A probability lies outside `0.0..=1.0`.
    #[error("probability {0} lies outside 0..=1")]
    InvalidProbability(f32),
    /// A count range has its bounds swapped.
    #[error("{name} range {min}..={max} is inverted")]
    InvertedRange {
        /// Name of the offending setting.
        name: &'static str,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// The key object distance band is empty or not finite.
    #[error("key object distance band {min}..={max} is empty")]
    InvertedKeyDistance {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },
    /// Generation would never run.
    #[error("at least one generation attempt is required")]
    ZeroAttempts,
}
