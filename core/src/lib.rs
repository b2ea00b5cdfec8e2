#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Nightwatch stealth core.
//!
//! This crate defines the vocabulary that connects the geometry host, the
//! visibility engine, the agents, and the map generator. Hosts implement the
//! service traits ([`GeometryQuery`], [`MeshSink`], [`DetectionSink`],
//! [`ObjectPlacement`]); systems consume them through trait objects so test
//! doubles can be swapped in freely. The in-process host accepts [`Command`]
//! values and reports what it did through [`Event`] values.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Grid cell the player spawns on unless a map configuration overrides it.
pub const DEFAULT_PLAYER_START: CellCoord = CellCoord::new(1, 1);

/// Layer holding walls, crates and anything else that blocks sight.
pub const OBSTACLE_LAYER: LayerMask = LayerMask::layer(0);

/// Layer holding colliders that agents try to detect (the player).
pub const TARGET_LAYER: LayerMask = LayerMask::layer(1);

/// Layer holding enemy bodies.
pub const ENEMY_LAYER: LayerMask = LayerMask::layer(2);

/// Layer holding the exit and the treasure.
pub const KEY_OBJECT_LAYER: LayerMask = LayerMask::layer(3);

/// Commands that express all permissible mutations of the geometry host.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Registers a new collider.
    SpawnCollider {
        /// Shape of the collider.
        shape: ColliderShape,
        /// Centre of the collider in world units.
        position: Vec2,
        /// Layers the collider belongs to.
        layers: LayerMask,
    },
    /// Teleports an existing collider.
    MoveCollider {
        /// Collider to move.
        target: TargetId,
        /// New centre of the collider in world units.
        position: Vec2,
    },
    /// Removes a collider from the host.
    RemoveCollider {
        /// Collider to remove.
        target: TargetId,
    },
    /// Instantiates a prefab on a grid cell.
    PlaceObject {
        /// Prefab to instantiate.
        prefab: PrefabKind,
        /// Cell the instance occupies.
        cell: CellCoord,
    },
    /// Removes every collider that was created through object placement.
    ClearPlacedObjects,
}

/// Events broadcast by the geometry host after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a collider was registered.
    ColliderSpawned {
        /// Identifier assigned to the collider.
        target: TargetId,
        /// Centre of the collider in world units.
        position: Vec2,
        /// Layers the collider belongs to.
        layers: LayerMask,
    },
    /// Confirms that a collider moved.
    ColliderMoved {
        /// Collider that moved.
        target: TargetId,
        /// Centre before the move.
        from: Vec2,
        /// Centre after the move.
        to: Vec2,
    },
    /// Confirms that a collider was removed.
    ColliderRemoved {
        /// Collider that was removed.
        target: TargetId,
    },
    /// Confirms that a prefab instance was placed on the grid.
    ObjectPlaced {
        /// Identifier of the new instance.
        instance: InstanceId,
        /// Prefab that was instantiated.
        prefab: PrefabKind,
        /// Cell the instance occupies.
        cell: CellCoord,
        /// Collider backing the instance.
        target: TargetId,
    },
    /// Confirms that all placed instances were discarded.
    PlacedObjectsCleared {
        /// Number of instances that were removed.
        count: usize,
    },
}

/// Identifier of a collider registered with the geometry host.
///
/// Every collider can be the subject of an overlap query, so the same
/// identifier doubles as the identity of a detection target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(u32);

impl TargetId {
    /// Creates a new target identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a prefab instance created through [`ObjectPlacement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Creates a new instance identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the straight-line distance between two cell centres.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let dx = self.column().abs_diff(other.column()) as f32;
        let dy = self.row().abs_diff(other.row()) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the neighbouring cell one step in `direction`, if it exists.
    ///
    /// Only the lower bound is checked; callers compare against their own
    /// grid dimensions.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Returns the cell displaced by the provided signed offsets.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(CellCoord::new(column, row))
    }

    /// World-space centre of the cell for the provided cell size.
    #[must_use]
    pub fn to_world(self, cell_size: f32) -> Vec2 {
        Vec2::new(self.column as f32 * cell_size, self.row as f32 * cell_size)
    }
}

/// Cardinal movement directions on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward increasing row indices (world +Y).
    North,
    /// Movement toward increasing column indices (world +X).
    East,
    /// Movement toward decreasing row indices (world -Y).
    South,
    /// Movement toward decreasing column indices (world -X).
    West,
}

impl Direction {
    /// All four cardinal directions in clockwise order starting north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Signed column and row offsets of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Unit vector of the direction in world space.
    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        let (dx, dy) = self.offset();
        Vec2::new(dx as f32, dy as f32)
    }

    /// Direction that moves from `from` toward `to` along the dominant axis.
    ///
    /// Returns `None` when the cells coincide.
    #[must_use]
    pub fn toward(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let dx = i64::from(to.column()) - i64::from(from.column());
        let dy = i64::from(to.row()) - i64::from(from.row());
        if dx == 0 && dy == 0 {
            return None;
        }

        if dx.abs() >= dy.abs() {
            Some(if dx > 0 { Self::East } else { Self::West })
        } else {
            Some(if dy > 0 { Self::North } else { Self::South })
        }
    }
}

/// Bit set of collision layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Mask that matches nothing.
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask that matches every layer.
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask containing the single layer with the provided index.
    ///
    /// Indices wrap at 32.
    #[must_use]
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index % 32))
    }

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits of the mask.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Combines two masks.
    #[must_use]
    pub const fn union(self, other: LayerMask) -> Self {
        Self(self.0 | other.0)
    }

    /// Reports whether the two masks share at least one layer.
    #[must_use]
    pub const fn intersects(&self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Reports whether the mask contains no layer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Geometric shape of a collider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Disc centred on the collider position.
    Circle {
        /// Radius in world units.
        radius: f32,
    },
    /// Axis-aligned box centred on the collider position.
    Box {
        /// Half of the box width and height in world units.
        half_extents: Vec2,
    },
}

/// Nearest blocking surface reported by a ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// World-space point where the ray met the surface.
    pub point: Vec2,
    /// Distance travelled from the ray origin to `point`.
    pub distance: f32,
}

/// Collider reported by an overlap query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColliderRef {
    /// Identifier of the collider.
    pub target: TargetId,
    /// World-space centre of the collider.
    pub position: Vec2,
}

/// Axis that a facing angle of zero degrees points along.
///
/// Both conventions exist in the game: sprite-driven enemies treat zero as
/// "up" while patrol enemies treat zero as "right". Each agent profile picks
/// one explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AngleConvention {
    /// Zero degrees points along +Y: `(cos(a + 90), sin(a + 90))`.
    #[default]
    UpZero,
    /// Zero degrees points along +X: `(cos a, sin a)`.
    RightZero,
}

/// Direction in which increasing facing angles rotate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationSense {
    /// Increasing angles rotate counter-clockwise (mathematical sense).
    #[default]
    CounterClockwise,
    /// Increasing angles rotate clockwise.
    Clockwise,
}

/// Maps an angle in degrees to a unit direction vector.
#[must_use]
pub fn direction_from_angle(
    angle_degrees: f32,
    convention: AngleConvention,
    sense: RotationSense,
) -> Vec2 {
    let signed = match sense {
        RotationSense::CounterClockwise => angle_degrees,
        RotationSense::Clockwise => -angle_degrees,
    };
    let offset = match convention {
        AngleConvention::UpZero => 90.0,
        AngleConvention::RightZero => 0.0,
    };
    let radians = (signed + offset).to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Inverse of [`direction_from_angle`]: the facing angle of a direction.
///
/// A zero-length direction maps to zero degrees.
#[must_use]
pub fn angle_from_direction(
    direction: Vec2,
    convention: AngleConvention,
    sense: RotationSense,
) -> f32 {
    if direction.length_squared() <= f32::EPSILON {
        return 0.0;
    }

    let offset = match convention {
        AngleConvention::UpZero => 90.0,
        AngleConvention::RightZero => 0.0,
    };
    let signed = direction.y.atan2(direction.x).to_degrees() - offset;
    match sense {
        RotationSense::CounterClockwise => signed,
        RotationSense::Clockwise => -signed,
    }
}

/// Unsigned angle in degrees between two directions, in `0.0..=180.0`.
///
/// Either direction being zero-length yields zero.
#[must_use]
pub fn unsigned_angle_between(a: Vec2, b: Vec2) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator <= f32::EPSILON {
        return 0.0;
    }

    let cosine = (a.dot(b) / denominator).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// Objects the map generator can request from the placement host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrefabKind {
    /// Level exit the player must reach.
    Exit,
    /// Treasure the player must collect.
    Treasure,
    /// Rotating eye enemy.
    EnemyType1,
    /// Sleeping enemy.
    EnemyType2,
    /// Small obstacle.
    Obstacle1,
    /// Medium obstacle.
    Obstacle2,
    /// Large obstacle.
    Obstacle3,
}

impl PrefabKind {
    /// Reports whether the prefab is one of the two reachability-checked objects.
    #[must_use]
    pub const fn is_key_object(self) -> bool {
        matches!(self, Self::Exit | Self::Treasure)
    }

    /// Reports whether the prefab is an obstacle.
    #[must_use]
    pub const fn is_obstacle(self) -> bool {
        matches!(self, Self::Obstacle1 | Self::Obstacle2 | Self::Obstacle3)
    }

    /// Reports whether the prefab is an enemy.
    #[must_use]
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::EnemyType1 | Self::EnemyType2)
    }

    /// Single character used by text views of a map.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Exit => 'E',
            Self::Treasure => 'T',
            Self::EnemyType1 => 'o',
            Self::EnemyType2 => 'z',
            Self::Obstacle1 => '+',
            Self::Obstacle2 => '*',
            Self::Obstacle3 => '#',
        }
    }
}

/// Geometry service provided by the host environment.
pub trait GeometryQuery {
    /// Casts a ray and reports the nearest blocking surface on `mask`.
    ///
    /// `direction` is expected to be normalised. Hits beyond `max_distance`
    /// are ignored.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Enumerates every collider on `mask` overlapping the circle.
    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<ColliderRef>;
}

/// Receiver of renderable meshes.
pub trait MeshSink {
    /// Replaces the sink's contents with the provided mesh.
    fn replace(&mut self, vertices: &[Vec3], triangles: &[[u32; 3]]);
}

/// Receiver of "an agent has seen the player" notifications.
pub trait DetectionSink {
    /// Records a single detection.
    fn notify_detected(&mut self);
}

/// Host service that instantiates prefabs on grid cells.
pub trait ObjectPlacement {
    /// Instantiates `prefab` at `cell` and returns the new instance.
    fn place_object(&mut self, prefab: PrefabKind, cell: CellCoord) -> InstanceId;
}

/// In-memory [`MeshSink`] that keeps the most recent mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffer {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    revision: u64,
}

impl MeshBuffer {
    /// Creates an empty mesh buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices of the most recent mesh.
    #[must_use]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangles of the most recent mesh.
    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of times the contents were replaced.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Reports whether the buffer currently holds no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl MeshSink for MeshBuffer {
    fn replace(&mut self, vertices: &[Vec3], triangles: &[[u32; 3]]) {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
        self.triangles.clear();
        self.triangles.extend_from_slice(triangles);
        self.revision = self.revision.saturating_add(1);
    }
}
