#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative collider store for Nightwatch.
//!
//! The world owns every collider in a level and answers the geometry
//! queries the visibility engine depends on. It is deliberately small:
//! colliders are discs or axis-aligned boxes that only move when a command
//! teleports them, and every query is a linear scan.

mod shapes;

use glam::Vec2;
use nightwatch_core::{
    CellCoord, ColliderRef, ColliderShape, Command, Event, GeometryQuery, InstanceId, LayerMask,
    ObjectPlacement, PrefabKind, RayHit, TargetId, ENEMY_LAYER, KEY_OBJECT_LAYER, OBSTACLE_LAYER,
};

const DEFAULT_CELL_SIZE: f32 = 1.0;
const ENEMY_RADIUS_FACTOR: f32 = 0.4;

/// Collider registered with the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    id: TargetId,
    shape: ColliderShape,
    position: Vec2,
    layers: LayerMask,
}

impl Collider {
    /// Identifier of the collider.
    #[must_use]
    pub const fn id(&self) -> TargetId {
        self.id
    }

    /// Shape of the collider.
    #[must_use]
    pub const fn shape(&self) -> ColliderShape {
        self.shape
    }

    /// Centre of the collider in world units.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Layers the collider belongs to.
    #[must_use]
    pub const fn layers(&self) -> LayerMask {
        self.layers
    }
}

/// Prefab instance placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedObject {
    instance: InstanceId,
    prefab: PrefabKind,
    cell: CellCoord,
    collider: TargetId,
}

impl PlacedObject {
    /// Identifier of the instance.
    #[must_use]
    pub const fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Prefab that was instantiated.
    #[must_use]
    pub const fn prefab(&self) -> PrefabKind {
        self.prefab
    }

    /// Cell the instance occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Collider backing the instance.
    #[must_use]
    pub const fn collider(&self) -> TargetId {
        self.collider
    }
}

/// Represents the authoritative Nightwatch world state.
#[derive(Debug)]
pub struct World {
    cell_size: f32,
    colliders: Vec<Collider>,
    placed: Vec<PlacedObject>,
    next_target: u32,
    next_instance: u32,
}

impl World {
    /// Creates an empty world with unit-sized grid cells.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }

    /// Creates an empty world whose grid cells span `cell_size` world units.
    ///
    /// Non-positive or non-finite sizes fall back to one unit.
    #[must_use]
    pub fn with_cell_size(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };

        Self {
            cell_size,
            colliders: Vec::new(),
            placed: Vec::new(),
            next_target: 0,
            next_instance: 0,
        }
    }

    fn spawn(&mut self, shape: ColliderShape, position: Vec2, layers: LayerMask) -> TargetId {
        let id = TargetId::new(self.next_target);
        self.next_target = self.next_target.saturating_add(1);
        self.colliders.push(Collider {
            id,
            shape,
            position,
            layers,
        });
        id
    }

    fn collider_mut(&mut self, target: TargetId) -> Option<&mut Collider> {
        self.colliders
            .iter_mut()
            .find(|collider| collider.id == target)
    }

    fn remove(&mut self, target: TargetId) -> bool {
        let Some(index) = self
            .colliders
            .iter()
            .position(|collider| collider.id == target)
        else {
            return false;
        };

        let _ = self.colliders.remove(index);
        self.placed.retain(|placed| placed.collider != target);
        true
    }

    fn place(&mut self, prefab: PrefabKind, cell: CellCoord, out_events: &mut Vec<Event>) -> InstanceId {
        let (shape, layers) = prefab_body(prefab, self.cell_size);
        let target = self.spawn(shape, cell.to_world(self.cell_size), layers);
        let instance = InstanceId::new(self.next_instance);
        self.next_instance = self.next_instance.saturating_add(1);
        self.placed.push(PlacedObject {
            instance,
            prefab,
            cell,
            collider: target,
        });

        tracing::trace!(?prefab, column = cell.column(), row = cell.row(), "placed object");
        out_events.push(Event::ObjectPlaced {
            instance,
            prefab,
            cell,
            target,
        });
        instance
    }

    fn clear_placed(&mut self) -> usize {
        let placed = std::mem::take(&mut self.placed);
        let count = placed.len();
        self.colliders
            .retain(|collider| placed.iter().all(|object| object.collider != collider.id));
        count
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryQuery for World {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        if !(max_distance >= 0.0) || direction.length_squared() <= f32::EPSILON {
            return None;
        }

        let direction = direction.normalize();
        self.colliders
            .iter()
            .filter(|collider| collider.layers.intersects(mask))
            .filter_map(|collider| {
                shapes::ray_distance(
                    collider.shape,
                    collider.position,
                    origin,
                    direction,
                    max_distance,
                )
            })
            .min_by(|left, right| left.total_cmp(right))
            .map(|distance| RayHit {
                point: origin + direction * distance,
                distance,
            })
    }

    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<ColliderRef> {
        if !(radius >= 0.0) {
            return Vec::new();
        }

        self.colliders
            .iter()
            .filter(|collider| collider.layers.intersects(mask))
            .filter(|collider| {
                shapes::overlaps_circle(collider.shape, collider.position, center, radius)
            })
            .map(|collider| ColliderRef {
                target: collider.id,
                position: collider.position,
            })
            .collect()
    }
}

/// Adapter that routes object placement requests through [`apply`].
///
/// Every placement is recorded as an [`Event::ObjectPlaced`] in the borrowed
/// event buffer.
#[derive(Debug)]
pub struct PlacementSession<'a> {
    world: &'a mut World,
    out_events: &'a mut Vec<Event>,
}

impl<'a> PlacementSession<'a> {
    /// Opens a placement session over the provided world and event buffer.
    #[must_use]
    pub fn new(world: &'a mut World, out_events: &'a mut Vec<Event>) -> Self {
        Self { world, out_events }
    }
}

impl ObjectPlacement for PlacementSession<'_> {
    fn place_object(&mut self, prefab: PrefabKind, cell: CellCoord) -> InstanceId {
        self.world.place(prefab, cell, self.out_events)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SpawnCollider {
            shape,
            position,
            layers,
        } => {
            let target = world.spawn(shape, position, layers);
            out_events.push(Event::ColliderSpawned {
                target,
                position,
                layers,
            });
        }
        Command::MoveCollider { target, position } => {
            if let Some(collider) = world.collider_mut(target) {
                let from = collider.position;
                collider.position = position;
                out_events.push(Event::ColliderMoved {
                    target,
                    from,
                    to: position,
                });
            }
        }
        Command::RemoveCollider { target } => {
            if world.remove(target) {
                out_events.push(Event::ColliderRemoved { target });
            }
        }
        Command::PlaceObject { prefab, cell } => {
            let _ = world.place(prefab, cell, out_events);
        }
        Command::ClearPlacedObjects => {
            let count = world.clear_placed();
            out_events.push(Event::PlacedObjectsCleared { count });
        }
    }
}

fn prefab_body(prefab: PrefabKind, cell_size: f32) -> (ColliderShape, LayerMask) {
    let half_cell = Vec2::splat(cell_size * 0.5);
    match prefab {
        PrefabKind::Exit | PrefabKind::Treasure => (
            ColliderShape::Box {
                half_extents: half_cell,
            },
            KEY_OBJECT_LAYER,
        ),
        PrefabKind::EnemyType1 | PrefabKind::EnemyType2 => (
            ColliderShape::Circle {
                radius: cell_size * ENEMY_RADIUS_FACTOR,
            },
            ENEMY_LAYER,
        ),
        PrefabKind::Obstacle1 | PrefabKind::Obstacle2 | PrefabKind::Obstacle3 => (
            ColliderShape::Box {
                half_extents: half_cell,
            },
            OBSTACLE_LAYER,
        ),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use nightwatch_core::{CellCoord, LayerMask, TargetId};

    use super::{shapes, Collider, PlacedObject, World};

    /// Side length of a grid cell in world units.
    #[must_use]
    pub fn cell_size(world: &World) -> f32 {
        world.cell_size
    }

    /// World-space centre of the provided grid cell.
    #[must_use]
    pub fn cell_center(world: &World, cell: CellCoord) -> Vec2 {
        cell.to_world(world.cell_size)
    }

    /// Grid cell containing the provided world-space point.
    ///
    /// Points left of or below the grid origin have no cell.
    #[must_use]
    pub fn cell_at(world: &World, point: Vec2) -> Option<CellCoord> {
        let scaled = (point / world.cell_size).round();
        if !scaled.is_finite() || scaled.x < 0.0 || scaled.y < 0.0 {
            return None;
        }

        Some(CellCoord::new(scaled.x as u32, scaled.y as u32))
    }

    /// Looks up a collider by identifier.
    #[must_use]
    pub fn collider(world: &World, target: TargetId) -> Option<&Collider> {
        world.colliders.iter().find(|collider| collider.id == target)
    }

    /// Every collider currently registered, in spawn order.
    #[must_use]
    pub fn colliders(world: &World) -> &[Collider] {
        &world.colliders
    }

    /// Every prefab instance currently placed, in placement order.
    #[must_use]
    pub fn placed_objects(world: &World) -> &[PlacedObject] {
        &world.placed
    }

    /// Colliders on `mask` that contain the provided point.
    #[must_use]
    pub fn colliders_at(world: &World, point: Vec2, mask: LayerMask) -> Vec<TargetId> {
        world
            .colliders
            .iter()
            .filter(|collider| collider.layers.intersects(mask))
            .filter(|collider| shapes::contains_point(collider.shape, collider.position, point))
            .map(|collider| collider.id)
            .collect()
    }
}
