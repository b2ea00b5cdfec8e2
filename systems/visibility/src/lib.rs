#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Field-of-view engine shared by every Nightwatch agent.
//!
//! Two independent computations live here. [`Visibility::scan_targets`]
//! decides which targets an agent can currently see (radius, cone and line of
//! sight) and reports detections. [`Visibility::rebuild_polygon`] sweeps a fan
//! of rays across the view cone, refines silhouette edges with a bounded
//! binary search, and triangulates the result for rendering.

mod edge;
mod polygon;

use std::collections::BTreeMap;

use glam::Vec2;
use nightwatch_core::{
    direction_from_angle, unsigned_angle_between, AngleConvention, ColliderRef, DetectionSink,
    GeometryQuery, LayerMask, RotationSense, TargetId, OBSTACLE_LAYER, TARGET_LAYER,
};
use serde::{Deserialize, Serialize};

pub use edge::{refine_edge, Edge, EdgeBracket};
pub use polygon::VisibilityPolygon;

/// Upper bound on the number of rays swept per polygon rebuild.
pub const MAX_STEP_COUNT: u32 = 4096;

/// Distance below which a refined edge point is treated as the agent itself.
const EDGE_POINT_EPSILON: f32 = 1e-5;

/// Tuning knobs of a single agent's field of view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Maximum sight distance in world units.
    pub view_radius: f32,
    /// Full cone angle in degrees.
    pub view_angle: f32,
    /// Rays per degree swept by the polygon rebuild.
    pub mesh_resolution: f32,
    /// Midpoint casts spent refining each silhouette edge.
    pub edge_resolve_iterations: u32,
    /// Distance jump between neighbouring hits that counts as an edge.
    pub edge_distance_threshold: f32,
    /// Layers that block sight.
    pub obstacle_mask: LayerMask,
    /// Layers holding detectable targets.
    pub target_mask: LayerMask,
    /// Axis the facing angle is measured from.
    pub convention: AngleConvention,
    /// Rotation sense of the facing angle.
    pub sense: RotationSense,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            view_radius: 5.0,
            view_angle: 90.0,
            mesh_resolution: 1.0,
            edge_resolve_iterations: 4,
            edge_distance_threshold: 0.5,
            obstacle_mask: OBSTACLE_LAYER,
            target_mask: TARGET_LAYER,
            convention: AngleConvention::UpZero,
            sense: RotationSense::CounterClockwise,
        }
    }
}

impl ViewConfig {
    /// Half of the view cone in degrees.
    #[must_use]
    pub fn half_angle(&self) -> f32 {
        self.view_angle / 2.0
    }

    /// Unit facing direction for the provided facing angle.
    #[must_use]
    pub fn facing_direction(&self, facing: f32) -> Vec2 {
        direction_from_angle(facing, self.convention, self.sense)
    }

    /// Reports whether the configuration can describe a usable view.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.view_radius.is_finite()
            && self.view_radius > 0.0
            && self.view_angle.is_finite()
            && (0.0..=360.0).contains(&self.view_angle)
            && self.mesh_resolution.is_finite()
            && self.mesh_resolution >= 0.0
            && self.edge_distance_threshold.is_finite()
            && self.edge_distance_threshold >= 0.0
    }
}

/// How a scan treats additional targets after the first visible one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPolicy {
    /// Every visible target is collected.
    #[default]
    CollectAll,
    /// The scan stops at the first visible target.
    FirstMatch,
}

/// Result of casting a single ray of the polygon sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewCast {
    /// Angle of the ray in degrees under the agent's convention.
    pub angle: f32,
    /// Whether an obstacle stopped the ray.
    pub hit: bool,
    /// World-space end point of the ray.
    pub point: Vec2,
    /// Length of the ray.
    pub distance: f32,
}

/// Casts one view ray on the obstacle mask, clipped to the view radius.
#[must_use]
pub fn view_cast(
    origin: Vec2,
    angle: f32,
    config: &ViewConfig,
    geometry: &dyn GeometryQuery,
) -> ViewCast {
    let direction = config.facing_direction(angle);
    match geometry.raycast(origin, direction, config.view_radius, config.obstacle_mask) {
        Some(hit) => ViewCast {
            angle,
            hit: true,
            point: hit.point,
            distance: hit.distance,
        },
        None => ViewCast {
            angle,
            hit: false,
            point: origin + direction * config.view_radius,
            distance: config.view_radius,
        },
    }
}

/// Ordered, deduplicated set of targets seen by the latest scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleTargets {
    targets: BTreeMap<TargetId, Vec2>,
}

impl VisibleTargets {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates the visible targets in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.targets.keys().copied()
    }

    /// World-space position a target was seen at.
    #[must_use]
    pub fn position(&self, target: TargetId) -> Option<Vec2> {
        self.targets.get(&target).copied()
    }

    /// First visible target in identifier order with its position.
    #[must_use]
    pub fn first(&self) -> Option<(TargetId, Vec2)> {
        self.targets
            .first_key_value()
            .map(|(target, position)| (*target, *position))
    }

    /// Reports whether the target was visible during the latest scan.
    #[must_use]
    pub fn contains(&self, target: TargetId) -> bool {
        self.targets.contains_key(&target)
    }

    /// Number of visible targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Reports whether no target is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Forgets every target.
    pub fn clear(&mut self) {
        self.targets.clear();
    }

    fn insert(&mut self, target: TargetId, position: Vec2) -> bool {
        self.targets.insert(target, position).is_none()
    }
}

/// Visibility system that reuses scratch buffers between calls.
#[derive(Debug, Default)]
pub struct Visibility {
    candidates: Vec<ColliderRef>,
    boundary: Vec<Vec2>,
}

impl Visibility {
    /// Creates a new visibility system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Determines which targets are visible from `origin`.
    ///
    /// The output set is cleared before it is repopulated. Each newly visible
    /// target notifies `sink` once when a sink is provided. Returns the number
    /// of visible targets.
    #[allow(clippy::too_many_arguments)]
    pub fn scan_targets(
        &mut self,
        origin: Vec2,
        facing: f32,
        config: &ViewConfig,
        policy: TargetPolicy,
        geometry: &dyn GeometryQuery,
        mut sink: Option<&mut dyn DetectionSink>,
        out: &mut VisibleTargets,
    ) -> usize {
        out.clear();

        if !(config.view_radius > 0.0) || !origin.is_finite() || !facing.is_finite() {
            return 0;
        }

        self.candidates.clear();
        self.candidates
            .extend(geometry.overlap_circle(origin, config.view_radius, config.target_mask));
        self.candidates.sort_by_key(|candidate| candidate.target);
        self.candidates.dedup_by_key(|candidate| candidate.target);

        let facing_direction = config.facing_direction(facing);
        let half_angle = config.half_angle();

        for candidate in &self.candidates {
            let offset = candidate.position - origin;
            let distance = offset.length();
            let coincident = distance <= f32::EPSILON;

            let angle = if coincident {
                0.0
            } else {
                unsigned_angle_between(offset, facing_direction)
            };
            if !(angle < half_angle) {
                continue;
            }

            if !coincident {
                let direction = offset / distance;
                if geometry
                    .raycast(origin, direction, distance, config.obstacle_mask)
                    .is_some()
                {
                    continue;
                }
            }

            if out.insert(candidate.target, candidate.position) {
                if let Some(sink) = sink.as_deref_mut() {
                    sink.notify_detected();
                }
            }

            if policy == TargetPolicy::FirstMatch {
                break;
            }
        }

        tracing::debug!(
            candidates = self.candidates.len(),
            visible = out.len(),
            "scanned view cone"
        );
        out.len()
    }

    /// Rebuilds the visibility fan seen from `origin`.
    ///
    /// Degenerate input (no rays, no radius, non-finite values) leaves `out`
    /// empty.
    pub fn rebuild_polygon(
        &mut self,
        origin: Vec2,
        facing: f32,
        config: &ViewConfig,
        geometry: &dyn GeometryQuery,
        out: &mut VisibilityPolygon,
    ) {
        self.boundary.clear();

        let Some(step_count) = step_count(origin, facing, config) else {
            out.clear(origin);
            return;
        };

        let step_angle = config.view_angle / step_count as f32;
        let start_angle = facing - config.half_angle();
        let mut previous: Option<ViewCast> = None;

        for index in 0..=step_count {
            let angle = start_angle + index as f32 * step_angle;
            let cast = view_cast(origin, angle, config, geometry);

            if let Some(previous) = previous {
                let distance_exceeded =
                    (previous.distance - cast.distance).abs() > config.edge_distance_threshold;
                if previous.hit != cast.hit || (previous.hit && cast.hit && distance_exceeded) {
                    let edge = refine_edge(origin, config, geometry, &previous, &cast);
                    if edge.point_a.distance(origin) > EDGE_POINT_EPSILON {
                        self.boundary.push(edge.point_a);
                    }
                }
            }

            self.boundary.push(cast.point);
            previous = Some(cast);
        }

        out.rebuild(origin, &self.boundary, config.sense);
    }
}

fn step_count(origin: Vec2, facing: f32, config: &ViewConfig) -> Option<u32> {
    let finite = origin.is_finite()
        && facing.is_finite()
        && config.view_radius.is_finite()
        && config.view_angle.is_finite()
        && config.mesh_resolution.is_finite();
    if !finite || !(config.view_radius > 0.0) {
        return None;
    }

    let steps = (config.view_angle * config.mesh_resolution).round();
    if !(steps >= 1.0) {
        return None;
    }

    Some((steps.min(MAX_STEP_COUNT as f32)) as u32)
}
