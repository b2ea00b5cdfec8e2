//! Binary-search refinement of silhouette edges between two view casts.

use glam::Vec2;
use nightwatch_core::GeometryQuery;

use crate::{view_cast, ViewCast, ViewConfig};

/// Refined silhouette boundary between two adjacent view casts.
///
/// `point_a` is the last sample that agreed with the A-side cast and
/// `point_b` the last sample that did not. A bound the search never moved
/// keeps the point of the cast it started from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// Last sampled point consistent with the A-side cast.
    pub point_a: Vec2,
    /// Last sampled point consistent with the B-side cast.
    pub point_b: Vec2,
}

/// Angular bracket narrowed one midpoint cast at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeBracket {
    reference: ViewCast,
    min_angle: f32,
    max_angle: f32,
    edge: Edge,
}

impl EdgeBracket {
    /// Opens a bracket spanning the angles of the two casts.
    ///
    /// Every step is judged against `cast_a`, never against later samples.
    #[must_use]
    pub fn new(cast_a: &ViewCast, cast_b: &ViewCast) -> Self {
        Self {
            reference: *cast_a,
            min_angle: cast_a.angle,
            max_angle: cast_b.angle,
            edge: Edge {
                point_a: cast_a.point,
                point_b: cast_b.point,
            },
        }
    }

    /// Casts at the midpoint and moves whichever bound it agrees with.
    pub fn step(
        &mut self,
        origin: Vec2,
        config: &ViewConfig,
        geometry: &dyn GeometryQuery,
    ) {
        let angle = (self.min_angle + self.max_angle) / 2.0;
        let cast = view_cast(origin, angle, config, geometry);

        let distance_exceeded =
            (self.reference.distance - cast.distance).abs() > config.edge_distance_threshold;
        if cast.hit == self.reference.hit && !distance_exceeded {
            self.min_angle = angle;
            self.edge.point_a = cast.point;
        } else {
            self.max_angle = angle;
            self.edge.point_b = cast.point;
        }
    }

    /// Lower bound of the bracket in degrees.
    #[must_use]
    pub const fn min_angle(&self) -> f32 {
        self.min_angle
    }

    /// Upper bound of the bracket in degrees.
    #[must_use]
    pub const fn max_angle(&self) -> f32 {
        self.max_angle
    }

    /// Angular width of the bracket in degrees.
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.max_angle - self.min_angle).abs()
    }

    /// Edge points reached so far.
    #[must_use]
    pub const fn edge(&self) -> Edge {
        self.edge
    }
}

/// Locates the silhouette edge between two casts with a fixed number of steps.
///
/// Runs exactly `config.edge_resolve_iterations` midpoint casts; there is no
/// convergence check.
#[must_use]
pub fn refine_edge(
    origin: Vec2,
    config: &ViewConfig,
    geometry: &dyn GeometryQuery,
    cast_a: &ViewCast,
    cast_b: &ViewCast,
) -> Edge {
    let mut bracket = EdgeBracket::new(cast_a, cast_b);
    for _ in 0..config.edge_resolve_iterations {
        bracket.step(origin, config, geometry);
    }
    bracket.edge()
}
