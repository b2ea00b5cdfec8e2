//! Intersection routines for the collider shapes supported by the world.

use glam::Vec2;
use nightwatch_core::ColliderShape;

const PARALLEL_EPSILON: f32 = 1e-8;

/// Distance along the ray at which it enters the shape, if within `max_distance`.
///
/// A ray that starts inside the shape hits at distance zero.
#[must_use]
pub(crate) fn ray_distance(
    shape: ColliderShape,
    center: Vec2,
    origin: Vec2,
    direction: Vec2,
    max_distance: f32,
) -> Option<f32> {
    let distance = match shape {
        ColliderShape::Circle { radius } => ray_circle(center, radius, origin, direction)?,
        ColliderShape::Box { half_extents } => {
            ray_box(center - half_extents, center + half_extents, origin, direction)?
        }
    };

    (distance <= max_distance).then_some(distance)
}

/// Reports whether the shape overlaps a circle.
#[must_use]
pub(crate) fn overlaps_circle(
    shape: ColliderShape,
    center: Vec2,
    circle_center: Vec2,
    circle_radius: f32,
) -> bool {
    match shape {
        ColliderShape::Circle { radius } => {
            let reach = radius + circle_radius;
            center.distance_squared(circle_center) <= reach * reach
        }
        ColliderShape::Box { half_extents } => {
            let closest = circle_center.clamp(center - half_extents, center + half_extents);
            closest.distance_squared(circle_center) <= circle_radius * circle_radius
        }
    }
}

/// Reports whether a world-space point lies inside the shape.
#[must_use]
pub(crate) fn contains_point(shape: ColliderShape, center: Vec2, point: Vec2) -> bool {
    overlaps_circle(shape, center, point, 0.0)
}

fn ray_circle(center: Vec2, radius: f32, origin: Vec2, direction: Vec2) -> Option<f32> {
    let offset = origin - center;
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let b = offset.dot(direction);
    if b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    Some((-b - discriminant.sqrt()).max(0.0))
}

fn ray_box(min: Vec2, max: Vec2, origin: Vec2, direction: Vec2) -> Option<f32> {
    let mut entry = 0.0_f32;
    let mut exit = f32::INFINITY;

    for axis in 0..2 {
        let start = origin[axis];
        let heading = direction[axis];
        let (low, high) = (min[axis], max[axis]);

        if heading.abs() < PARALLEL_EPSILON {
            if start < low || start > high {
                return None;
            }
            continue;
        }

        let inverse = 1.0 / heading;
        let mut near = (low - start) * inverse;
        let mut far = (high - start) * inverse;
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }

        entry = entry.max(near);
        exit = exit.min(far);
        if entry > exit {
            return None;
        }
    }

    Some(entry)
}
