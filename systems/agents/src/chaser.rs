//! Grid-stepping movement that drifts toward a visible target.

use glam::Vec2;
use nightwatch_core::{GeometryQuery, LayerMask};
use rand::Rng;

use crate::profile::ChaseConfig;

const CARDINAL_STEPS: [Vec2; 4] = [Vec2::Y, Vec2::NEG_Y, Vec2::NEG_X, Vec2::X];
const DIAGONAL_STEPS: [Vec2; 4] = [
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, -1.0),
];

/// Picks the next step for a chaser standing at `position`.
///
/// With probability `meanness` and a known target the free step that lands
/// closest to the target wins; otherwise a free step is drawn uniformly.
/// Returns `None` when every step is blocked.
pub(crate) fn decide_step<R: Rng + ?Sized>(
    position: Vec2,
    target: Option<Vec2>,
    config: &ChaseConfig,
    obstacle_mask: LayerMask,
    geometry: &dyn GeometryQuery,
    rng: &mut R,
) -> Option<Vec2> {
    let diagonal: &[Vec2] = if config.diagonal { &DIAGONAL_STEPS } else { &[] };
    let free: Vec<Vec2> = CARDINAL_STEPS
        .iter()
        .chain(diagonal)
        .copied()
        .filter(|step| !step_blocked(position, *step, config.body_radius, obstacle_mask, geometry))
        .collect();

    if free.is_empty() {
        return None;
    }

    if let Some(target) = target {
        if rng.gen::<f32>() < config.meanness {
            let mut best = free[0];
            let mut best_distance = f32::MAX;
            for step in &free {
                let distance = (position + *step).distance(target);
                if distance < best_distance {
                    best_distance = distance;
                    best = *step;
                }
            }
            return Some(best);
        }
    }

    Some(free[rng.gen_range(0..free.len())])
}

/// Approximates a swept disc with a centre-line ray plus disc samples at the
/// midpoint and the destination.
fn step_blocked(
    position: Vec2,
    step: Vec2,
    radius: f32,
    obstacle_mask: LayerMask,
    geometry: &dyn GeometryQuery,
) -> bool {
    let length = step.length();
    if geometry
        .raycast(position, step / length, length, obstacle_mask)
        .is_some()
    {
        return true;
    }

    [0.5, 1.0].iter().any(|fraction| {
        !geometry
            .overlap_circle(position + step * *fraction, radius, obstacle_mask)
            .is_empty()
    })
}
