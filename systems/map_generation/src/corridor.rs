//! Meandering corridors carved from the player start to key objects.

use nightwatch_core::{CellCoord, Direction};
use rand::{seq::SliceRandom, Rng, RngCore};

use crate::grid::MapGrid;

const RANDOM_RETRIES: usize = 4;

/// Walks from `start` toward `destination`, protecting every visited cell
/// and its interior 4-neighbourhood.
///
/// Each step heads in a random cardinal direction with probability
/// `random_step_chance`, otherwise straight at the destination. A blocked
/// step is retried with a few random directions and finally the direct step;
/// when that is blocked too the walk stops early. The destination is always
/// enterable and always ends up protected. Returns the number of steps taken.
pub(crate) fn carve(
    grid: &mut MapGrid,
    start: CellCoord,
    destination: CellCoord,
    random_step_chance: f32,
    step_cap: u64,
    rng: &mut dyn RngCore,
) -> u64 {
    let mut current = start;
    let mut steps = 0;

    while current != destination && steps < step_cap {
        grid.set_path_protected(current, true);

        let direct = direct_step(current, destination);
        let mut next = if rng.gen::<f32>() < random_step_chance {
            random_step(current, rng)
        } else {
            direct
        };

        let mut retries = 0;
        while !enterable(grid, next, destination) && retries < RANDOM_RETRIES {
            next = random_step(current, rng);
            retries += 1;
        }

        if !enterable(grid, next, destination) {
            next = direct;
        }

        let Some(cell) = next.filter(|cell| enterable(grid, Some(*cell), destination)) else {
            tracing::debug!(?current, ?destination, steps, "corridor walk stuck");
            break;
        };

        current = cell;
        steps += 1;
        protect_area(grid, current);
    }

    grid.set_path_protected(destination, true);
    steps
}

fn direct_step(current: CellCoord, destination: CellCoord) -> Option<CellCoord> {
    let dx = i64::from(destination.column()) - i64::from(current.column());
    let dy = i64::from(destination.row()) - i64::from(current.row());
    current.offset(dx.signum() as i32, dy.signum() as i32)
}

fn random_step(current: CellCoord, rng: &mut dyn RngCore) -> Option<CellCoord> {
    Direction::ALL
        .choose(rng)
        .and_then(|direction| current.step(*direction))
}

fn enterable(grid: &MapGrid, cell: Option<CellCoord>, destination: CellCoord) -> bool {
    cell.map_or(false, |cell| {
        grid.contains(cell) && (cell == destination || !grid.is_occupied(cell))
    })
}

fn protect_area(grid: &mut MapGrid, center: CellCoord) {
    let area = [(0, 0), (0, 1), (0, -1), (1, 0), (-1, 0)];
    for (dx, dy) in area {
        if let Some(cell) = center.offset(dx, dy) {
            if grid.is_interior(cell) || cell == center {
                grid.set_path_protected(cell, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::carve;
    use crate::grid::MapGrid;
    use nightwatch_core::CellCoord;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn direct_walk_protects_a_corridor() {
        let start = CellCoord::new(1, 1);
        let destination = CellCoord::new(5, 1);
        let mut grid = MapGrid::walled(8, 8, start);
        grid.set_occupied(destination, true);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let steps = carve(&mut grid, start, destination, 0.0, 256, &mut rng);

        assert_eq!(steps, 4);
        for column in 1..=5 {
            assert!(grid.is_path_protected(CellCoord::new(column, 1)));
        }
        for column in 2..=5 {
            assert!(grid.is_path_protected(CellCoord::new(column, 2)));
        }
        for column in 0..8 {
            assert!(
                !grid.is_path_protected(CellCoord::new(column, 0)),
                "borders stay walls"
            );
        }
    }

    #[test]
    fn meandering_walk_never_protects_borders() {
        let start = CellCoord::new(1, 1);
        let destination = CellCoord::new(8, 8);

        for seed in 0..16 {
            let mut grid = MapGrid::walled(10, 10, start);
            grid.set_occupied(destination, true);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let _ = carve(&mut grid, start, destination, 0.7, 400, &mut rng);

            assert!(grid.is_path_protected(destination));
            for cell in grid.cells() {
                if grid.is_path_protected(cell) {
                    assert!(grid.is_interior(cell), "{cell:?} is on the border");
                }
            }
        }
    }

    #[test]
    fn step_cap_stops_the_walk() {
        let start = CellCoord::new(1, 1);
        let destination = CellCoord::new(8, 8);
        let mut grid = MapGrid::walled(10, 10, start);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let steps = carve(&mut grid, start, destination, 0.0, 2, &mut rng);

        assert_eq!(steps, 2);
        assert!(grid.is_path_protected(CellCoord::new(3, 3)));
        assert!(!grid.is_path_protected(CellCoord::new(4, 4)));
        assert!(grid.is_path_protected(destination), "destination is always marked");
    }

    #[test]
    fn boxed_in_walk_stops_early() {
        let start = CellCoord::new(2, 2);
        let destination = CellCoord::new(5, 5);
        let mut grid = MapGrid::walled(8, 8, start);
        for (column, row) in [(2, 3), (3, 2), (1, 2), (2, 1), (3, 3)] {
            grid.set_occupied(CellCoord::new(column, row), true);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let steps = carve(&mut grid, start, destination, 0.7, 256, &mut rng);

        assert_eq!(steps, 0);
        assert!(grid.is_path_protected(start));
    }
}
