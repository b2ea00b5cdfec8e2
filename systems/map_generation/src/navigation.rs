//! Breadth-first search over a map grid.

use std::collections::VecDeque;

use nightwatch_core::CellCoord;

use crate::grid::MapGrid;

/// Finds a shortest 4-connected path from `start` to `destination`.
///
/// The returned path includes both endpoints. `start` itself is never tested
/// against `is_blocked`. Returns `None` when the destination lies outside the
/// grid or cannot be reached.
pub fn find_path<F>(
    grid: &MapGrid,
    start: CellCoord,
    destination: CellCoord,
    mut is_blocked: F,
) -> Option<Vec<CellCoord>>
where
    F: FnMut(CellCoord) -> bool,
{
    let start_index = grid.index(start)?;
    let _ = grid.index(destination)?;
    if start == destination {
        return Some(vec![start]);
    }

    let cell_count = grid.cell_count();
    let mut parents: Vec<Option<CellCoord>> = vec![None; cell_count];
    let mut visited = vec![false; cell_count];
    visited[start_index] = true;

    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        for neighbor in grid.neighbors(cell) {
            let Some(index) = grid.index(neighbor) else {
                continue;
            };
            if visited[index] || is_blocked(neighbor) {
                continue;
            }

            visited[index] = true;
            parents[index] = Some(cell);
            if neighbor == destination {
                return Some(unwind(grid, &parents, start, destination));
            }
            queue.push_back(neighbor);
        }
    }

    None
}

fn unwind(
    grid: &MapGrid,
    parents: &[Option<CellCoord>],
    start: CellCoord,
    destination: CellCoord,
) -> Vec<CellCoord> {
    let mut path = vec![destination];
    let mut current = destination;
    while current != start {
        let Some(parent) = grid.index(current).and_then(|index| parents[index]) else {
            break;
        };
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}
