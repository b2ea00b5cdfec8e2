//! Occupancy and path protection layers of a generated map.

use nightwatch_core::CellCoord;

/// Two boolean layers over a `width x height` grid, stored row-major.
///
/// A cell is blocking when it is occupied and not path-protected. Cells
/// outside the grid count as occupied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapGrid {
    width: u32,
    height: u32,
    occupied: Vec<bool>,
    protected: Vec<bool>,
}

impl MapGrid {
    /// Creates a grid with every cell free and unprotected.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let cell_count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            occupied: vec![false; cell_count],
            protected: vec![false; cell_count],
        }
    }

    /// Creates a grid with occupied borders and a protected, occupied start.
    #[must_use]
    pub fn walled(width: u32, height: u32, start: CellCoord) -> Self {
        let mut grid = Self::new(width, height);
        for cell in grid.cells().collect::<Vec<_>>() {
            if !grid.is_interior(cell) {
                grid.set_occupied(cell, true);
            }
        }
        grid.set_occupied(start, true);
        grid.set_path_protected(start, true);
        grid
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Reports whether the cell lies inside the grid and off its border.
    #[must_use]
    pub const fn is_interior(&self, cell: CellCoord) -> bool {
        cell.column() > 0
            && cell.row() > 0
            && cell.column() < self.width.saturating_sub(1)
            && cell.row() < self.height.saturating_sub(1)
    }

    /// Whether an object or wall fills the cell.
    #[must_use]
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(true, |index| self.occupied[index])
    }

    /// Whether the cell belongs to a carved corridor.
    #[must_use]
    pub fn is_path_protected(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(false, |index| self.protected[index])
    }

    /// Whether the cell stops movement.
    #[must_use]
    pub fn is_blocking(&self, cell: CellCoord) -> bool {
        self.is_occupied(cell) && !self.is_path_protected(cell)
    }

    /// Marks or clears occupancy. Cells outside the grid are ignored.
    pub fn set_occupied(&mut self, cell: CellCoord, occupied: bool) {
        if let Some(index) = self.index(cell) {
            self.occupied[index] = occupied;
        }
    }

    /// Marks or clears path protection. Cells outside the grid are ignored.
    pub fn set_path_protected(&mut self, cell: CellCoord, protected: bool) {
        if let Some(index) = self.index(cell) {
            self.protected[index] = protected;
        }
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.height)
            .flat_map(move |row| (0..self.width).map(move |column| CellCoord::new(column, row)))
    }

    /// Cells sharing an edge with `cell` that lie inside the grid.
    pub(crate) fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        [(0, 1), (0, -1), (1, 0), (-1, 0)]
            .into_iter()
            .filter_map(move |(dx, dy)| cell.offset(dx, dy))
            .filter(move |neighbor| self.contains(*neighbor))
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.occupied.len()
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

#[cfg(test)]
mod tests {
    use super::MapGrid;
    use nightwatch_core::CellCoord;

    #[test]
    fn walled_grid_marks_borders_and_start() {
        let start = CellCoord::new(1, 1);
        let grid = MapGrid::walled(5, 4, start);

        for cell in grid.cells() {
            let on_border = !grid.is_interior(cell);
            if on_border {
                assert!(grid.is_blocking(cell), "{cell:?} should be a wall");
            }
        }
        assert!(grid.is_occupied(start));
        assert!(grid.is_path_protected(start));
        assert!(!grid.is_blocking(start));
        assert!(!grid.is_occupied(CellCoord::new(2, 2)));
    }

    #[test]
    fn outside_cells_are_occupied_but_unprotected() {
        let mut grid = MapGrid::new(3, 3);
        let outside = CellCoord::new(3, 0);

        grid.set_path_protected(outside, true);

        assert!(grid.is_occupied(outside));
        assert!(!grid.is_path_protected(outside));
        assert!(grid.is_blocking(outside));
    }

    #[test]
    fn neighbors_stay_inside_the_grid() {
        let grid = MapGrid::new(3, 3);
        let corner: Vec<_> = grid.neighbors(CellCoord::new(0, 0)).collect();
        assert_eq!(corner, vec![CellCoord::new(0, 1), CellCoord::new(1, 0)]);
        assert_eq!(grid.neighbors(CellCoord::new(1, 1)).count(), 4);
    }

    #[test]
    fn cells_iterate_row_major() {
        let grid = MapGrid::new(2, 2);
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
            ]
        );
    }
}
