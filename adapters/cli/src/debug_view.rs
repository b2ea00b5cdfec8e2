//! ASCII rendering of maps and agent views.

use nightwatch_core::CellCoord;
use nightwatch_system_map_generation::Placement;

const FLOOR: char = '.';
const WALL: char = '%';
const PLAYER: char = '@';
const AGENT: char = 'A';
const IN_VIEW: char = '~';

/// Character grid drawn top row first, so north points up.
#[derive(Clone, Debug)]
pub(crate) struct AsciiView {
    columns: u32,
    rows: u32,
    glyphs: Vec<char>,
}

impl AsciiView {
    /// Creates a view of floor cells surrounded by a wall.
    pub(crate) fn walled(columns: u32, rows: u32) -> Self {
        let mut view = Self {
            columns,
            rows,
            glyphs: vec![FLOOR; columns as usize * rows as usize],
        };
        for row in 0..rows {
            for column in 0..columns {
                if row == 0 || column == 0 || row + 1 == rows || column + 1 == columns {
                    view.mark(CellCoord::new(column, row), WALL);
                }
            }
        }
        view
    }

    /// Draws a layout: walls, placed objects and the player start.
    pub(crate) fn layout(
        columns: u32,
        rows: u32,
        start: CellCoord,
        placements: &[Placement],
    ) -> Self {
        let mut view = Self::walled(columns, rows);
        for placement in placements {
            view.mark(placement.cell, placement.prefab.glyph());
        }
        view.mark_player(start);
        view
    }

    /// Draws `glyph` on `cell`. Cells outside the view are ignored.
    pub(crate) fn mark(&mut self, cell: CellCoord, glyph: char) {
        if let Some(index) = self.index(cell) {
            self.glyphs[index] = glyph;
        }
    }

    /// Draws the player.
    pub(crate) fn mark_player(&mut self, cell: CellCoord) {
        self.mark(cell, PLAYER);
    }

    /// Draws an agent that was not part of the generated layout.
    pub(crate) fn mark_agent(&mut self, cell: CellCoord) {
        self.mark(cell, AGENT);
    }

    /// Shades floor cells for which `visible` holds.
    pub(crate) fn shade(&mut self, mut visible: impl FnMut(CellCoord) -> bool) {
        for row in 0..self.rows {
            for column in 0..self.columns {
                let cell = CellCoord::new(column, row);
                let Some(index) = self.index(cell) else {
                    continue;
                };
                if self.glyphs[index] == FLOOR && visible(cell) {
                    self.glyphs[index] = IN_VIEW;
                }
            }
        }
    }

    /// Renders the grid as newline-separated rows.
    pub(crate) fn render(&self) -> String {
        let width = self.columns as usize;
        let mut text = String::with_capacity(self.glyphs.len() + self.rows as usize);
        for row in (0..self.rows as usize).rev() {
            text.extend(&self.glyphs[row * width..(row + 1) * width]);
            text.push('\n');
        }
        text
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        Some(cell.row() as usize * self.columns as usize + cell.column() as usize)
    }
}
