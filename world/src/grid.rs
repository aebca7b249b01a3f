//! Dense cell grid holding terrain, occupants, healing values and highlights.

use keybound_core::{CellCoord, Occupant};
use thiserror::Error;

/// Single terrain tile stacked on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainLayer {
    walkable: bool,
}

impl TerrainLayer {
    /// Creates a terrain layer with the provided walkability.
    #[must_use]
    pub const fn new(walkable: bool) -> Self {
        Self { walkable }
    }

    /// Reports whether the layer lets entities through.
    #[must_use]
    pub const fn walkable(&self) -> bool {
        self.walkable
    }
}

/// Visual classification of a highlighted cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Highlight {
    /// The pawn may move into the cell.
    Move,
    /// The pawn may attack the enemy standing in the cell.
    Attack,
}

/// Failures raised when mutating cell occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The coordinate lies outside the grid.
    #[error("cell {0:?} is outside the grid")]
    OutOfBounds(CellCoord),
    /// The cell already holds an occupant.
    #[error("cell {cell:?} is already occupied by {occupant:?}")]
    Occupied {
        /// Cell that was targeted.
        cell: CellCoord,
        /// Occupant already present.
        occupant: Occupant,
    },
}

/// One square of the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    coord: CellCoord,
    layers: Vec<TerrainLayer>,
    occupant: Option<Occupant>,
    heal_value: u32,
    highlight: Option<Highlight>,
}

impl Cell {
    fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            layers: Vec::new(),
            occupant: None,
            heal_value: 0,
            highlight: None,
        }
    }

    /// Position of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Terrain layers in stacking order.
    #[must_use]
    pub fn layers(&self) -> &[TerrainLayer] {
        &self.layers
    }

    /// A cell is walkable when every one of its layers is.
    #[must_use]
    pub fn walkable(&self) -> bool {
        self.layers.iter().all(TerrainLayer::walkable)
    }

    /// Current occupant, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<Occupant> {
        self.occupant
    }

    /// Health restored at the end of each round to a pawn standing here.
    #[must_use]
    pub const fn heal_value(&self) -> u32 {
        self.heal_value
    }

    /// Reports whether the cell is a healing tile.
    #[must_use]
    pub const fn is_healing(&self) -> bool {
        self.heal_value > 0
    }

    /// Highlight currently applied to the cell.
    #[must_use]
    pub const fn highlight(&self) -> Option<Highlight> {
        self.highlight
    }

    /// Reports whether the cell is highlighted.
    #[must_use]
    pub const fn is_highlighted(&self) -> bool {
        self.highlight.is_some()
    }
}

/// Fixed-size matrix of cells stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid of bare, walkable cells.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let mut cells = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                cells.push(Cell::new(CellCoord::new(column, row)));
            }
        }
        Self {
            columns,
            rows,
            cells,
        }
    }

    /// Number of columns and rows.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Retrieves a cell by coordinate.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Iterator over every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Reports whether the cell exists and is walkable.
    #[must_use]
    pub fn walkable(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some_and(Cell::walkable)
    }

    /// Occupant of the cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Occupant> {
        self.cell(cell).and_then(Cell::occupant)
    }

    /// Puts an occupant on an empty cell. Occupied cells are never overwritten.
    pub fn place(&mut self, cell: CellCoord, occupant: Occupant) -> Result<(), GridError> {
        let slot = self.cell_mut(cell).ok_or(GridError::OutOfBounds(cell))?;
        if let Some(existing) = slot.occupant {
            return Err(GridError::Occupied {
                cell,
                occupant: existing,
            });
        }
        slot.occupant = Some(occupant);
        Ok(())
    }

    /// Removes and returns the occupant of the cell.
    pub fn clear(&mut self, cell: CellCoord) -> Option<Occupant> {
        self.cell_mut(cell).and_then(|slot| slot.occupant.take())
    }

    /// Stacks a terrain layer on the cell.
    pub fn add_layer(&mut self, cell: CellCoord, layer: TerrainLayer) -> Result<(), GridError> {
        let slot = self.cell_mut(cell).ok_or(GridError::OutOfBounds(cell))?;
        slot.layers.push(layer);
        Ok(())
    }

    /// Turns the cell into a healing tile.
    pub fn set_heal_value(&mut self, cell: CellCoord, heal_value: u32) -> Result<(), GridError> {
        let slot = self.cell_mut(cell).ok_or(GridError::OutOfBounds(cell))?;
        slot.heal_value = heal_value;
        Ok(())
    }

    /// Highlights the cell with the provided classification.
    pub fn highlight(&mut self, cell: CellCoord, highlight: Highlight) {
        if let Some(slot) = self.cell_mut(cell) {
            slot.highlight = Some(highlight);
        }
    }

    /// Removes any highlight from the cell. Idempotent.
    pub fn unhighlight(&mut self, cell: CellCoord) {
        if let Some(slot) = self.cell_mut(cell) {
            slot.highlight = None;
        }
    }

    /// Removes every highlight on the board.
    pub fn clear_highlights(&mut self) {
        for cell in &mut self.cells {
            cell.highlight = None;
        }
    }

    /// Coordinates of every highlighted cell in row-major order.
    #[must_use]
    pub fn highlighted_cells(&self) -> Vec<CellCoord> {
        self.cells
            .iter()
            .filter(|cell| cell.is_highlighted())
            .map(Cell::coord)
            .collect()
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        self.index(cell).and_then(|index| self.cells.get_mut(index))
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
