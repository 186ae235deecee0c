use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

/// Row-major index of a cell: `row * cols + col`
pub type CellId = usize;

/// Tag shown in debug dumps for a walkable cell
pub const TAG_CLEAR: char = '.';
/// Tag shown in debug dumps for a blocked cell
pub const TAG_BLOCKED: char = 'B';

/// A (row, col) coordinate on the grid. May be out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub fn new(row: i32, col: i32) -> Self {
        GridPos { row, col }
    }

    /// Number of king moves between two positions
    pub fn chebyshev(&self, other: &GridPos) -> i32 {
        (self.row - other.row).abs().max((self.col - other.col).abs())
    }
}

/// A single navigation cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
    pub id: CellId,
    walkable: bool,
    /// Debug-only marker, e.g. which kind of obstacle sits here
    pub tag: char,
}

impl Cell {
    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    pub fn pos(&self) -> GridPos {
        GridPos::new(self.row, self.col)
    }
}

/// Compass directions, in the order `neighbors8` reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// (row, col) offset. North is towards row 0.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::NorthEast => (-1, 1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (1, -1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        let (dr, dc) = self.offset();
        dr != 0 && dc != 0
    }
}

/// Navigation grid: fixed dimensions, per-cell walkability, centered on the world origin
#[derive(Debug, Clone)]
pub struct Grid {
    rows: i32,
    cols: i32,
    cell_size: f32,
    cells: Vec<Cell>,
    /// Revision number - incremented whenever walkability changes
    revision: u64,
}

impl Grid {
    /// Create a new grid with every cell walkable
    pub fn new(rows: i32, cols: i32, cell_size: f32) -> NavResult<Self> {
        if rows <= 0 || cols <= 0 {
            return Err(NavError::InvalidDimensions { rows, cols });
        }
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(NavError::InvalidCellSize(cell_size));
        }

        let count = rows
            .checked_mul(cols)
            .ok_or(NavError::InvalidDimensions { rows, cols })?;

        let mut cells = Vec::with_capacity(count as usize);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    row,
                    col,
                    id: (row * cols + col) as CellId,
                    walkable: true,
                    tag: TAG_CLEAR,
                });
            }
        }

        Ok(Grid {
            rows,
            cols,
            cell_size,
            cells,
            revision: 0,
        })
    }

    /// Create a grid with specific blocked cells. Out-of-range ids are ignored.
    pub fn with_blocked(rows: i32, cols: i32, cell_size: f32, blocked: &[CellId]) -> NavResult<Self> {
        let mut grid = Self::new(rows, cols, cell_size)?;
        for &id in blocked {
            if let Some(cell) = grid.cells.get_mut(id) {
                cell.walkable = false;
                cell.tag = TAG_BLOCKED;
            }
        }
        Ok(grid)
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Carry a revision number over from a saved grid
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && row < self.rows && col >= 0 && col < self.cols
    }

    /// Convert (row, col) to a cell id
    pub fn id_of(&self, row: i32, col: i32) -> Option<CellId> {
        if self.in_bounds(row, col) {
            Some((row * self.cols + col) as CellId)
        } else {
            None
        }
    }

    /// Convert a cell id back to its coordinates
    pub fn coords(&self, id: CellId) -> GridPos {
        let cols = self.cols as usize;
        GridPos::new((id / cols) as i32, (id % cols) as i32)
    }

    /// Cell at (row, col), or `None` when out of range
    pub fn cell_at(&self, row: i32, col: i32) -> Option<&Cell> {
        self.id_of(row, col).map(|id| &self.cells[id])
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Out of bounds is never walkable
    pub fn is_walkable(&self, row: i32, col: i32) -> bool {
        self.cell_at(row, col).is_some_and(Cell::is_walkable)
    }

    /// The eight compass neighbors in N,S,E,W,NE,NW,SE,SW order.
    ///
    /// Entries are `None` only when out of bounds; blocked cells are still
    /// returned, so callers decide what walkability means for them.
    pub fn neighbors8(&self, cell: &Cell) -> [Option<&Cell>; 8] {
        Direction::ALL.map(|dir| {
            let (dr, dc) = dir.offset();
            self.cell_at(cell.row + dr, cell.col + dc)
        })
    }

    /// In-bounds neighbors paired with the direction they lie in
    pub fn neighbors(&self, cell: &Cell) -> impl Iterator<Item = (Direction, &Cell)> {
        Direction::ALL
            .into_iter()
            .zip(self.neighbors8(cell))
            .filter_map(|(dir, n)| n.map(|n| (dir, n)))
    }

    /// |Δrow| + |Δcol|
    pub fn manhattan_steps(a: GridPos, b: GridPos) -> u32 {
        (a.row - b.row).unsigned_abs() + (a.col - b.col).unsigned_abs()
    }

    /// Manhattan distance scaled by the cell size
    pub fn manhattan_distance(&self, a: GridPos, b: GridPos) -> f32 {
        Self::manhattan_steps(a, b) as f32 * self.cell_size
    }

    /// Center of a cell's footprint in world space (y = 0)
    pub fn world_position(&self, row: i32, col: i32) -> Vec3 {
        let cs = self.cell_size;
        Vec3::new(
            col as f32 * cs - self.cols as f32 * cs / 2.0 + cs / 2.0,
            0.0,
            row as f32 * cs - self.rows as f32 * cs / 2.0 + cs / 2.0,
        )
    }

    /// Grid coordinates whose footprint contains `pos`; may be out of range
    pub fn world_to_grid(&self, pos: Vec3) -> GridPos {
        let cs = self.cell_size;
        let col = ((pos.x + self.cols as f32 * cs / 2.0) / cs).floor();
        let row = ((pos.z + self.rows as f32 * cs / 2.0) / cs).floor();
        GridPos::new(row as i32, col as i32)
    }

    /// Inverse of `world_position`: the cell whose footprint contains `pos`
    pub fn cell_at_world(&self, pos: Vec3) -> Option<&Cell> {
        if !pos.is_finite() {
            return None;
        }
        let p = self.world_to_grid(pos);
        self.cell_at(p.row, p.col)
    }

    /// Mark a cell blocked. Returns false when out of range.
    pub fn set_occupied(&mut self, row: i32, col: i32) -> bool {
        self.place_obstacle(row, col, TAG_BLOCKED)
    }

    /// Mark a cell blocked and label it for debug output
    pub fn place_obstacle(&mut self, row: i32, col: i32, tag: char) -> bool {
        let Some(id) = self.id_of(row, col) else {
            return false;
        };
        let cell = &mut self.cells[id];
        cell.tag = tag;
        if cell.walkable {
            cell.walkable = false;
            self.revision += 1;
        }
        true
    }

    /// Mark a cell walkable. Returns false when out of range.
    pub fn set_clear(&mut self, row: i32, col: i32) -> bool {
        let Some(id) = self.id_of(row, col) else {
            return false;
        };
        let cell = &mut self.cells[id];
        cell.tag = TAG_CLEAR;
        if !cell.walkable {
            cell.walkable = true;
            self.revision += 1;
        }
        true
    }

    /// Ids of every blocked cell, ascending
    pub fn blocked_cells(&self) -> Vec<CellId> {
        self.cells
            .iter()
            .filter(|c| !c.walkable)
            .map(|c| c.id)
            .collect()
    }
}
