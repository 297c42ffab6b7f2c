//! Board state.
//!
//! A square grid of cells stored row-major. Cells only ever go from empty
//! to marked; the winning flag is the one thing that changes afterwards.

use serde::{Deserialize, Serialize};

/// Default board side length.
pub const BOARD_SIZE: usize = 24;

/// The two marks a seated player can write into the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }

    /// The other mark.
    pub fn opponent(&self) -> Mark {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

/// A single board cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// `None` while the cell is empty
    pub mark: Option<Mark>,
    /// Set on every cell of the winning line once a match is won
    pub is_winning: bool,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.mark.is_none()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "mark": self.mark.map(|m| m.as_str()),
            "is_winning": self.is_winning
        })
    }
}

/// Board position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({"row": self.row, "col": self.col})
    }
}

/// Why a mark could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMove {
    #[error("Move is outside the board")]
    OutOfBounds,
    #[error("Cell already occupied")]
    CellOccupied,
}

/// Square game board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct RawBoard {
    size: usize,
    cells: Vec<Cell>,
}

impl TryFrom<RawBoard> for Board {
    type Error = String;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        if raw.cells.len() != raw.size * raw.size {
            return Err(format!(
                "board of side {} needs {} cells, got {}",
                raw.size,
                raw.size * raw.size,
                raw.cells.len()
            ));
        }
        Ok(Self {
            size: raw.size,
            cells: raw.cells,
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BOARD_SIZE)
    }
}

impl Board {
    /// Create an empty board with the given side length.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size * size],
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bounds check on signed coordinates.
    pub fn is_inside(&self, row: i64, col: i64) -> bool {
        let size = self.size as i64;
        (0..size).contains(&row) && (0..size).contains(&col)
    }

    /// Convert signed coordinates into a position on this board.
    pub fn position(&self, row: i64, col: i64) -> Option<Position> {
        if self.is_inside(row, col) {
            Some(Position::new(row as usize, col as usize))
        } else {
            None
        }
    }

    /// Get the cell at a position.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        if pos.row < self.size && pos.col < self.size {
            self.cells.get(pos.row * self.size + pos.col)
        } else {
            None
        }
    }

    /// Mark at a position, `None` when empty or off the board.
    pub fn mark_at(&self, pos: Position) -> Option<Mark> {
        self.get(pos).and_then(|c| c.mark)
    }

    /// Check that a mark could be placed at `pos` without placing it.
    pub fn check_placeable(&self, pos: Position) -> Result<(), InvalidMove> {
        match self.get(pos) {
            None => Err(InvalidMove::OutOfBounds),
            Some(cell) if !cell.is_empty() => Err(InvalidMove::CellOccupied),
            Some(_) => Ok(()),
        }
    }

    /// Place a mark. Fails without touching the board if the position is
    /// off the grid or already taken.
    pub fn place(&mut self, pos: Position, mark: Mark) -> Result<(), InvalidMove> {
        self.check_placeable(pos)?;
        let size = self.size;
        self.cells[pos.row * size + pos.col].mark = Some(mark);
        Ok(())
    }

    /// Flag the given positions as part of the winning line.
    pub fn mark_winning_line(&mut self, line: &[Position]) {
        for pos in line {
            if pos.row < self.size && pos.col < self.size {
                let size = self.size;
                self.cells[pos.row * size + pos.col].is_winning = true;
            }
        }
    }

    /// Iterate rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size.max(1))
    }

    /// Number of marked cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Positions flagged as winning, row-major.
    pub fn winning_cells(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_winning)
            .map(|(i, _)| Position::new(i / self.size, i % self.size))
            .collect()
    }

    /// Rows of cells for clients.
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows()
            .map(|row| serde_json::Value::Array(row.iter().map(|c| c.to_json()).collect()))
            .collect();
        serde_json::Value::Array(rows)
    }
}
