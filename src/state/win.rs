//! Win detection.
//!
//! Scans the four axes through the cell that was just played. The rule is
//! the house rule this game has always used:
//!
//! - a contiguous run of five or more with exactly one end blocked by the
//!   opposing mark wins;
//! - a contiguous run of exactly four with neither end blocked wins.
//!
//! An open five, a five blocked at both ends, and a four with one blocked
//! end do not win. The grid edge is never a block.

use super::board::{Board, Position};

/// Scan axes, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
    /// Top-left to bottom-right
    DiagonalDown,
    /// Bottom-left to top-right
    DiagonalUp,
}

impl Axis {
    pub const ALL: [Axis; 4] = [
        Axis::Horizontal,
        Axis::Vertical,
        Axis::DiagonalDown,
        Axis::DiagonalUp,
    ];

    /// Unit step along the axis. The opposite direction is its negation.
    pub fn step(&self) -> (i64, i64) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
            Self::DiagonalDown => (1, 1),
            Self::DiagonalUp => (-1, 1),
        }
    }
}

/// Result of walking one direction from the subject cell.
struct Ray {
    cells: Vec<Position>,
    blocked: bool,
}

fn walk(board: &Board, from: Position, (dr, dc): (i64, i64)) -> Ray {
    let Some(subject) = board.mark_at(from) else {
        return Ray {
            cells: Vec::new(),
            blocked: false,
        };
    };

    let mut cells = Vec::new();
    let mut row = from.row as i64 + dr;
    let mut col = from.col as i64 + dc;

    while let Some(pos) = board.position(row, col) {
        match board.mark_at(pos) {
            Some(mark) if mark == subject => cells.push(pos),
            Some(_) => {
                return Ray {
                    cells,
                    blocked: true,
                }
            }
            None => break,
        }
        row += dr;
        col += dc;
    }

    Ray {
        cells,
        blocked: false,
    }
}

/// Check whether the mark just placed at `pos` completes a winning line.
///
/// Returns the line ordered from one end to the other, including `pos`.
/// An empty cell never wins.
pub fn check_win(board: &Board, pos: Position) -> Option<Vec<Position>> {
    board.mark_at(pos)?;

    for axis in Axis::ALL {
        let (dr, dc) = axis.step();
        let back = walk(board, pos, (-dr, -dc));
        let forward = walk(board, pos, (dr, dc));

        let run = 1 + back.cells.len() + forward.cells.len();
        let blocked = usize::from(back.blocked) + usize::from(forward.blocked);

        if (run >= 5 && blocked == 1) || (run == 4 && blocked == 0) {
            let mut line: Vec<Position> = back.cells.into_iter().rev().collect();
            line.push(pos);
            line.extend(forward.cells);
            return Some(line);
        }
    }

    None
}
