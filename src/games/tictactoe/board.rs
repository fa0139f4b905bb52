//! Board representation for Tic-Tac-Toe.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Winning line indices on the 3x3 board.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Unoccupied.
    Empty,
    /// Taken by X.
    X,
    /// Taken by O.
    O,
}

impl Cell {
    /// Single-character rendering used in keys and diagrams.
    pub fn to_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::X => 'X',
            Cell::O => 'O',
        }
    }
}

/// A side in the game. X is the learning agent and always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// The agent.
    X,
    /// The opponent.
    O,
}

impl Player {
    /// The other side.
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    fn to_cell(self) -> Cell {
        match self {
            Player::X => Cell::X,
            Player::O => Cell::O,
        }
    }
}

/// Cells plus the side to move.
///
/// Cells are numbered row by row:
///
/// ```text
///  0 | 1 | 2
/// ---+---+---
///  3 | 4 | 5
/// ---+---+---
///  6 | 7 | 8
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Cell contents, row by row.
    pub cells: [Cell; 9],
    /// Side to move next.
    pub to_move: Player,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Empty board with X to move.
    pub fn new() -> Self {
        Board {
            cells: [Cell::Empty; 9],
            to_move: Player::X,
        }
    }

    /// Parse a board from nine cell characters (`X`, `O`, `.`), row by row.
    ///
    /// The side to move is inferred from the piece counts.
    pub fn parse(cells: &str) -> Result<Self> {
        let chars: Vec<char> = cells.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.len() != 9 {
            return Err(SolverError::IllegalMove {
                message: format!("board '{}' must have 9 cells, got {}", cells, chars.len()),
            });
        }

        let mut board = Board::new();
        for (i, c) in chars.into_iter().enumerate() {
            board.cells[i] = match c {
                'X' | 'x' => Cell::X,
                'O' | 'o' => Cell::O,
                '.' | '_' | '-' => Cell::Empty,
                other => {
                    return Err(SolverError::IllegalMove {
                        message: format!("unknown cell character '{}' at position {}", other, i),
                    })
                }
            };
        }

        let x = board.count(Cell::X);
        let o = board.count(Cell::O);
        board.to_move = match x.checked_sub(o) {
            Some(0) => Player::X,
            Some(1) => Player::O,
            _ => {
                return Err(SolverError::IllegalMove {
                    message: format!("board '{}' has {} X and {} O pieces", cells, x, o),
                })
            }
        };
        Ok(board)
    }

    fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// The side holding a complete line, if any.
    pub fn winner(&self) -> Option<Player> {
        [Player::X, Player::O].into_iter().find(|&player| {
            let target = player.to_cell();
            WINNING_LINES
                .iter()
                .any(|line| line.iter().all(|&idx| self.cells[idx] == target))
        })
    }

    /// Whether every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&c| c != Cell::Empty)
    }

    /// Whether the game is over (a win or a full board).
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    /// Empty cell indices in ascending order.
    pub fn empty_cells(&self) -> Vec<usize> {
        (0..9).filter(|&i| self.cells[i] == Cell::Empty).collect()
    }

    /// Place a piece for the side to move and pass the turn.
    ///
    /// # Errors
    /// [`SolverError::IllegalMove`] if the game is over, the position is out
    /// of range or the cell is occupied.
    pub fn play(&self, position: usize) -> Result<Board> {
        if self.is_terminal() {
            return Err(SolverError::IllegalMove {
                message: format!("game is over on board {}", self.key()),
            });
        }
        if position >= 9 {
            return Err(SolverError::IllegalMove {
                message: format!("position {} is off the board", position),
            });
        }
        if self.cells[position] != Cell::Empty {
            return Err(SolverError::IllegalMove {
                message: format!("cell {} is occupied on board {}", position, self.key()),
            });
        }

        let mut next = *self;
        next.cells[position] = self.to_move.to_cell();
        next.to_move = self.to_move.opponent();
        Ok(next)
    }

    /// Canonical encoding: cells row by row, then the side to move,
    /// e.g. `XX.OO....:X`.
    pub fn key(&self) -> String {
        let mut key: String = self.cells.iter().map(|c| c.to_char()).collect();
        key.push(':');
        key.push(self.to_move.to_cell().to_char());
        key
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            let cell = |col: usize| {
                let idx = row * 3 + col;
                match self.cells[idx] {
                    Cell::Empty => char::from(b'0' + idx as u8),
                    other => other.to_char(),
                }
            };
            writeln!(f, " {} | {} | {}", cell(0), cell(1), cell(2))?;
            if row < 2 {
                writeln!(f, "---+---+---")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board() {
        let board = Board::new();
        assert_eq!(board.to_move, Player::X);
        assert_eq!(board.empty_cells().len(), 9);
        assert!(!board.is_terminal());
        assert_eq!(board.key(), ".........:X");
    }

    #[test]
    fn test_play_alternates_turns() {
        let board = Board::new().play(4).unwrap();
        assert_eq!(board.cells[4], Cell::X);
        assert_eq!(board.to_move, Player::O);

        let board = board.play(0).unwrap();
        assert_eq!(board.cells[0], Cell::O);
        assert_eq!(board.key(), "O...X....:X");
    }

    #[test]
    fn test_illegal_moves() {
        let board = Board::new().play(4).unwrap();
        assert!(matches!(board.play(4), Err(SolverError::IllegalMove { .. })));
        assert!(matches!(board.play(9), Err(SolverError::IllegalMove { .. })));

        let won = Board::parse("XXXOO....").unwrap();
        assert!(matches!(won.play(8), Err(SolverError::IllegalMove { .. })));
    }

    #[test]
    fn test_winner_detection() {
        assert_eq!(Board::parse("XXXOO....").unwrap().winner(), Some(Player::X));
        assert_eq!(Board::parse("XX.OOOX.X").unwrap().winner(), Some(Player::O));
        assert_eq!(Board::parse("X...X.OOX").unwrap().winner(), Some(Player::X));
        assert_eq!(Board::parse("XX.OO....").unwrap().winner(), None);
    }

    #[test]
    fn test_full_board_draw() {
        let board = Board::parse("XOXXOOOXX").unwrap();
        assert!(board.is_full());
        assert_eq!(board.winner(), None);
        assert!(board.is_terminal());
        assert!(board.empty_cells().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Board::parse("XX").is_err());
        assert!(Board::parse("XXQ......").is_err());
        assert!(Board::parse("XXX......").is_err());
        assert!(Board::parse("OO.......").is_err());
    }

    #[test]
    fn test_parse_infers_side_to_move() {
        assert_eq!(Board::parse("X........").unwrap().to_move, Player::O);
        assert_eq!(Board::parse("X...O....").unwrap().to_move, Player::X);
        assert_eq!(Board::parse("XX. OO. ...").unwrap().key(), "XX.OO....:X");
    }

    #[test]
    fn test_display_shows_free_cell_numbers() {
        let rendered = Board::parse("X...O....").unwrap().to_string();
        assert!(rendered.starts_with(" X | 1 | 2"));
        assert!(rendered.contains(" 3 | O | 5"));
    }
}
