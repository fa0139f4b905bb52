//! Tic-Tac-Toe with the agent playing X against a uniformly random O.
//!
//! The opponent is folded into the transition model: after X moves, every
//! empty cell is an equally likely reply. The solver therefore only sees
//! positions with X to move, plus the terminal positions the game can end in.
//!
//! ## State Space
//!
//! Enumerating from the empty board gives 2423 non-terminal positions with X
//! to move and 958 terminal positions (3381 states total).
//!
//! ## Rewards
//!
//! | Event                     | Default |
//! |---------------------------|---------|
//! | X completes a line        | +10     |
//! | O completes a line        | -10     |
//! | Board fills with no line  | 0       |
//! | Any other transition      | 0       |

pub mod board;

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::mdp::game::{GameModel, Outcome, State, TransitionModel};
use crate::mdp::policy::FrozenPolicy;

pub use board::{Board, Cell, Player, WINNING_LINES};

impl State for Board {
    fn key(&self) -> String {
        Board::key(self)
    }
}

/// X places a piece on a cell (0..9, row by row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move(pub usize);

crate::impl_action!(Move);

/// Rewards credited to X for each kind of transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicTacToeRewards {
    /// X completes a line.
    pub win: f64,
    /// O completes a line.
    pub lose: f64,
    /// The board fills with no line.
    pub draw: f64,
    /// Any transition that does not end the game.
    pub living: f64,
}

impl Default for TicTacToeRewards {
    fn default() -> Self {
        Self {
            win: 10.0,
            lose: -10.0,
            draw: 0.0,
            living: 0.0,
        }
    }
}

impl TicTacToeRewards {
    /// Create a reward table.
    pub fn new(win: f64, lose: f64, draw: f64, living: f64) -> Self {
        Self {
            win,
            lose,
            draw,
            living,
        }
    }

    /// Reward for arriving at `board`.
    fn for_board(&self, board: &Board) -> f64 {
        match board.winner() {
            Some(Player::X) => self.win,
            Some(Player::O) => self.lose,
            None if board.is_full() => self.draw,
            None => self.living,
        }
    }
}

/// Tic-Tac-Toe game model from X's point of view.
#[derive(Debug, Clone, Default)]
pub struct TicTacToe {
    rewards: TicTacToeRewards,
}

impl TicTacToe {
    /// Create the game with default rewards.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the game with custom rewards.
    pub fn with_rewards(rewards: TicTacToeRewards) -> Self {
        Self { rewards }
    }

    /// The reward table.
    pub fn rewards(&self) -> &TicTacToeRewards {
        &self.rewards
    }

    /// Play one game of the stored policy (as X) against `opponent` (as O).
    ///
    /// # Errors
    /// [`SolverError::PolicyIncomplete`] if the policy has no legal action
    /// for a position X reaches, or [`SolverError::IllegalMove`] if the
    /// opponent picks an occupied cell.
    pub fn play_game<O: Opponent + ?Sized>(
        &self,
        policy: &FrozenPolicy,
        opponent: &mut O,
    ) -> Result<GameResult> {
        let mut board = Board::new();
        loop {
            let Move(cell) =
                policy
                    .action_for(self, &board)
                    .ok_or_else(|| SolverError::PolicyIncomplete {
                        state: board.key(),
                    })?;
            board = board.play(cell)?;
            if let Some(result) = GameResult::from_board(&board) {
                return Ok(result);
            }

            board = board.play(opponent.choose_move(&board)?)?;
            if let Some(result) = GameResult::from_board(&board) {
                return Ok(result);
            }
        }
    }
}

impl GameModel for TicTacToe {
    type State = Board;
    type Action = Move;

    fn enumerate_states(&self) -> Vec<Board> {
        let mut seen = FxHashSet::default();
        let mut states = Vec::new();
        let mut stack = vec![Board::new()];
        seen.insert(Board::new());

        while let Some(board) = stack.pop() {
            states.push(board);
            if board.is_terminal() {
                continue;
            }
            for x_cell in board.empty_cells() {
                let Ok(after_x) = board.play(x_cell) else {
                    continue;
                };
                if after_x.is_terminal() {
                    if seen.insert(after_x) {
                        stack.push(after_x);
                    }
                    continue;
                }
                for o_cell in after_x.empty_cells() {
                    if let Ok(after_o) = after_x.play(o_cell) {
                        if seen.insert(after_o) {
                            stack.push(after_o);
                        }
                    }
                }
            }
        }
        states
    }

    fn is_terminal(&self, state: &Board) -> bool {
        state.is_terminal()
    }

    fn legal_actions(&self, state: &Board) -> Vec<Move> {
        if state.is_terminal() || state.to_move != Player::X {
            return Vec::new();
        }
        state.empty_cells().into_iter().map(Move).collect()
    }

    fn is_legal(&self, state: &Board, action: &Move) -> bool {
        !state.is_terminal()
            && state.to_move == Player::X
            && action.0 < 9
            && state.cells[action.0] == Cell::Empty
    }

    fn action_name(&self, action: &Move) -> String {
        format!("cell {}", action.0)
    }

    fn state_description(&self, state: &Board) -> String {
        state.to_string()
    }
}

impl TransitionModel for TicTacToe {
    fn transitions(&self, state: &Board, action: &Move) -> Vec<Outcome<Board>> {
        let Ok(after_x) = state.play(action.0) else {
            return Vec::new();
        };
        if after_x.is_terminal() {
            return vec![Outcome::certain(after_x, self.rewards.for_board(&after_x))];
        }

        let replies = after_x.empty_cells();
        let probability = 1.0 / replies.len() as f64;
        replies
            .into_iter()
            .filter_map(|cell| after_x.play(cell).ok())
            .map(|after_o| Outcome::new(probability, after_o, self.rewards.for_board(&after_o)))
            .collect()
    }
}

/// Final result of a game, from X's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    /// X completed a line.
    Win,
    /// The board filled with no line.
    Draw,
    /// O completed a line.
    Loss,
}

impl GameResult {
    /// Result of a finished board, or `None` while play continues.
    pub fn from_board(board: &Board) -> Option<GameResult> {
        match board.winner() {
            Some(Player::X) => Some(GameResult::Win),
            Some(Player::O) => Some(GameResult::Loss),
            None if board.is_full() => Some(GameResult::Draw),
            None => None,
        }
    }
}

/// Win/draw/loss tally over several games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Games X won.
    pub wins: usize,
    /// Drawn games.
    pub draws: usize,
    /// Games X lost.
    pub losses: usize,
}

impl MatchRecord {
    /// Count one game.
    pub fn record(&mut self, result: GameResult) {
        match result {
            GameResult::Win => self.wins += 1,
            GameResult::Draw => self.draws += 1,
            GameResult::Loss => self.losses += 1,
        }
    }

    /// Total games counted.
    pub fn games(&self) -> usize {
        self.wins + self.draws + self.losses
    }
}

/// Something that picks O's moves.
pub trait Opponent {
    /// Choose an empty cell on `board`, where O is to move.
    fn choose_move(&mut self, board: &Board) -> Result<usize>;
}

/// O that picks uniformly among the empty cells, matching the transition
/// model the policy was trained against.
#[derive(Debug, Clone)]
pub struct RandomOpponent<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomOpponent<R> {
    /// Create an opponent drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Opponent for RandomOpponent<R> {
    fn choose_move(&mut self, board: &Board) -> Result<usize> {
        board
            .empty_cells()
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| SolverError::IllegalMove {
                message: format!("no empty cell for O on board {}", board.key()),
            })
    }
}
