//! Game implementations for the policy iteration solver.
//!
//! This module contains implementations of games that can be solved using
//! the generic solver. These serve as:
//!
//! 1. **Validation**: Small tabulated games with hand-checkable values verify
//!    that evaluation, improvement and tie-breaking are correct.
//!
//! 2. **Examples**: Demonstrate how to implement `GameModel` and
//!    `TransitionModel` for new games.
//!
//! 3. **Benchmarks**: Provide standardized games for performance testing.
//!
//! ## Available Games
//!
//! - [`tictactoe`]: Tic-Tac-Toe, the agent playing X against a random O
//! - [`table`]: Games written out as explicit outcome tables
//!
//! ## Adding New Games
//!
//! To add a new game:
//!
//! 1. Create a new module under `src/games/`
//! 2. Define state and action types and implement `State` / `Action`
//! 3. Implement `GameModel` (enumeration, legality) and `TransitionModel`
//!    (outcomes, including the opponent's reply)
//! 4. Add tests that verify expected behavior
//!
//! See the [`tictactoe`] module for a complete example.

pub mod table;
pub mod tictactoe;
