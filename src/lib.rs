//! # Rust PI Solver
//!
//! A policy iteration solver for computing optimal policies in finite,
//! turn-based, two-player games played against a fixed opponent model.
//!
//! ## Features
//!
//! - **Generic Engine**: Works with any game implementing `GameModel` and
//!   `TransitionModel`
//! - **Deterministic**: Stable tie-breaking in improvement; seeded initial policies
//! - **Parallel Sweeps**: Optional Jacobi evaluation on a rayon pool
//! - **Model Validation**: Probability sums and successor states are checked
//!   before training starts
//! - **Persistence**: Save trained policies as JSON and load them to skip training
//!
//! ## Quick Start
//!
//! ```ignore
//! use rust_pi_solver::mdp::{PIConfig, PolicyIterationSolver};
//! use rust_pi_solver::games::tictactoe::TicTacToe;
//!
//! // 1. Pick (or implement) a game model
//! // 2. Create a solver
//! let mut solver = PolicyIterationSolver::new(TicTacToe::new(), PIConfig::default())?;
//!
//! // 3. Train
//! let policy = solver.train();
//!
//! // 4. Query the policy
//! let action = policy.action_for(solver.model(), &state);
//! ```
//!
//! ## Modules
//!
//! - [`mdp`]: Core policy iteration algorithm and solver
//! - [`games`]: Game implementations (tic-tac-toe, tabulated test games)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Policy Iteration Solver (Generic)               │
//! │  - Policy evaluation       - Policy improvement                 │
//! │  - Training loop           - Frozen policy export               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ implements GameModel + TransitionModel
//!                               ▼
//!              ┌────────────────┴────────────────┐
//!              │                                 │
//!              ▼                                 ▼
//!        ┌─────────────┐                  ┌─────────────┐
//!        │ Tic-Tac-Toe │                  │ Table Games │
//!        │ vs. random  │                  │ (validation)│
//!        └─────────────┘                  └─────────────┘
//! ```

#![warn(missing_docs)]

/// Error types shared across the crate.
pub mod error;

/// Policy iteration solver module.
///
/// This is the core module containing the generic algorithm.
pub mod mdp;

/// Game implementations module.
///
/// Contains tic-tac-toe and explicitly tabulated games for validation.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use error::{Result, SolverError};
pub use mdp::{
    Action, FrozenPolicy, GameModel, Outcome, PIConfig, PIStats, PolicyIterationSolver, State,
    TransitionModel,
};
