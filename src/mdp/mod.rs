//! Policy Iteration Solver Module.
//!
//! This module provides a policy iteration solver for finite, fully
//! enumerable two-player games in which the opponent's behaviour is folded
//! into the transition model, turning the game into a Markov Decision
//! Process for the agent.
//!
//! # Overview
//!
//! Policy iteration alternates two steps until the policy stops changing:
//! 1. **Policy evaluation**: compute the value of every state under the
//!    current policy by sweeping the Bellman expectation update until the
//!    largest change in a sweep is below the tolerance
//! 2. **Policy improvement**: in every non-terminal state, switch to the
//!    action with the highest one-step lookahead value
//!
//! # Usage
//!
//! 1. Implement `GameModel` and `TransitionModel` for your game
//! 2. Create a `PolicyIterationSolver` with your game and a `PIConfig`
//! 3. Call `train()` to obtain a `FrozenPolicy`
//! 4. Query it with `FrozenPolicy::action_for`, or save it with `save_json`
//!
//! # Example
//!
//! ```ignore
//! use rust_pi_solver::mdp::{PIConfig, PolicyIterationSolver};
//!
//! let game = MyGame::new();
//! let config = PIConfig::default().with_discount(0.9).with_seed(42);
//! let mut solver = PolicyIterationSolver::new(game, config)?;
//!
//! let policy = solver.train();
//! println!(
//!     "Solved {} states in {} cycles ({:.2}s)",
//!     solver.stats().states,
//!     solver.stats().policy_iterations,
//!     solver.stats().elapsed_seconds,
//! );
//! policy.save_json("policy.json")?;
//! ```
//!
//! # Theory
//!
//! **Bellman expectation**: the value of a state under policy π.
//! ```text
//! V(s) = Σ_{s'} P(s' | s, π(s)) × (R(s, π(s), s') + γ × V(s'))
//! ```
//!
//! **Greedy improvement**: the new policy takes the best one-step action.
//! ```text
//! π'(s) = argmax_a Σ_{s'} P(s' | s, a) × (R(s, a, s') + γ × V(s'))
//! ```
//!
//! **Convergence**: each improvement step yields V^π' ≥ V^π pointwise, and a
//! finite game has finitely many deterministic policies, so the loop reaches
//! a policy that improvement leaves unchanged. That policy is optimal.
//!
//! # References
//!
//! - Howard, R. A. "Dynamic Programming and Markov Processes" (1960)
//! - Sutton, R. S., Barto, A. G. "Reinforcement Learning: An Introduction", ch. 4 (2018)

pub mod config;
pub mod evaluator;
pub mod game;
pub mod improver;
pub mod policy;
pub mod solver;
pub mod storage;

// Re-export main types for convenient access
pub use config::{ConfigError, IterationStats, PIConfig, PIStats, PolicyInit};
pub use evaluator::EvaluationReport;
pub use game::{Action, GameModel, Outcome, State, TransitionModel};
pub use improver::ImprovementReport;
pub use policy::FrozenPolicy;
pub use solver::PolicyIterationSolver;
pub use storage::{PolicyTable, StateId, StateSpace, Transition, ValueTable};
