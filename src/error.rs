//! Error types for the policy iteration solver.

use thiserror::Error;

use crate::mdp::config::ConfigError;

/// Main error type for the crate.
///
/// Every variant is fatal for the run that produced it: configuration
/// problems are reported before training starts, model inconsistencies as
/// soon as the state space is built, and persistence failures when a policy
/// is saved or loaded. Evaluation that fails to converge is not an error; it
/// is reported through the solver's statistics instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SolverError {
    /// Solver parameters failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The game model enumerated no states.
    #[error("game model enumerated no states")]
    EmptyStateSpace,

    /// The same state appeared twice in the enumeration.
    #[error("state '{state}' was enumerated more than once")]
    DuplicateState {
        /// Key of the repeated state.
        state: String,
    },

    /// An explicit initial policy chose an action that is not legal.
    #[error("initial policy assigns illegal action '{action}' to state '{state}'")]
    IllegalInitialAction {
        /// Key of the state.
        state: String,
        /// Key of the rejected action.
        action: String,
    },

    /// An explicit initial policy left a non-terminal state without an action.
    #[error("initial policy has no action for non-terminal state '{state}'")]
    MissingInitialAction {
        /// Key of the uncovered state.
        state: String,
    },

    /// An explicit initial policy named a state the model never enumerated.
    #[error("initial policy names state '{state}', which is not in the enumerated state space")]
    UnknownPolicyState {
        /// Key of the unknown state.
        state: String,
    },

    /// Outcome probabilities of an action do not sum to 1.
    #[error("outcome probabilities of '{action}' in state '{state}' sum to {sum}, expected 1.0")]
    ProbabilitySum {
        /// Key of the state.
        state: String,
        /// Key of the action.
        action: String,
        /// Actual sum of the outcome probabilities.
        sum: f64,
    },

    /// An outcome probability lies outside `[0, 1]`.
    #[error("outcome probability {probability} of '{action}' in state '{state}' is outside [0, 1]")]
    InvalidProbability {
        /// Key of the state.
        state: String,
        /// Key of the action.
        action: String,
        /// The offending probability.
        probability: f64,
    },

    /// An outcome leads to a state the model never enumerated.
    #[error("'{action}' in state '{state}' leads to '{successor}', which is not in the enumerated state space")]
    UnknownSuccessor {
        /// Key of the state.
        state: String,
        /// Key of the action.
        action: String,
        /// Key of the unknown successor.
        successor: String,
    },

    /// A stored policy names an action that is not legal in its state.
    #[error("stored policy action '{action}' is not legal in state '{state}'")]
    PolicyMismatch {
        /// Key of the state.
        state: String,
        /// Stored action key.
        action: String,
    },

    /// A stored policy has no action for a state that needs one.
    #[error("stored policy has no action for non-terminal state '{state}'")]
    PolicyIncomplete {
        /// Key of the uncovered state.
        state: String,
    },

    /// A move was played that the board does not allow.
    #[error("invalid move: {message}")]
    IllegalMove {
        /// What was wrong with the move.
        message: String,
    },

    /// The dedicated rayon pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Reading or writing a file failed.
    #[error("failed to {operation}: {source}")]
    Io {
        /// What was being done, e.g. "open policy file policy.json".
        operation: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Results using the crate's error type.
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// Whether the error was caused by the run's configuration (parameters or
    /// initial policy) rather than by the game model.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SolverError::Config(_)
                | SolverError::IllegalInitialAction { .. }
                | SolverError::MissingInitialAction { .. }
                | SolverError::UnknownPolicyState { .. }
                | SolverError::ThreadPool(_)
        )
    }

    /// Whether the error was caused by an inconsistent game or transition
    /// model.
    pub fn is_model_inconsistency(&self) -> bool {
        matches!(
            self,
            SolverError::EmptyStateSpace
                | SolverError::DuplicateState { .. }
                | SolverError::ProbabilitySum { .. }
                | SolverError::InvalidProbability { .. }
                | SolverError::UnknownSuccessor { .. }
        )
    }
}
