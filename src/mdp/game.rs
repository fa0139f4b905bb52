//! Game and transition model traits for the policy iteration solver.
//!
//! The solver never looks inside a game. Anything that can enumerate its
//! states, list legal actions and describe where an action leads can be
//! solved by implementing [`GameModel`] and [`TransitionModel`].

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for game states.
///
/// Two states that describe the same position (including whose turn it is)
/// must compare equal and hash equal, otherwise the state universe contains
/// duplicates and evaluation is meaningless.
pub trait State: Clone + Eq + Hash + Debug + Send + Sync {
    /// Canonical string encoding, used as the key of persisted policies.
    fn key(&self) -> String;
}

/// Trait for actions that can be taken from a state.
pub trait Action: Clone + Eq + Hash + Debug + Send + Sync {
    /// Canonical string encoding, used as the value of persisted policies.
    fn key(&self) -> String;
}

/// One possible result of taking an action: where the game goes, how likely
/// that is, and the immediate reward collected on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<S> {
    /// Probability of this outcome, in `[0, 1]`.
    pub probability: f64,
    /// The resulting state.
    pub next_state: S,
    /// Immediate reward for the transition.
    pub reward: f64,
}

impl<S> Outcome<S> {
    /// Create a new outcome.
    pub fn new(probability: f64, next_state: S, reward: f64) -> Self {
        Self {
            probability,
            next_state,
            reward,
        }
    }

    /// An outcome that happens with probability 1.
    pub fn certain(next_state: S, reward: f64) -> Self {
        Self::new(1.0, next_state, reward)
    }
}

/// The rules of a game, seen from the agent's side of the board.
///
/// # Example
/// ```ignore
/// struct MyGame;
///
/// impl GameModel for MyGame {
///     type State = MyState;
///     type Action = MyAction;
///
///     // ... implement required methods
/// }
/// ```
pub trait GameModel: Send + Sync {
    /// The type representing a game position.
    type State: State;

    /// The type representing a move.
    type Action: Action;

    /// Enumerate every reachable state the agent can observe, including
    /// terminal states.
    fn enumerate_states(&self) -> Vec<Self::State>;

    /// Check if the given state is terminal (game over).
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Legal actions from `state`, in a fixed order.
    ///
    /// The order matters: when several actions are equally good the solver
    /// picks the first one. Returns an empty vector for terminal states.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Check whether `action` may be taken from `state`.
    fn is_legal(&self, state: &Self::State, action: &Self::Action) -> bool {
        self.legal_actions(state).contains(action)
    }

    /// Get a human-readable name for an action.
    fn action_name(&self, action: &Self::Action) -> String {
        action.key()
    }

    /// Get a human-readable description of a state.
    fn state_description(&self, state: &Self::State) -> String {
        format!("{:?}", state)
    }
}

/// The dynamics of a game: the distribution over successors of a move,
/// including whatever the opponent does in reply.
pub trait TransitionModel: GameModel {
    /// Outcomes of taking `action` in `state`.
    ///
    /// Probabilities must sum to 1.0 and every successor must be one of the
    /// enumerated states. The solver rejects models that break either rule.
    fn transitions(&self, state: &Self::State, action: &Self::Action) -> Vec<Outcome<Self::State>>;
}

/// Macro to implement the [`State`] trait using the `Debug` representation
/// as the canonical key.
#[macro_export]
macro_rules! impl_state {
    ($type:ty) => {
        impl $crate::mdp::game::State for $type {
            fn key(&self) -> String {
                format!("{:?}", self)
            }
        }
    };
}

/// Macro to implement the [`Action`] trait using the `Debug` representation
/// as the canonical key.
#[macro_export]
macro_rules! impl_action {
    ($type:ty) => {
        impl $crate::mdp::game::Action for $type {
            fn key(&self) -> String {
                format!("{:?}", self)
            }
        }
    };
}
