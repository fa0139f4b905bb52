//! Explicitly tabulated games for solver validation.
//!
//! A [`TableGame`] lists its states, terminal flags and outcome sets by hand.
//! Small tables with known solutions (a two-state chain, a tie between two
//! equally good moves, a state that should prefer a delayed reward) pin
//! down evaluation, improvement and tie-breaking exactly.
//!
//! ```text
//!  0 --go (r=10)--> 1 (terminal)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mdp::game::{GameModel, Outcome, TransitionModel};
use crate::{impl_action, impl_state};

/// A state of a tabulated game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableState(pub u32);

impl_state!(TableState);

/// A named action of a tabulated game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableAction(pub String);

impl_action!(TableAction);

/// One row of the outcome table: `(probability, next state, reward)`.
pub type TableOutcome = (f64, u32, f64);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableEntry {
    terminal: bool,
    /// Actions in declaration order.
    actions: Vec<(String, Vec<TableOutcome>)>,
}

/// A game whose whole model is written out as a table.
///
/// States are enumerated in ascending order. Only states declared through
/// the builder methods are enumerated; an outcome pointing anywhere else is
/// a model inconsistency the solver will report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableGame {
    entries: BTreeMap<u32, TableEntry>,
}

impl TableGame {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a terminal state.
    pub fn with_terminal(mut self, state: u32) -> Self {
        self.entries.entry(state).or_default().terminal = true;
        self
    }

    /// Declare a non-terminal state (without adding actions).
    pub fn with_state(mut self, state: u32) -> Self {
        self.entries.entry(state).or_default();
        self
    }

    /// Add an action to a state, declaring the state if needed.
    ///
    /// Actions are offered in the order they are added.
    pub fn with_action(mut self, state: u32, name: &str, outcomes: &[TableOutcome]) -> Self {
        self.entries
            .entry(state)
            .or_default()
            .actions
            .push((name.to_string(), outcomes.to_vec()));
        self
    }

    /// Number of declared states.
    pub fn num_states(&self) -> usize {
        self.entries.len()
    }

    /// The two-state chain: state 0 has a single action leading to the
    /// terminal state 1 with reward `reward`.
    pub fn chain(reward: f64) -> Self {
        Self::new()
            .with_action(0, "go", &[(1.0, 1, reward)])
            .with_terminal(1)
    }
}

impl GameModel for TableGame {
    type State = TableState;
    type Action = TableAction;

    fn enumerate_states(&self) -> Vec<Self::State> {
        self.entries.keys().map(|&s| TableState(s)).collect()
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        self.entries.get(&state.0).is_some_and(|e| e.terminal)
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action> {
        match self.entries.get(&state.0) {
            Some(entry) if !entry.terminal => entry
                .actions
                .iter()
                .map(|(name, _)| TableAction(name.clone()))
                .collect(),
            _ => vec![],
        }
    }

    fn action_name(&self, action: &Self::Action) -> String {
        action.0.clone()
    }
}

impl TransitionModel for TableGame {
    fn transitions(&self, state: &Self::State, action: &Self::Action) -> Vec<Outcome<Self::State>> {
        self.entries
            .get(&state.0)
            .and_then(|entry| entry.actions.iter().find(|(name, _)| *name == action.0))
            .map(|(_, outcomes)| {
                outcomes
                    .iter()
                    .map(|&(p, next, r)| Outcome::new(p, TableState(next), r))
                    .collect()
            })
            .unwrap_or_default()
    }
}
