//! Storage for the state universe, state values and the training policy.
//!
//! States are given dense integer ids in enumeration order. Everything the
//! evaluator and improver touch is indexed by those ids: the values live in a
//! flat `Vec<f64>`, the policy in a `Vec<Option<usize>>` of action indices,
//! and the outcome sets of every legal (state, action) pair are fetched from
//! the transition model once, validated, and kept with successor ids.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{Result, SolverError};
use crate::mdp::game::{Action, State, TransitionModel};

/// Dense index of a state in the enumerated universe.
pub type StateId = usize;

/// A validated outcome with its successor resolved to a state id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Successor state.
    pub next: StateId,
    /// Probability of this outcome.
    pub probability: f64,
    /// Immediate reward.
    pub reward: f64,
}

/// Expected one-step return of an outcome set:
/// `Σ probability × (reward + discount × V(next))`.
pub fn expected_value(outcomes: &[Transition], values: &[f64], discount: f64) -> f64 {
    outcomes
        .iter()
        .map(|t| t.probability * (t.reward + discount * values[t.next]))
        .sum()
}

/// The enumerated state universe of a game together with its legal actions
/// and cached outcome sets.
#[derive(Debug, Clone)]
pub struct StateSpace<S, A> {
    /// States in enumeration order: state id -> state
    states: Vec<S>,

    /// Reverse lookup: state -> state id
    ids: FxHashMap<S, StateId>,

    /// Terminal flag per state
    terminal: Vec<bool>,

    /// Legal actions per state, in model order
    actions: Vec<Vec<A>>,

    /// Outcomes per state, per action index
    outcomes: Vec<Vec<Vec<Transition>>>,

    /// Non-terminal states that have no legal actions
    dead_ends: usize,
}

impl<S: State, A: Action> StateSpace<S, A> {
    /// Enumerate and validate the state space of a model.
    ///
    /// # Errors
    /// - [`SolverError::EmptyStateSpace`] if the model enumerates nothing
    /// - [`SolverError::DuplicateState`] if a state is enumerated twice
    /// - [`SolverError::InvalidProbability`], [`SolverError::ProbabilitySum`]
    ///   or [`SolverError::UnknownSuccessor`] if an outcome set is malformed
    pub fn build<M>(model: &M, probability_tolerance: f64) -> Result<Self>
    where
        M: TransitionModel<State = S, Action = A>,
    {
        let states = model.enumerate_states();
        if states.is_empty() {
            return Err(SolverError::EmptyStateSpace);
        }

        let mut ids = FxHashMap::with_capacity_and_hasher(states.len(), Default::default());
        for (id, state) in states.iter().enumerate() {
            if ids.insert(state.clone(), id).is_some() {
                return Err(SolverError::DuplicateState { state: state.key() });
            }
        }

        let terminal: Vec<bool> = states.iter().map(|s| model.is_terminal(s)).collect();

        let mut actions = Vec::with_capacity(states.len());
        let mut outcomes = Vec::with_capacity(states.len());
        let mut dead_ends = 0;

        for (id, state) in states.iter().enumerate() {
            if terminal[id] {
                actions.push(Vec::new());
                outcomes.push(Vec::new());
                continue;
            }

            let legal = model.legal_actions(state);
            if legal.is_empty() {
                dead_ends += 1;
                warn!(
                    state = %state.key(),
                    "non-terminal state has no legal actions; its value will not be updated"
                );
            }

            let mut per_action = Vec::with_capacity(legal.len());
            for action in &legal {
                let resolved =
                    resolve_outcomes(model, &ids, state, action, probability_tolerance)?;
                per_action.push(resolved);
            }

            actions.push(legal);
            outcomes.push(per_action);
        }

        let space = Self {
            states,
            ids,
            terminal,
            actions,
            outcomes,
            dead_ends,
        };

        debug!(
            states = space.len(),
            terminal = space.num_terminal(),
            dead_ends = space.dead_ends,
            "state space built"
        );

        Ok(space)
    }

    /// Look up the id of a state.
    pub fn id_of(&self, state: &S) -> Option<StateId> {
        self.ids.get(state).copied()
    }
}

impl<S, A> StateSpace<S, A> {
    /// Number of states in the universe.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the universe is empty (never true for a built space).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The state with the given id.
    pub fn state(&self, id: StateId) -> &S {
        &self.states[id]
    }

    /// All states in id order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Check if a state is terminal.
    pub fn is_terminal(&self, id: StateId) -> bool {
        self.terminal[id]
    }

    /// Number of terminal states.
    pub fn num_terminal(&self) -> usize {
        self.terminal.iter().filter(|&&t| t).count()
    }

    /// Number of non-terminal states without legal actions.
    pub fn num_dead_ends(&self) -> usize {
        self.dead_ends
    }

    /// Legal actions of a state, in model order.
    pub fn actions(&self, id: StateId) -> &[A] {
        &self.actions[id]
    }

    /// Number of legal actions of a state.
    pub fn num_actions(&self, id: StateId) -> usize {
        self.actions[id].len()
    }

    /// Outcomes of taking the `action`-th legal action in a state.
    pub fn outcomes(&self, id: StateId, action: usize) -> &[Transition] {
        &self.outcomes[id][action]
    }

    /// Expected one-step return of the `action`-th legal action in a state.
    pub fn action_value(&self, id: StateId, action: usize, values: &[f64], discount: f64) -> f64 {
        expected_value(self.outcomes(id, action), values, discount)
    }

    /// Number of distinct deterministic policies over this space (saturating).
    pub fn num_policies(&self) -> u128 {
        self.actions
            .iter()
            .filter(|a| !a.is_empty())
            .fold(1u128, |acc, a| acc.saturating_mul(a.len() as u128))
    }
}

/// Fetch, validate and resolve the outcome set of one (state, action) pair.
fn resolve_outcomes<M: TransitionModel>(
    model: &M,
    ids: &FxHashMap<M::State, StateId>,
    state: &M::State,
    action: &M::Action,
    probability_tolerance: f64,
) -> Result<Vec<Transition>> {
    let raw = model.transitions(state, action);
    let mut resolved = Vec::with_capacity(raw.len());
    let mut sum = 0.0;

    for outcome in raw {
        if !(0.0..=1.0).contains(&outcome.probability) {
            return Err(SolverError::InvalidProbability {
                state: state.key(),
                action: action.key(),
                probability: outcome.probability,
            });
        }

        let next = ids
            .get(&outcome.next_state)
            .copied()
            .ok_or_else(|| SolverError::UnknownSuccessor {
                state: state.key(),
                action: action.key(),
                successor: outcome.next_state.key(),
            })?;

        sum += outcome.probability;
        resolved.push(Transition {
            next,
            probability: outcome.probability,
            reward: outcome.reward,
        });
    }

    if (sum - 1.0).abs() > probability_tolerance {
        return Err(SolverError::ProbabilitySum {
            state: state.key(),
            action: action.key(),
            sum,
        });
    }

    Ok(resolved)
}

/// State values, indexed by state id.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    values: Vec<f64>,
}

impl ValueTable {
    /// A table with every state valued at 0.
    pub fn zeros(num_states: usize) -> Self {
        Self {
            values: vec![0.0; num_states],
        }
    }

    /// Value of a state.
    pub fn get(&self, id: StateId) -> f64 {
        self.values[id]
    }

    /// Set the value of a state.
    pub fn set(&mut self, id: StateId, value: f64) {
        self.values[id] = value;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in id order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Mutable values in id order.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Replace every value at once (used by snapshot sweeps).
    pub fn replace(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.values.len());
        self.values = values;
    }

    /// Reset every value to 0.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Deterministic training policy: for every state, the index of the chosen
/// action in that state's legal-action list, or `None` when no action is
/// taken (terminal states).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    actions: Vec<Option<usize>>,
}

impl PolicyTable {
    /// A policy with no action assigned anywhere.
    pub fn empty(num_states: usize) -> Self {
        Self {
            actions: vec![None; num_states],
        }
    }

    /// Action index chosen for a state.
    pub fn get(&self, id: StateId) -> Option<usize> {
        self.actions[id]
    }

    /// Choose an action index for a state.
    pub fn set(&mut self, id: StateId, action: usize) {
        self.actions[id] = Some(action);
    }

    /// Number of entries (assigned or not).
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of states with an assigned action.
    pub fn num_assigned(&self) -> usize {
        self.actions.iter().filter(|a| a.is_some()).count()
    }

    /// Action indices in id order.
    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::table::{TableAction, TableGame, TableState};
    use crate::mdp::game::{GameModel, Outcome};

    fn chain() -> TableGame {
        TableGame::new()
            .with_action(0, "go", &[(1.0, 1, 10.0)])
            .with_terminal(1)
    }

    #[test]
    fn test_build_assigns_dense_ids() {
        let space = StateSpace::build(&chain(), 1e-9).unwrap();
        assert_eq!(space.len(), 2);
        assert_eq!(space.id_of(&TableState(0)), Some(0));
        assert_eq!(space.id_of(&TableState(1)), Some(1));
        assert_eq!(space.id_of(&TableState(7)), None);
        assert!(!space.is_terminal(0));
        assert!(space.is_terminal(1));
        assert_eq!(space.num_terminal(), 1);
        assert_eq!(space.actions(0), &[TableAction("go".to_string())]);
        assert_eq!(
            space.outcomes(0, 0),
            &[Transition {
                next: 1,
                probability: 1.0,
                reward: 10.0
            }]
        );
        assert_eq!(space.num_policies(), 1);
    }

    #[test]
    fn test_probability_sum_rejected() {
        let game = TableGame::new()
            .with_action(0, "go", &[(0.5, 1, 1.0), (0.4, 1, 1.0)])
            .with_terminal(1);
        let err = StateSpace::build(&game, 1e-9).unwrap_err();
        assert!(matches!(err, SolverError::ProbabilitySum { .. }));
        assert!(err.is_model_inconsistency());
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let game = TableGame::new()
            .with_action(0, "go", &[(1.5, 1, 1.0), (-0.5, 1, 1.0)])
            .with_terminal(1);
        let err = StateSpace::build(&game, 1e-9).unwrap_err();
        assert!(matches!(err, SolverError::InvalidProbability { .. }));
    }

    #[test]
    fn test_unknown_successor_rejected() {
        // State 9 is never declared, so it is not enumerated.
        let game = TableGame::new().with_action(0, "go", &[(1.0, 9, 1.0)]);
        let err = StateSpace::build(&game, 1e-9).unwrap_err();
        assert!(matches!(err, SolverError::UnknownSuccessor { .. }));
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Twice;
    crate::impl_state!(Twice);

    struct DuplicatingGame;

    impl GameModel for DuplicatingGame {
        type State = Twice;
        type Action = TableAction;

        fn enumerate_states(&self) -> Vec<Twice> {
            vec![Twice, Twice]
        }

        fn is_terminal(&self, _state: &Twice) -> bool {
            true
        }

        fn legal_actions(&self, _state: &Twice) -> Vec<TableAction> {
            vec![]
        }
    }

    impl TransitionModel for DuplicatingGame {
        fn transitions(&self, _state: &Twice, _action: &TableAction) -> Vec<Outcome<Twice>> {
            vec![]
        }
    }

    #[test]
    fn test_duplicate_state_rejected() {
        let err = StateSpace::build(&DuplicatingGame, 1e-9).unwrap_err();
        assert!(matches!(err, SolverError::DuplicateState { .. }));
        assert!(err.is_model_inconsistency());
    }

    #[test]
    fn test_empty_state_space_rejected() {
        let err = StateSpace::build(&TableGame::new(), 1e-9).unwrap_err();
        assert!(matches!(err, SolverError::EmptyStateSpace));
    }

    #[test]
    fn test_dead_end_counted() {
        let game = chain().with_state(2);
        let space = StateSpace::build(&game, 1e-9).unwrap();
        assert_eq!(space.num_dead_ends(), 1);
        assert_eq!(space.num_actions(2), 0);
    }

    #[test]
    fn test_expected_value() {
        let outcomes = [
            Transition {
                next: 0,
                probability: 0.25,
                reward: 4.0,
            },
            Transition {
                next: 1,
                probability: 0.75,
                reward: 0.0,
            },
        ];
        let values = [2.0, 8.0];
        // 0.25 * (4 + 0.5 * 2) + 0.75 * (0 + 0.5 * 8) = 1.25 + 3.0
        assert!((expected_value(&outcomes, &values, 0.5) - 4.25).abs() < 1e-12);
    }

    #[test]
    fn test_value_and_policy_tables() {
        let mut values = ValueTable::zeros(3);
        values.set(1, 2.5);
        assert_eq!(values.get(1), 2.5);
        values.replace(vec![1.0, 2.0, 3.0]);
        assert_eq!(values.as_slice(), &[1.0, 2.0, 3.0]);
        values.clear();
        assert_eq!(values.as_slice(), &[0.0, 0.0, 0.0]);

        let mut policy = PolicyTable::empty(3);
        assert_eq!(policy.num_assigned(), 0);
        policy.set(0, 2);
        assert_eq!(policy.get(0), Some(2));
        assert_eq!(policy.get(1), None);
        assert_eq!(policy.num_assigned(), 1);
    }
}
