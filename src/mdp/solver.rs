//! Policy Iteration Solver.
//!
//! This module implements the training loop: evaluate the current policy to
//! convergence, improve it greedily, and repeat until the improvement step no
//! longer changes anything. Each improvement can only raise state values and
//! there are finitely many deterministic policies, so the loop ends; the
//! configured cycle cap only guards against malformed models.
//!
//! The solver is generic over any game that implements `TransitionModel`.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::{Result, SolverError};
use crate::mdp::config::{IterationStats, PIConfig, PIStats, PolicyInit};
use crate::mdp::evaluator::{evaluate, evaluate_parallel, EvaluationReport};
use crate::mdp::game::{Action, State, TransitionModel};
use crate::mdp::improver::{improve, improve_parallel, ImprovementReport};
use crate::mdp::policy::FrozenPolicy;
use crate::mdp::storage::{PolicyTable, StateSpace, ValueTable};

/// The policy iteration solver.
///
/// Owns the state space, the value table and the training policy of one
/// game. Training produces a [`FrozenPolicy`], the only artifact handed to
/// decision-making clients.
///
/// # Example
/// ```ignore
/// use rust_pi_solver::mdp::{PIConfig, PolicyIterationSolver};
///
/// let game = MyGame::new();
/// let mut solver = PolicyIterationSolver::new(game, PIConfig::default())?;
/// let policy = solver.train();
/// println!("{} states, {} cycles", policy.len(), solver.stats().policy_iterations);
/// ```
pub struct PolicyIterationSolver<M: TransitionModel> {
    /// The game being solved.
    model: M,

    /// Configuration for the solver.
    config: PIConfig,

    /// Enumerated states with cached outcomes.
    space: StateSpace<M::State, M::Action>,

    /// Value of every state under the current policy.
    values: ValueTable,

    /// Current policy.
    policy: PolicyTable,

    /// Statistics tracking.
    stats: PIStats,

    /// Dedicated pool for parallel sweeps, if a thread count was configured.
    pool: Option<ThreadPool>,
}

impl<M: TransitionModel> PolicyIterationSolver<M> {
    /// Create a solver whose initial policy follows `config.init`.
    ///
    /// # Errors
    /// Configuration errors and model inconsistencies found while building
    /// the state space.
    pub fn new(model: M, config: PIConfig) -> Result<Self> {
        let mut solver = Self::unassigned(model, config)?;

        match solver.config.init {
            PolicyInit::Random => {
                let mut rng = match solver.config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                solver.assign_initial(|num_actions| rng.gen_range(0..num_actions));
            }
            PolicyInit::First => solver.assign_initial(|_| 0),
        }

        Ok(solver)
    }

    /// Create a solver that starts from an explicit policy.
    ///
    /// Every non-terminal state with legal actions needs an entry, and every
    /// entry must be legal for its state. Entries for terminal states are
    /// ignored.
    ///
    /// # Errors
    /// [`SolverError::MissingInitialAction`], [`SolverError::IllegalInitialAction`]
    /// or [`SolverError::UnknownPolicyState`] on a bad initial policy.
    pub fn with_initial_policy<I>(model: M, config: PIConfig, initial: I) -> Result<Self>
    where
        I: IntoIterator<Item = (M::State, M::Action)>,
    {
        let mut solver = Self::unassigned(model, config)?;

        let mut assigned: FxHashMap<usize, usize> = FxHashMap::default();
        for (state, action) in initial {
            let id = solver
                .space
                .id_of(&state)
                .ok_or_else(|| SolverError::UnknownPolicyState { state: state.key() })?;

            if solver.space.is_terminal(id) {
                continue;
            }

            let index = solver
                .space
                .actions(id)
                .iter()
                .position(|a| *a == action)
                .filter(|_| solver.model.is_legal(&state, &action))
                .ok_or_else(|| SolverError::IllegalInitialAction {
                    state: state.key(),
                    action: action.key(),
                })?;

            assigned.insert(id, index);
        }

        for id in 0..solver.space.len() {
            if solver.space.is_terminal(id) || solver.space.num_actions(id) == 0 {
                continue;
            }
            let index = assigned
                .get(&id)
                .copied()
                .ok_or_else(|| SolverError::MissingInitialAction {
                    state: solver.space.state(id).key(),
                })?;
            solver.policy.set(id, index);
        }

        Ok(solver)
    }

    /// Validate the configuration and build the state space, leaving the
    /// policy empty.
    fn unassigned(model: M, config: PIConfig) -> Result<Self> {
        config.validate()?;

        let space = StateSpace::build(&model, config.probability_tolerance)?;

        let pool = match (config.parallel, config.num_threads) {
            (true, Some(threads)) => Some(ThreadPoolBuilder::new().num_threads(threads).build()?),
            _ => None,
        };

        let stats = PIStats {
            states: space.len(),
            terminal_states: space.num_terminal(),
            ..PIStats::new()
        };

        info!(
            states = space.len(),
            terminal = space.num_terminal(),
            discount = config.discount,
            tolerance = config.tolerance,
            "policy iteration solver ready"
        );

        Ok(Self {
            values: ValueTable::zeros(space.len()),
            policy: PolicyTable::empty(space.len()),
            model,
            config,
            space,
            stats,
            pool,
        })
    }

    /// Assign an action to every non-terminal state that has one, choosing
    /// the index with `pick(num_actions)`.
    fn assign_initial<F>(&mut self, mut pick: F)
    where
        F: FnMut(usize) -> usize,
    {
        for id in 0..self.space.len() {
            let num_actions = self.space.num_actions(id);
            if self.space.is_terminal(id) || num_actions == 0 {
                continue;
            }
            self.policy.set(id, pick(num_actions));
        }
    }

    /// Evaluate the current policy to convergence (or the sweep cap).
    pub fn evaluate_policy(&mut self) -> EvaluationReport {
        let Self {
            space,
            policy,
            values,
            config,
            pool,
            ..
        } = self;

        let (discount, tolerance, max_sweeps) =
            (config.discount, config.tolerance, config.max_sweeps);

        match (config.parallel, pool.as_ref()) {
            (true, Some(pool)) => pool.install(|| {
                evaluate_parallel(space, policy, values, discount, tolerance, max_sweeps)
            }),
            (true, None) => evaluate_parallel(space, policy, values, discount, tolerance, max_sweeps),
            (false, _) => evaluate(space, policy, values, discount, tolerance, max_sweeps),
        }
    }

    /// Run one greedy improvement pass over the current values.
    pub fn improve_policy(&mut self) -> ImprovementReport {
        let Self {
            space,
            policy,
            values,
            config,
            pool,
            ..
        } = self;

        let discount = config.discount;

        match (config.parallel, pool.as_ref()) {
            (true, Some(pool)) => pool.install(|| improve_parallel(space, policy, values, discount)),
            (true, None) => improve_parallel(space, policy, values, discount),
            (false, _) => improve(space, policy, values, discount),
        }
    }

    /// Train until the policy is stable and return it frozen.
    pub fn train(&mut self) -> FrozenPolicy {
        self.train_with_callback(|_| {})
    }

    /// Train with a callback invoked after every evaluate/improve cycle.
    pub fn train_with_callback<F>(&mut self, mut callback: F) -> FrozenPolicy
    where
        F: FnMut(&IterationStats),
    {
        let start_time = Instant::now();
        let first_cycle = self.stats.policy_iterations + 1;
        let last_cycle = self.stats.policy_iterations + self.config.max_policy_iterations;
        let mut stable = false;
        let mut evaluation_converged = true;

        for iteration in first_cycle..=last_cycle {
            let evaluation = self.evaluate_policy();
            let improvement = self.improve_policy();
            evaluation_converged = evaluation.converged;

            let cycle = IterationStats {
                iteration,
                sweeps: evaluation.sweeps,
                max_delta: evaluation.max_delta,
                evaluation_converged: evaluation.converged,
                states_changed: improvement.states_changed,
            };
            debug!(
                iteration,
                sweeps = evaluation.sweeps,
                states_changed = improvement.states_changed,
                "policy iteration cycle"
            );
            callback(&cycle);
            self.stats.record_cycle(cycle);

            if !improvement.changed {
                stable = true;
                break;
            }
        }

        if !stable {
            warn!(
                cycles = self.config.max_policy_iterations,
                "policy still changing at the iteration cap; returning the current policy"
            );
            // Bring the values in line with the policy being returned.
            let evaluation = self.evaluate_policy();
            self.stats.total_sweeps += evaluation.sweeps;
            evaluation_converged = evaluation.converged;
        }

        self.stats.converged = stable && evaluation_converged;
        self.stats.elapsed_seconds += start_time.elapsed().as_secs_f64();

        info!(
            cycles = self.stats.policy_iterations,
            sweeps = self.stats.total_sweeps,
            converged = self.stats.converged,
            elapsed = self.stats.elapsed_seconds,
            "training finished"
        );

        self.freeze()
    }

    /// Copy the current policy into an immutable artifact.
    pub fn freeze(&self) -> FrozenPolicy {
        let mut frozen = FrozenPolicy::new(self.config.discount, self.config.tolerance);
        for id in 0..self.space.len() {
            if let Some(index) = self.policy.get(id) {
                frozen.insert(
                    self.space.state(id).key(),
                    self.space.actions(id)[index].key(),
                );
            }
        }
        frozen.set_stats(self.stats.clone());
        frozen
    }

    /// Value of a state under the current policy.
    pub fn value_of(&self, state: &M::State) -> Option<f64> {
        self.space.id_of(state).map(|id| self.values.get(id))
    }

    /// Action the current policy takes in a state (`None` for terminal or
    /// unknown states).
    pub fn action_of(&self, state: &M::State) -> Option<&M::Action> {
        let id = self.space.id_of(state)?;
        let index = self.policy.get(id)?;
        self.space.actions(id).get(index)
    }

    /// Values of all states, keyed by state.
    pub fn value_map(&self) -> FxHashMap<M::State, f64> {
        self.space
            .states()
            .iter()
            .cloned()
            .zip(self.values.as_slice().iter().copied())
            .collect()
    }

    /// Reset values to 0 and statistics to empty. The policy is kept.
    pub fn reset_values(&mut self) {
        self.values.clear();
        self.stats = PIStats {
            states: self.space.len(),
            terminal_states: self.space.num_terminal(),
            ..PIStats::new()
        };
    }

    /// Get current statistics.
    pub fn stats(&self) -> &PIStats {
        &self.stats
    }

    /// Get reference to the game.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &PIConfig {
        &self.config
    }

    /// Get reference to the state space.
    pub fn space(&self) -> &StateSpace<M::State, M::Action> {
        &self.space
    }

    /// Get reference to the value table.
    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    /// Get reference to the training policy.
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }
}
