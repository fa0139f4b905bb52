//! Policy evaluation.
//!
//! Repeatedly applies the Bellman expectation update for a fixed policy
//!
//! ```text
//! V(s) = Σ prob × (reward + γ × V(s'))
//! ```
//!
//! until a full sweep changes no value by `tolerance` or more. With γ < 1 the
//! update is a contraction, so this terminates on any finite state space; the
//! sweep cap only matters for malformed input.
//!
//! Two sweep schedules are provided:
//! - [`evaluate`]: in-place (Gauss-Seidel), each update sees the values
//!   already written earlier in the same sweep
//! - [`evaluate_parallel`]: snapshot (Jacobi), every state reads the values
//!   from the start of the sweep, so states can be updated concurrently
//!
//! Both converge to the same fixed point.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::mdp::storage::{PolicyTable, StateSpace, ValueTable};

/// Result of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Number of full sweeps performed.
    pub sweeps: usize,
    /// Largest absolute value change in the final sweep.
    pub max_delta: f64,
    /// Whether the final sweep met the tolerance. `false` means the sweep
    /// cap was hit and the values are best-effort.
    pub converged: bool,
}

/// Evaluate `policy` with in-place sweeps, updating `values`.
///
/// Terminal states are pinned to 0. Non-terminal states without an action
/// keep their current value and contribute nothing to the sweep delta.
pub fn evaluate<S, A>(
    space: &StateSpace<S, A>,
    policy: &PolicyTable,
    values: &mut ValueTable,
    discount: f64,
    tolerance: f64,
    max_sweeps: usize,
) -> EvaluationReport {
    run_sweeps(max_sweeps, tolerance, || {
        sweep_in_place(space, policy, values.as_mut_slice(), discount)
    })
}

/// Evaluate `policy` with snapshot sweeps computed on the current rayon pool.
pub fn evaluate_parallel<S: Sync, A: Sync>(
    space: &StateSpace<S, A>,
    policy: &PolicyTable,
    values: &mut ValueTable,
    discount: f64,
    tolerance: f64,
    max_sweeps: usize,
) -> EvaluationReport {
    run_sweeps(max_sweeps, tolerance, || {
        sweep_snapshot(space, policy, values, discount)
    })
}

/// Drive sweeps until one falls under `tolerance` or the cap is reached.
fn run_sweeps<F>(max_sweeps: usize, tolerance: f64, mut sweep: F) -> EvaluationReport
where
    F: FnMut() -> f64,
{
    let mut sweeps = 0;
    let mut max_delta = f64::INFINITY;

    while sweeps < max_sweeps {
        max_delta = sweep();
        sweeps += 1;
        trace!(sweep = sweeps, max_delta, "evaluation sweep");

        if max_delta < tolerance {
            return EvaluationReport {
                sweeps,
                max_delta,
                converged: true,
            };
        }
    }

    warn!(
        sweeps,
        max_delta,
        tolerance,
        "policy evaluation did not converge; returning best-effort values"
    );

    EvaluationReport {
        sweeps,
        max_delta,
        converged: false,
    }
}

/// One Gauss-Seidel sweep in state-id order. Returns the largest change.
fn sweep_in_place<S, A>(
    space: &StateSpace<S, A>,
    policy: &PolicyTable,
    values: &mut [f64],
    discount: f64,
) -> f64 {
    let mut max_delta: f64 = 0.0;

    for id in 0..space.len() {
        let new_value = match backup(space, policy, values, discount, id) {
            Some(v) => v,
            None => continue,
        };
        let delta = (new_value - values[id]).abs();
        values[id] = new_value;
        max_delta = max_delta.max(delta);
    }

    max_delta
}

/// One Jacobi sweep: all backups read the values from before the sweep.
fn sweep_snapshot<S: Sync, A: Sync>(
    space: &StateSpace<S, A>,
    policy: &PolicyTable,
    values: &mut ValueTable,
    discount: f64,
) -> f64 {
    let snapshot = values.as_slice();

    let updated: Vec<f64> = (0..space.len())
        .into_par_iter()
        .map(|id| backup(space, policy, snapshot, discount, id).unwrap_or(snapshot[id]))
        .collect();

    let max_delta = updated
        .par_iter()
        .zip(snapshot.par_iter())
        .map(|(new, old)| (new - old).abs())
        .reduce(|| 0.0, f64::max);

    values.replace(updated);
    max_delta
}

/// New value of one state, or `None` if the state is never updated.
#[inline]
fn backup<S, A>(
    space: &StateSpace<S, A>,
    policy: &PolicyTable,
    values: &[f64],
    discount: f64,
    id: usize,
) -> Option<f64> {
    if space.is_terminal(id) {
        return Some(0.0);
    }

    let action = policy.get(id)?;
    Some(space.action_value(id, action, values, discount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::table::TableGame;
    use crate::mdp::storage::StateSpace;

    fn first_action_policy<S, A>(space: &StateSpace<S, A>) -> PolicyTable {
        let mut policy = PolicyTable::empty(space.len());
        for id in 0..space.len() {
            if !space.is_terminal(id) && space.num_actions(id) > 0 {
                policy.set(id, 0);
            }
        }
        policy
    }

    #[test]
    fn test_two_state_chain() {
        let space = StateSpace::build(&TableGame::chain(10.0), 1e-9).unwrap();
        let policy = first_action_policy(&space);
        let mut values = ValueTable::zeros(space.len());

        let report = evaluate(&space, &policy, &mut values, 0.9, 1e-6, 100);

        assert!(report.converged);
        assert!((values.get(0) - 10.0).abs() < 1e-6);
        assert_eq!(values.get(1), 0.0);
    }

    #[test]
    fn test_terminal_values_pinned_to_zero() {
        let space = StateSpace::build(&TableGame::chain(10.0), 1e-9).unwrap();
        let policy = first_action_policy(&space);
        let mut values = ValueTable::zeros(space.len());
        values.set(1, 123.0);

        evaluate(&space, &policy, &mut values, 0.9, 1e-6, 100);
        assert_eq!(values.get(1), 0.0);
        // State 0 reads the stale terminal value in the first sweep only.
        assert!((values.get(0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_only_terminal_states_is_noop() {
        let space = StateSpace::build(&TableGame::new().with_terminal(0), 1e-9).unwrap();
        let policy = PolicyTable::empty(space.len());
        let mut values = ValueTable::zeros(space.len());

        let report = evaluate(&space, &policy, &mut values, 0.9, 1e-6, 100);
        assert_eq!(report.sweeps, 1);
        assert!(report.converged);
        assert_eq!(values.get(0), 0.0);
    }

    #[test]
    fn test_self_loop_converges_to_geometric_sum() {
        // 0 -> 0 with reward 1 forever: V = 1 / (1 - γ) = 2 at γ = 0.5.
        let game = TableGame::new().with_action(0, "stay", &[(1.0, 0, 1.0)]);
        let space = StateSpace::build(&game, 1e-9).unwrap();
        let policy = first_action_policy(&space);
        let mut values = ValueTable::zeros(space.len());

        let report = evaluate(&space, &policy, &mut values, 0.5, 1e-9, 1_000);
        assert!(report.converged);
        assert!((values.get(0) - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_sweep_cap_reports_non_convergence() {
        let game = TableGame::new().with_action(0, "stay", &[(1.0, 0, 1.0)]);
        let space = StateSpace::build(&game, 1e-9).unwrap();
        let policy = first_action_policy(&space);
        let mut values = ValueTable::zeros(space.len());

        let report = evaluate(&space, &policy, &mut values, 0.99, 1e-12, 5);
        assert!(!report.converged);
        assert_eq!(report.sweeps, 5);
        // Best-effort values are kept: 1 + 0.99 + ... (5 terms)
        let expected: f64 = (0..5).map(|k| 0.99f64.powi(k)).sum();
        assert!((values.get(0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_dead_end_keeps_value() {
        let game = TableGame::chain(10.0).with_state(2);
        let space = StateSpace::build(&game, 1e-9).unwrap();
        let policy = first_action_policy(&space);
        let mut values = ValueTable::zeros(space.len());
        values.set(2, 3.0);

        let report = evaluate(&space, &policy, &mut values, 0.9, 1e-6, 100);
        assert!(report.converged);
        assert_eq!(values.get(2), 3.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let game = TableGame::new()
            .with_action(0, "a", &[(0.5, 1, 1.0), (0.5, 2, -1.0)])
            .with_action(1, "b", &[(0.3, 0, 2.0), (0.7, 3, 5.0)])
            .with_action(2, "c", &[(1.0, 1, 0.5)])
            .with_terminal(3);
        let space = StateSpace::build(&game, 1e-9).unwrap();
        let policy = first_action_policy(&space);

        let mut sequential = ValueTable::zeros(space.len());
        let mut parallel = ValueTable::zeros(space.len());
        let seq = evaluate(&space, &policy, &mut sequential, 0.9, 1e-10, 10_000);
        let par = evaluate_parallel(&space, &policy, &mut parallel, 0.9, 1e-10, 10_000);

        assert!(seq.converged && par.converged);
        for id in 0..space.len() {
            assert!(
                (sequential.get(id) - parallel.get(id)).abs() < 1e-8,
                "state {} differs: {} vs {}",
                id,
                sequential.get(id),
                parallel.get(id)
            );
        }
    }
}
