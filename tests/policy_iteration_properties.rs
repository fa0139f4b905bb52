//! Property-based tests for the policy iteration solver.
//!
//! Random finite games are generated as explicit outcome tables and the
//! solver is checked for:
//! - Terminal states keep value 0
//! - Converged values satisfy the Bellman equation of the returned policy
//! - The returned policy is greedy with respect to its own values
//! - Each improvement cycle never lowers any state's value
//! - Training stops within the number of deterministic policies
//! - The same seed gives the same policy, and every start reaches the same values

use proptest::prelude::*;
use rust_pi_solver::games::table::{TableGame, TableOutcome};
use rust_pi_solver::mdp::{PIConfig, PolicyInit, PolicyIterationSolver};

const DISCOUNT: f64 = 0.9;
const TOLERANCE: f64 = 1e-10;

/// Slack for comparisons between values produced by separate evaluations.
const VALUE_SLACK: f64 = 1e-6;

// =============================================================================
// Strategies for generating test inputs
// =============================================================================

/// One action: up to three weighted outcomes over `num_states` states.
fn arb_action(num_states: u32) -> impl Strategy<Value = Vec<TableOutcome>> {
    prop::collection::vec((0.1f64..1.0, 0..num_states, -1.0f64..1.0), 1..=3).prop_map(
        |raw| {
            let total: f64 = raw.iter().map(|(weight, _, _)| weight).sum();
            raw.into_iter()
                .map(|(weight, next, reward)| (weight / total, next, reward))
                .collect()
        },
    )
}

/// A random game with 2-7 states. The last state is always terminal, every
/// other state is terminal with probability 1/4 or has 1-3 actions.
fn arb_game() -> impl Strategy<Value = TableGame> {
    (2u32..=7)
        .prop_flat_map(|num_states| {
            let state = (
                prop::bool::weighted(0.25),
                prop::collection::vec(arb_action(num_states), 1..=3),
            );
            prop::collection::vec(state, (num_states - 1) as usize)
        })
        .prop_map(|states| {
            let mut game = TableGame::new().with_terminal(states.len() as u32);
            for (id, (terminal, actions)) in states.into_iter().enumerate() {
                let id = id as u32;
                if terminal {
                    game = game.with_terminal(id);
                    continue;
                }
                for (index, outcomes) in actions.iter().enumerate() {
                    game = game.with_action(id, &format!("a{}", index), outcomes);
                }
            }
            game
        })
}

fn config(seed: u64) -> PIConfig {
    PIConfig::default()
        .with_discount(DISCOUNT)
        .with_tolerance(TOLERANCE)
        .with_seed(seed)
}

/// Largest |V(s) - Q(s, π(s))| over the states the policy acts in.
fn bellman_residual(solver: &PolicyIterationSolver<TableGame>) -> f64 {
    let space = solver.space();
    let values = solver.values().as_slice();
    (0..space.len())
        .filter_map(|id| {
            let action = solver.policy().get(id)?;
            let q = space.action_value(id, action, values, DISCOUNT);
            Some((values[id] - q).abs())
        })
        .fold(0.0, f64::max)
}

// =============================================================================
// Converged solution
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Terminal states are never updated away from 0.
    #[test]
    fn prop_terminal_values_stay_zero(game in arb_game(), seed in any::<u64>()) {
        let mut solver = PolicyIterationSolver::new(game, config(seed)).unwrap();
        solver.train();

        let space = solver.space();
        for id in 0..space.len() {
            if space.is_terminal(id) {
                prop_assert_eq!(solver.values().get(id), 0.0);
                prop_assert_eq!(solver.policy().get(id), None);
            }
        }
    }

    /// Converged values solve the Bellman equation of the returned policy,
    /// and no action beats the policy's choice.
    #[test]
    fn prop_solution_is_greedy_fixed_point(game in arb_game(), seed in any::<u64>()) {
        let mut solver = PolicyIterationSolver::new(game, config(seed)).unwrap();
        solver.train();
        prop_assert!(solver.stats().converged);
        prop_assert!(bellman_residual(&solver) < TOLERANCE + 1e-12);

        let space = solver.space();
        let values = solver.values().as_slice();
        for id in 0..space.len() {
            for action in 0..space.num_actions(id) {
                let q = space.action_value(id, action, values, DISCOUNT);
                prop_assert!(q <= values[id] + VALUE_SLACK, "state {} action {}: {} > {}", id, action, q, values[id]);
            }
        }
    }

    /// Each improvement step yields values at least as high everywhere.
    #[test]
    fn prop_improvement_is_monotone(game in arb_game(), seed in any::<u64>()) {
        let mut solver = PolicyIterationSolver::new(game, config(seed)).unwrap();
        solver.evaluate_policy();

        for _ in 0..50 {
            let before = solver.values().as_slice().to_vec();
            if !solver.improve_policy().changed {
                break;
            }
            solver.evaluate_policy();
            for (id, (&old, &new)) in before.iter().zip(solver.values().as_slice()).enumerate() {
                prop_assert!(new >= old - VALUE_SLACK, "state {}: {} -> {}", id, old, new);
            }
        }
    }

    /// Training stops after at most one cycle per deterministic policy.
    #[test]
    fn prop_terminates_within_policy_count(game in arb_game(), seed in any::<u64>()) {
        let mut solver = PolicyIterationSolver::new(game, config(seed)).unwrap();
        solver.train();

        let stats = solver.stats();
        prop_assert!(stats.converged);
        prop_assert!(stats.policy_iterations >= 1);
        prop_assert!(stats.policy_iterations as u128 <= solver.space().num_policies());
    }

    /// Improving a stable policy changes nothing.
    #[test]
    fn prop_improve_after_training_is_noop(game in arb_game(), seed in any::<u64>()) {
        let mut solver = PolicyIterationSolver::new(game, config(seed)).unwrap();
        let policy = solver.train();

        let report = solver.improve_policy();
        prop_assert!(!report.changed);
        prop_assert_eq!(report.states_changed, 0);
        let frozen = solver.freeze();
        prop_assert_eq!(frozen.actions(), policy.actions());
    }

    /// Same seed, same policy. Different starts, same optimal values.
    #[test]
    fn prop_deterministic_and_start_independent(game in arb_game(), seed in any::<u64>()) {
        let mut first = PolicyIterationSolver::new(game.clone(), config(seed)).unwrap();
        let mut again = PolicyIterationSolver::new(game.clone(), config(seed)).unwrap();
        let mut fixed = PolicyIterationSolver::new(
            game,
            config(seed).with_init(PolicyInit::First),
        )
        .unwrap();

        let policy = first.train();
        let again_policy = again.train();
        prop_assert_eq!(again_policy.actions(), policy.actions());
        fixed.train();

        for (a, b) in first.values().as_slice().iter().zip(fixed.values().as_slice()) {
            prop_assert!((a - b).abs() < VALUE_SLACK, "{} vs {}", a, b);
        }
    }

    /// Parallel sweeps reach the same values as in-place sweeps.
    #[test]
    fn prop_parallel_matches_sequential(game in arb_game(), seed in any::<u64>()) {
        let mut sequential = PolicyIterationSolver::new(game.clone(), config(seed)).unwrap();
        let mut parallel = PolicyIterationSolver::new(
            game,
            config(seed).with_threads(2),
        )
        .unwrap();

        sequential.train();
        parallel.train();
        prop_assert!(parallel.stats().converged);

        for (a, b) in sequential.values().as_slice().iter().zip(parallel.values().as_slice()) {
            prop_assert!((a - b).abs() < VALUE_SLACK, "{} vs {}", a, b);
        }
    }
}
