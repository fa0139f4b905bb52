//! Policy improvement.
//!
//! For every non-terminal state, look one step ahead with the current values
//! and switch to the action with the highest expected return:
//!
//! ```text
//! π'(s) = argmax_a Σ prob × (reward + γ × V(s'))
//! ```
//!
//! The argmax walks the legal actions in the model's order and keeps the
//! running best explicitly; a later action replaces the incumbent only if it
//! is strictly better. Ties therefore always resolve to the earliest action,
//! which makes the resulting policy reproducible.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::mdp::storage::{PolicyTable, StateId, StateSpace, ValueTable};

/// Result of one improvement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementReport {
    /// Whether any state's action changed.
    pub changed: bool,
    /// Number of states whose action changed.
    pub states_changed: usize,
}

/// Greedy action of a state: `(action index, expected value)`, or `None` for
/// states without legal actions.
pub fn greedy_action<S, A>(
    space: &StateSpace<S, A>,
    values: &[f64],
    discount: f64,
    id: StateId,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for action in 0..space.num_actions(id) {
        let value = space.action_value(id, action, values, discount);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            // NaN never displaces an incumbent
            Some(_) if value.is_nan() => {}
            _ => best = Some((action, value)),
        }
    }

    best
}

/// Improve `policy` greedily with respect to `values`. Values are not
/// touched.
pub fn improve<S, A>(
    space: &StateSpace<S, A>,
    policy: &mut PolicyTable,
    values: &ValueTable,
    discount: f64,
) -> ImprovementReport {
    let mut states_changed = 0;

    for id in 0..space.len() {
        if space.is_terminal(id) {
            continue;
        }
        if let Some((best, _)) = greedy_action(space, values.as_slice(), discount, id) {
            if policy.get(id) != Some(best) {
                policy.set(id, best);
                states_changed += 1;
            }
        }
    }

    ImprovementReport {
        changed: states_changed > 0,
        states_changed,
    }
}

/// Same as [`improve`], computing the lookahead on the current rayon pool.
pub fn improve_parallel<S: Sync, A: Sync>(
    space: &StateSpace<S, A>,
    policy: &mut PolicyTable,
    values: &ValueTable,
    discount: f64,
) -> ImprovementReport {
    let greedy: Vec<Option<usize>> = (0..space.len())
        .into_par_iter()
        .map(|id| {
            if space.is_terminal(id) {
                None
            } else {
                greedy_action(space, values.as_slice(), discount, id).map(|(a, _)| a)
            }
        })
        .collect();

    let mut states_changed = 0;
    for (id, best) in greedy.into_iter().enumerate() {
        if let Some(best) = best {
            if policy.get(id) != Some(best) {
                policy.set(id, best);
                states_changed += 1;
            }
        }
    }

    ImprovementReport {
        changed: states_changed > 0,
        states_changed,
    }
}
