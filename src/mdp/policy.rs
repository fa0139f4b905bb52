//! Frozen policies: the artifact produced by training.
//!
//! A [`FrozenPolicy`] maps canonical state keys to canonical action keys. It
//! does not depend on the solver or on state ids, so it can be saved after
//! training, loaded in a later run to skip training, and queried against the
//! game model by any decision-making client.
//!
//! The JSON format stores one record per non-terminal state:
//!
//! ```text
//! {
//!   "discount": 0.9,
//!   "tolerance": 1e-6,
//!   "stats": { ... },
//!   "actions": { "<state key>": "<action key>", ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::mdp::config::PIStats;
use crate::mdp::game::{Action, GameModel, State};

/// Immutable state -> action mapping produced by training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenPolicy {
    /// Discount factor the policy was trained with.
    pub discount: f64,

    /// Evaluation tolerance the policy was trained with.
    pub tolerance: f64,

    /// Training statistics, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stats: Option<PIStats>,

    /// State key -> action key, sorted by state key.
    actions: BTreeMap<String, String>,
}

impl FrozenPolicy {
    /// Create an empty policy.
    pub fn new(discount: f64, tolerance: f64) -> Self {
        Self {
            discount,
            tolerance,
            stats: None,
            actions: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, state_key: String, action_key: String) {
        self.actions.insert(state_key, action_key);
    }

    pub(crate) fn set_stats(&mut self, stats: PIStats) {
        self.stats = Some(stats);
    }

    /// Training statistics, if recorded.
    pub fn stats(&self) -> Option<&PIStats> {
        self.stats.as_ref()
    }

    /// Number of states with an action.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no state has an action.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All entries, sorted by state key.
    pub fn actions(&self) -> &BTreeMap<String, String> {
        &self.actions
    }

    /// Action key stored for a state key.
    pub fn action_key(&self, state_key: &str) -> Option<&str> {
        self.actions.get(state_key).map(String::as_str)
    }

    /// Resolve the action for `state` against the model's legal actions.
    ///
    /// Returns `None` for terminal states, states the policy does not know,
    /// and stored actions that are not legal in `state`.
    pub fn action_for<M: GameModel>(&self, model: &M, state: &M::State) -> Option<M::Action> {
        let key = self.action_key(&state.key())?;
        model
            .legal_actions(state)
            .into_iter()
            .find(|action| action.key() == key)
    }

    /// Check that the policy covers every non-terminal state of `model` with
    /// a legal action.
    ///
    /// # Errors
    /// [`SolverError::PolicyIncomplete`] or [`SolverError::PolicyMismatch`].
    pub fn validate_against<M: GameModel>(&self, model: &M) -> Result<()> {
        for state in model.enumerate_states() {
            if model.is_terminal(&state) || model.legal_actions(&state).is_empty() {
                continue;
            }
            let state_key = state.key();
            let action_key = self
                .action_key(&state_key)
                .ok_or_else(|| SolverError::PolicyIncomplete {
                    state: state_key.clone(),
                })?;
            if self.action_for(model, &state).is_none() {
                return Err(SolverError::PolicyMismatch {
                    state: state_key,
                    action: action_key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SolverError::Io {
            operation: format!("create policy file {}", path.display()),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|source| SolverError::Io {
            operation: format!("write policy file {}", path.display()),
            source,
        })
    }

    /// Load from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SolverError::Io {
            operation: format!("open policy file {}", path.display()),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
