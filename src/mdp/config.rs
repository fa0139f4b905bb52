//! Configuration options for the policy iteration solver.
//!
//! This module provides the parameters of a training run (discount,
//! convergence tolerance, safety caps) and the statistics collected while
//! training.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the initial policy is chosen before the first evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyInit {
    /// Pick uniformly among each state's legal actions.
    #[default]
    Random,
    /// Pick the first legal action of each state.
    First,
}

/// Configuration for the policy iteration solver.
///
/// # Example
/// ```
/// use rust_pi_solver::mdp::PIConfig;
///
/// let config = PIConfig::default().with_discount(0.95).with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PIConfig {
    /// Discount factor γ applied to future rewards. Must lie in `[0, 1)`.
    pub discount: f64,

    /// Policy evaluation stops once a full sweep changes no value by
    /// `tolerance` or more. Must be positive.
    pub tolerance: f64,

    /// Maximum number of sweeps per policy evaluation.
    ///
    /// Evaluation that hits this cap returns its best-effort values and is
    /// reported as not converged.
    pub max_sweeps: usize,

    /// Maximum number of evaluate/improve cycles.
    pub max_policy_iterations: usize,

    /// Allowed deviation of an outcome set's probability sum from 1.0.
    pub probability_tolerance: f64,

    /// Evaluate with Jacobi sweeps spread over a rayon pool instead of
    /// in-place sequential sweeps.
    pub parallel: bool,

    /// Number of threads for parallel sweeps.
    ///
    /// Set to `None` to use the global rayon pool.
    pub num_threads: Option<usize>,

    /// Random seed for the initial policy.
    ///
    /// If `None`, the initial policy is drawn from entropy.
    pub seed: Option<u64>,

    /// Initial policy strategy.
    pub init: PolicyInit,
}

impl Default for PIConfig {
    fn default() -> Self {
        Self {
            discount: 0.9,
            tolerance: 1e-6,
            max_sweeps: 10_000,
            max_policy_iterations: 1_000,
            probability_tolerance: 1e-9,
            parallel: false,
            num_threads: None,
            seed: None,
            init: PolicyInit::Random,
        }
    }
}

impl PIConfig {
    /// Create a new PIConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the discount factor.
    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// Builder method: set the evaluation tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder method: set the sweep cap per evaluation.
    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Builder method: set the evaluate/improve cycle cap.
    pub fn with_max_policy_iterations(mut self, cap: usize) -> Self {
        self.max_policy_iterations = cap;
        self
    }

    /// Builder method: enable or disable parallel sweeps.
    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.parallel = enable;
        self
    }

    /// Builder method: set number of threads (implies parallel sweeps).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.parallel = true;
        self.num_threads = Some(threads);
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set the initial policy strategy.
    pub fn with_init(mut self, init: PolicyInit) -> Self {
        self.init = init;
        self
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string. Missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.discount) {
            return Err(ConfigError::InvalidDiscount(self.discount));
        }

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }

        if self.max_sweeps == 0 {
            return Err(ConfigError::InvalidCap("max_sweeps"));
        }

        if self.max_policy_iterations == 0 {
            return Err(ConfigError::InvalidCap("max_policy_iterations"));
        }

        if self.probability_tolerance.is_nan() || self.probability_tolerance < 0.0 {
            return Err(ConfigError::InvalidProbabilityTolerance(
                self.probability_tolerance,
            ));
        }

        if self.num_threads == Some(0) {
            return Err(ConfigError::InvalidCap("num_threads"));
        }

        Ok(())
    }
}

/// Errors that can occur when validating or loading solver configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Discount factor is out of range `[0, 1)`.
    #[error("discount factor {0} is out of range [0, 1)")]
    InvalidDiscount(f64),
    /// Tolerance is not a positive finite number.
    #[error("convergence tolerance {0} must be positive")]
    InvalidTolerance(f64),
    /// A cap or count that must be at least 1 is zero.
    #[error("{0} must be at least 1")]
    InvalidCap(&'static str),
    /// Probability tolerance is negative or NaN.
    #[error("probability tolerance {0} must be non-negative")]
    InvalidProbabilityTolerance(f64),
    /// Reading the configuration file failed.
    #[error("failed to read config: {0}")]
    Io(String),
    /// The configuration file is not valid JSON.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Statistics tracked during training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PIStats {
    /// Number of evaluate/improve cycles completed.
    pub policy_iterations: usize,

    /// Total evaluation sweeps over all cycles.
    pub total_sweeps: usize,

    /// Number of enumerated states.
    pub states: usize,

    /// Number of terminal states among them.
    pub terminal_states: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Whether training reached a stable policy with converged values.
    pub converged: bool,

    /// Per-cycle history.
    pub history: Vec<IterationStats>,
}

/// Summary of a single evaluate/improve cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// Cycle number, starting at 1.
    pub iteration: usize,
    /// Sweeps spent evaluating the policy of this cycle.
    pub sweeps: usize,
    /// Largest value change in the last sweep.
    pub max_delta: f64,
    /// Whether evaluation met the tolerance.
    pub evaluation_converged: bool,
    /// Number of states whose action changed during improvement.
    pub states_changed: usize,
}

impl PIStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished cycle.
    pub fn record_cycle(&mut self, cycle: IterationStats) {
        self.policy_iterations = cycle.iteration;
        self.total_sweeps += cycle.sweeps;
        self.history.push(cycle);
    }

    /// The most recent cycle, if any.
    pub fn last_cycle(&self) -> Option<&IterationStats> {
        self.history.last()
    }
}
