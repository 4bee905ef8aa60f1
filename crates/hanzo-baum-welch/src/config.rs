//! Configuration for Baum-Welch estimation

use serde::{Deserialize, Serialize};

use crate::error::{HmmError, Result};

/// Main configuration for the EM loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmConfig {
    /// Upper bound on EM iterations
    pub max_iterations: usize,
    /// Minimum log-likelihood gain required to keep iterating
    pub tolerance: f64,
    /// Seed for the random initial model; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// What to do with a row whose state was never occupied
    pub degenerate_rows: DegenerateRowPolicy,
    /// State count at which trellis rows are fanned out over rayon
    pub parallel_threshold: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-9,
            seed: None,
            degenerate_rows: DegenerateRowPolicy::RetainPrevious,
            parallel_threshold: 64,
        }
    }
}

impl EmConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_degenerate_rows(mut self, policy: DegenerateRowPolicy) -> Self {
        self.degenerate_rows = policy;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(HmmError::InvalidInput(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(HmmError::InvalidInput(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Whether a model with `num_states` states should fan rows out.
    pub fn fan_out(&self, num_states: usize) -> bool {
        cfg!(feature = "parallel") && num_states >= self.parallel_threshold
    }
}

/// Fallback for a re-estimated row whose occupancy denominator is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateRowPolicy {
    /// Keep the row from the previous iteration's model
    RetainPrevious,
    /// Reset the row to the uniform distribution
    Uniform,
}
