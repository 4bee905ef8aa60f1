//! Scaled forward pass.
//!
//! Row `t` of the trellis holds `log α_t(s)` normalized so that the row
//! exponentiates to 1; the subtracted constant `c[t]` is kept, and
//! `Σ_t c[t]` is the log-likelihood of the whole sequence.

use log::trace;
use nalgebra::{DMatrix, DVector};

use crate::error::{HmmError, Result};
use crate::logspace::{log_normalize, log_sum_exp};
use crate::model::{HmmModel, LogModel};
use crate::rows::map_states;

/// Forward trellis together with its per-step scale constants.
#[derive(Debug, Clone)]
pub struct ForwardTrellis {
    /// T×N scaled log forward probabilities
    pub log_alpha: DMatrix<f64>,
    /// Per-step log normalizers c[t]
    pub log_scale: DVector<f64>,
}

impl ForwardTrellis {
    /// Sequence log-likelihood, `Σ_t c[t]`.
    pub fn log_likelihood(&self) -> f64 {
        self.log_scale.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.log_alpha.nrows()
    }
}

/// Run the forward recursion over an encoded observation sequence.
pub fn forward(model: &LogModel, observations: &[usize], fan_out: bool) -> Result<ForwardTrellis> {
    check_observations(model, observations)?;

    let n_states = model.num_states();
    let n_obs = observations.len();

    let mut log_alpha = DMatrix::from_element(n_obs, n_states, f64::NEG_INFINITY);
    let mut log_scale = DVector::zeros(n_obs);

    // Initialization
    let first_obs = observations[0];
    let mut row: Vec<f64> = (0..n_states)
        .map(|s| model.initial[s] + model.emission[(s, first_obs)])
        .collect();
    log_scale[0] = log_normalize(&mut row);
    store_row(&mut log_alpha, 0, &row);

    // Induction
    for t in 1..n_obs {
        let obs_idx = observations[t];
        let prev = row;
        row = map_states(n_states, fan_out, |s| {
            model.emission[(s, obs_idx)]
                + log_sum_exp((0..n_states).map(|r| prev[r] + model.transition[(r, s)]))
        });
        log_scale[t] = log_normalize(&mut row);
        store_row(&mut log_alpha, t, &row);
    }

    trace!(
        "forward pass over {} observations, {} states",
        n_obs,
        n_states
    );

    Ok(ForwardTrellis {
        log_alpha,
        log_scale,
    })
}

/// Log-likelihood of an encoded sequence under `model`, without fitting.
pub fn log_likelihood(model: &HmmModel, observations: &[usize]) -> Result<f64> {
    Ok(forward(&model.log_view(), observations, false)?.log_likelihood())
}

pub(crate) fn store_row(matrix: &mut DMatrix<f64>, t: usize, row: &[f64]) {
    for (s, v) in row.iter().enumerate() {
        matrix[(t, s)] = *v;
    }
}

pub(crate) fn check_observations(model: &LogModel, observations: &[usize]) -> Result<()> {
    if observations.is_empty() {
        return Err(HmmError::InvalidInput("sequence is empty".into()));
    }
    let n_symbols = model.num_symbols();
    if let Some(&bad) = observations.iter().find(|&&o| o >= n_symbols) {
        return Err(HmmError::DimensionMismatch {
            what: "observation index",
            expected: n_symbols,
            found: bad,
        });
    }
    Ok(())
}
