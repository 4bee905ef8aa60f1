//! State and transition posteriors (gamma and xi).

use nalgebra::DMatrix;

use crate::backward::BackwardTrellis;
use crate::error::{HmmError, Result};
use crate::forward::{store_row, ForwardTrellis};
use crate::logspace::{log_sub, log_sum_exp};
use crate::model::LogModel;

/// Log posteriors for one E-step.
#[derive(Debug, Clone)]
pub struct Posteriors {
    /// T×N, `gamma[(t, s)] = log P(state_t = s | O)`
    pub gamma: DMatrix<f64>,
    /// T-1 slices of N×N, `xi[t][(s, r)] = log P(state_t = s, state_t+1 = r | O)`
    pub xi: Vec<DMatrix<f64>>,
}

impl Posteriors {
    pub fn len(&self) -> usize {
        self.gamma.nrows()
    }
}

/// Combine the scaled trellises into gamma and xi.
pub fn posteriors(
    model: &LogModel,
    observations: &[usize],
    forward: &ForwardTrellis,
    backward: &BackwardTrellis,
) -> Result<Posteriors> {
    let n_states = model.num_states();
    let n_obs = observations.len();
    if forward.len() != n_obs || backward.log_beta.nrows() != n_obs {
        return Err(HmmError::DimensionMismatch {
            what: "trellis length",
            expected: n_obs,
            found: forward.len().min(backward.log_beta.nrows()),
        });
    }

    let alpha = &forward.log_alpha;
    let beta = &backward.log_beta;

    let mut gamma = DMatrix::from_element(n_obs, n_states, f64::NEG_INFINITY);
    for t in 0..n_obs {
        let joint: Vec<f64> = (0..n_states)
            .map(|s| alpha[(t, s)] + beta[(t, s)])
            .collect();
        let norm = log_sum_exp(joint.iter().copied());
        let row: Vec<f64> = joint.iter().map(|&v| log_sub(v, norm)).collect();
        store_row(&mut gamma, t, &row);
    }

    let mut xi = Vec::with_capacity(n_obs.saturating_sub(1));
    for t in 0..n_obs.saturating_sub(1) {
        let next_obs = observations[t + 1];
        let numerator = DMatrix::from_fn(n_states, n_states, |s, r| {
            alpha[(t, s)]
                + model.transition[(s, r)]
                + beta[(t + 1, r)]
                + model.emission[(r, next_obs)]
        });
        // One normalizer per time step, shared by every (s, r) pair.
        let z = log_sum_exp(numerator.as_slice().iter().copied());
        xi.push(numerator.map(|v| log_sub(v, z)));
    }

    Ok(Posteriors { gamma, xi })
}
