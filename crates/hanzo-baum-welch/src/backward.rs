//! Scaled backward pass.
//!
//! Row `t` is divided by the forward constant `c[t]` rather than by its own
//! sum, which keeps α and β on one scale when posteriors are formed.

use log::trace;
use nalgebra::DMatrix;

use crate::error::{HmmError, Result};
use crate::forward::{check_observations, store_row, ForwardTrellis};
use crate::logspace::{log_sub, log_sum_exp};
use crate::model::LogModel;
use crate::rows::map_states;

/// T×N scaled log backward probabilities
#[derive(Debug, Clone)]
pub struct BackwardTrellis {
    pub log_beta: DMatrix<f64>,
}

/// Run the backward recursion, reusing the scale constants of `forward`.
pub fn backward(
    model: &LogModel,
    observations: &[usize],
    forward: &ForwardTrellis,
    fan_out: bool,
) -> Result<BackwardTrellis> {
    check_observations(model, observations)?;

    let n_states = model.num_states();
    let n_obs = observations.len();
    if forward.len() != n_obs {
        return Err(HmmError::DimensionMismatch {
            what: "forward trellis length",
            expected: n_obs,
            found: forward.len(),
        });
    }

    // log(1) in the last row
    let mut log_beta = DMatrix::zeros(n_obs, n_states);
    let mut row = vec![0.0; n_states];

    for t in (0..n_obs - 1).rev() {
        let next_obs = observations[t + 1];
        let next = row;
        let scale = forward.log_scale[t];
        row = map_states(n_states, fan_out, |s| {
            let total = log_sum_exp((0..n_states).map(|r| {
                next[r] + model.transition[(s, r)] + model.emission[(r, next_obs)]
            }));
            log_sub(total, scale)
        });
        store_row(&mut log_beta, t, &row);
    }

    trace!("backward pass over {} observations", n_obs);

    Ok(BackwardTrellis { log_beta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::forward;
    use crate::model::HmmModel;

    fn model() -> HmmModel {
        HmmModel::from_rows(
            vec![0.3, 0.7],
            vec![vec![0.8, 0.2], vec![0.35, 0.65]],
            vec![vec![0.5, 0.25, 0.25], vec![0.1, 0.1, 0.8]],
        )
        .unwrap()
    }

    #[test]
    fn last_row_is_log_one() {
        let log_model = model().log_view();
        let obs = [0, 2, 1];
        let f = forward(&log_model, &obs, false).unwrap();
        let b = backward(&log_model, &obs, &f, false).unwrap();
        assert!(b.log_beta.row(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn alpha_beta_product_recovers_likelihood() {
        // β̂_0 carries c[0..T-1) and α̂_0 lacks c[0]; together they give P(O).
        let m = model();
        let log_model = m.log_view();
        let obs = [0, 2, 2, 1, 0];
        let f = forward(&log_model, &obs, false).unwrap();
        let b = backward(&log_model, &obs, &f, false).unwrap();

        let first = log_sum_exp((0..2).map(|s| f.log_alpha[(0, s)] + b.log_beta[(0, s)]));
        let carried: f64 = f.log_scale.iter().take(obs.len() - 1).sum();
        let recovered = first + f.log_scale[0] + carried;
        assert!((recovered - f.log_likelihood()).abs() < 1e-12);
    }

    #[test]
    fn unscaled_values_match_textbook_recursion() {
        let m = model();
        let log_model = m.log_view();
        let obs = [1, 0, 2];
        let f = forward(&log_model, &obs, false).unwrap();
        let b = backward(&log_model, &obs, &f, false).unwrap();

        // β_1(s) = Σ_r A[s,r] B[r,obs2]
        for s in 0..2 {
            let expected: f64 = (0..2)
                .map(|r| m.transition()[(s, r)] * m.emission()[(r, 2)])
                .sum();
            let unscaled = b.log_beta[(1, s)] + f.log_scale[1];
            assert!((unscaled - expected.ln()).abs() < 1e-12);
        }
    }

    #[test]
    fn fan_out_is_bit_identical() {
        let log_model = model().log_view();
        let obs = [2, 2, 0, 1, 0, 2];
        let f = forward(&log_model, &obs, false).unwrap();
        let serial = backward(&log_model, &obs, &f, false).unwrap();
        let fanned = backward(&log_model, &obs, &f, true).unwrap();
        assert_eq!(serial.log_beta, fanned.log_beta);
    }

    #[test]
    fn single_observation_has_only_terminal_row() {
        let log_model = model().log_view();
        let f = forward(&log_model, &[1], false).unwrap();
        let b = backward(&log_model, &[1], &f, false).unwrap();
        assert_eq!(b.log_beta.nrows(), 1);
        assert_eq!(b.log_beta[(0, 1)], 0.0);
    }
}
