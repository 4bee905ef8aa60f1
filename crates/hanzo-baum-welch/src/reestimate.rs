//! M-step: derive the next model from the posteriors.
//!
//! The candidate is assembled from the previous model and the posteriors
//! alone and only handed back once it is complete; the previous model is
//! never touched.

use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::config::DegenerateRowPolicy;
use crate::error::{HmmError, Result, Table};
use crate::logspace::safe_exp;
use crate::model::HmmModel;
use crate::posterior::Posteriors;

/// Occupancy mass below which a state counts as never visited.
pub const MIN_OCCUPANCY: f64 = 1e-300;

/// A row that fell back to the configured policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degeneracy {
    pub table: Table,
    pub state: usize,
}

/// Result of one M-step
#[derive(Debug, Clone)]
pub struct Reestimation {
    pub model: HmmModel,
    pub degenerate: Vec<Degeneracy>,
}

/// Re-estimate initial, transition, and emission tables.
pub fn reestimate(
    previous: &HmmModel,
    observations: &[usize],
    posteriors: &Posteriors,
    policy: DegenerateRowPolicy,
) -> Result<Reestimation> {
    let n_states = previous.num_states();
    let n_symbols = previous.num_symbols();
    let n_obs = observations.len();

    if n_obs == 0 {
        return Err(HmmError::InvalidInput("sequence is empty".into()));
    }
    if let Some(&bad) = observations.iter().find(|&&o| o >= n_symbols) {
        return Err(HmmError::DimensionMismatch {
            what: "observation index",
            expected: n_symbols,
            found: bad,
        });
    }
    if posteriors.len() != n_obs {
        return Err(HmmError::DimensionMismatch {
            what: "posterior rows",
            expected: n_obs,
            found: posteriors.len(),
        });
    }
    if posteriors.gamma.ncols() != n_states {
        return Err(HmmError::DimensionMismatch {
            what: "posterior columns",
            expected: n_states,
            found: posteriors.gamma.ncols(),
        });
    }
    if posteriors.xi.len() != n_obs - 1 {
        return Err(HmmError::DimensionMismatch {
            what: "transition posterior slices",
            expected: n_obs - 1,
            found: posteriors.xi.len(),
        });
    }
    if let Some(slice) = posteriors
        .xi
        .iter()
        .find(|m| m.nrows() != n_states || m.ncols() != n_states)
    {
        return Err(HmmError::DimensionMismatch {
            what: "transition posterior shape",
            expected: n_states,
            found: if slice.nrows() != n_states {
                slice.nrows()
            } else {
                slice.ncols()
            },
        });
    }

    let occupancy = posteriors.gamma.map(safe_exp);
    let mut degenerate = Vec::new();

    // π'[s] = γ_0(s)
    let first: Vec<f64> = (0..n_states).map(|s| occupancy[(0, s)]).collect();
    let first_mass: f64 = first.iter().sum();
    let initial = resolve(
        normalized_row(Table::Initial, 0, first, first_mass),
        || previous.initial().iter().copied().collect(),
        policy,
        &mut degenerate,
    )?;

    let mut transition = DMatrix::zeros(n_states, n_states);
    let mut emission = DMatrix::zeros(n_states, n_symbols);

    for s in 0..n_states {
        let leaving: f64 = (0..n_obs.saturating_sub(1)).map(|t| occupancy[(t, s)]).sum();
        let visits: f64 = leaving + occupancy[(n_obs - 1, s)];

        let expected_transitions: Vec<f64> = (0..n_states)
            .map(|r| posteriors.xi.iter().map(|slice| safe_exp(slice[(s, r)])).sum())
            .collect();
        let row = resolve(
            normalized_row(Table::Transition, s, expected_transitions, leaving),
            || previous.transition().row(s).iter().copied().collect(),
            policy,
            &mut degenerate,
        )?;
        for (r, p) in row.into_iter().enumerate() {
            transition[(s, r)] = p;
        }

        let mut expected_emissions = vec![0.0; n_symbols];
        for (t, &o) in observations.iter().enumerate() {
            expected_emissions[o] += occupancy[(t, s)];
        }
        let row = resolve(
            normalized_row(Table::Emission, s, expected_emissions, visits),
            || previous.emission().row(s).iter().copied().collect(),
            policy,
            &mut degenerate,
        )?;
        for (o, p) in row.into_iter().enumerate() {
            emission[(s, o)] = p;
        }
    }

    let model = HmmModel::new(DVector::from_vec(initial), transition, emission)?;

    Ok(Reestimation { model, degenerate })
}

/// Divide expected counts by the state's occupancy mass.
fn normalized_row(table: Table, state: usize, counts: Vec<f64>, mass: f64) -> Result<Vec<f64>> {
    if !mass.is_finite() || mass < MIN_OCCUPANCY {
        return Err(HmmError::NumericalDegeneracy { table, state });
    }
    Ok(counts.into_iter().map(|c| c / mass).collect())
}

/// Apply the degenerate-row policy to a failed normalization.
fn resolve<F>(
    row: Result<Vec<f64>>,
    previous_row: F,
    policy: DegenerateRowPolicy,
    degenerate: &mut Vec<Degeneracy>,
) -> Result<Vec<f64>>
where
    F: FnOnce() -> Vec<f64>,
{
    match row {
        Ok(row) => Ok(row),
        Err(HmmError::NumericalDegeneracy { table, state }) => {
            warn!(
                "{} row for state {} has zero occupancy, applying {:?}",
                table, state, policy
            );
            degenerate.push(Degeneracy { table, state });
            let fallback = previous_row();
            Ok(match policy {
                DegenerateRowPolicy::RetainPrevious => fallback,
                DegenerateRowPolicy::Uniform => {
                    let width = fallback.len();
                    vec![1.0 / width as f64; width]
                }
            })
        }
        Err(other) => Err(other),
    }
}
