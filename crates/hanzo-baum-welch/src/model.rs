//! Model parameters and their log-space view.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HmmError, Result, Table};
use crate::logspace::safe_ln;

/// Allowed deviation of a row sum from 1.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// A discrete-output Hidden Markov Model
///
/// Every row of every table is a probability distribution. The tables are
/// only reachable through validating constructors, so a value of this type
/// always satisfies that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelTables", into = "ModelTables")]
pub struct HmmModel {
    /// Initial state probabilities π
    initial: DVector<f64>,
    /// State transition matrix A[i,j] = P(state_j | state_i)
    transition: DMatrix<f64>,
    /// Emission matrix B[i,k] = P(symbol_k | state_i)
    emission: DMatrix<f64>,
}

/// Plain nested-`Vec` form of a model, used for (de)serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTables {
    pub initial: Vec<f64>,
    pub transition: Vec<Vec<f64>>,
    pub emission: Vec<Vec<f64>>,
}

/// Elementwise natural log of every table; zeros become `-inf`.
#[derive(Debug, Clone)]
pub struct LogModel {
    pub initial: DVector<f64>,
    pub transition: DMatrix<f64>,
    pub emission: DMatrix<f64>,
}

impl LogModel {
    pub fn num_states(&self) -> usize {
        self.initial.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.emission.ncols()
    }
}

impl HmmModel {
    /// Create a model, checking shapes and that every row is a distribution.
    pub fn new(
        initial: DVector<f64>,
        transition: DMatrix<f64>,
        emission: DMatrix<f64>,
    ) -> Result<Self> {
        let n_states = initial.len();
        if n_states == 0 {
            return Err(HmmError::InvalidInput("model has no states".into()));
        }
        if transition.nrows() != n_states || transition.ncols() != n_states {
            return Err(HmmError::DimensionMismatch {
                what: "transition matrix",
                expected: n_states,
                found: if transition.nrows() != n_states {
                    transition.nrows()
                } else {
                    transition.ncols()
                },
            });
        }
        if emission.nrows() != n_states {
            return Err(HmmError::DimensionMismatch {
                what: "emission matrix rows",
                expected: n_states,
                found: emission.nrows(),
            });
        }
        if emission.ncols() == 0 {
            return Err(HmmError::InvalidInput("model has no symbols".into()));
        }

        check_row(Table::Initial, 0, initial.iter().copied())?;
        for (i, row) in transition.row_iter().enumerate() {
            check_row(Table::Transition, i, row.iter().copied())?;
        }
        for (i, row) in emission.row_iter().enumerate() {
            check_row(Table::Emission, i, row.iter().copied())?;
        }

        Ok(Self {
            initial,
            transition,
            emission,
        })
    }

    /// Create a model from nested rows.
    pub fn from_rows(
        initial: Vec<f64>,
        transition: Vec<Vec<f64>>,
        emission: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let n_states = initial.len();
        let n_symbols = emission.first().map(Vec::len).unwrap_or(0);

        if transition.len() != n_states {
            return Err(HmmError::DimensionMismatch {
                what: "transition matrix rows",
                expected: n_states,
                found: transition.len(),
            });
        }
        if let Some(row) = transition.iter().find(|r| r.len() != n_states) {
            return Err(HmmError::DimensionMismatch {
                what: "transition matrix columns",
                expected: n_states,
                found: row.len(),
            });
        }
        if emission.len() != n_states {
            return Err(HmmError::DimensionMismatch {
                what: "emission matrix rows",
                expected: n_states,
                found: emission.len(),
            });
        }
        if let Some(row) = emission.iter().find(|r| r.len() != n_symbols) {
            return Err(HmmError::DimensionMismatch {
                what: "emission matrix columns",
                expected: n_symbols,
                found: row.len(),
            });
        }

        let initial = DVector::from_vec(initial);
        let transition = DMatrix::from_row_slice(n_states, n_states, &transition.concat());
        let emission = DMatrix::from_row_slice(n_states, n_symbols, &emission.concat());

        Self::new(initial, transition, emission)
    }

    /// Draw a model with random, strictly positive rows.
    ///
    /// Each row samples `width` independent uniform variates in (0, 1] and
    /// divides by their sum, so every entry is strictly positive.
    pub fn random<R: Rng>(num_states: usize, num_symbols: usize, rng: &mut R) -> Result<Self> {
        if num_states < 1 {
            return Err(HmmError::InvalidInput("num_states must be at least 1".into()));
        }
        if num_symbols < 1 {
            return Err(HmmError::InvalidInput("num_symbols must be at least 1".into()));
        }

        let initial = random_distributions(1, num_states, rng);
        let transition = random_distributions(num_states, num_states, rng);
        let emission = random_distributions(num_states, num_symbols, rng);

        Self::new(
            DVector::from_iterator(num_states, initial.row(0).iter().copied()),
            transition,
            emission,
        )
    }

    pub fn initial(&self) -> &DVector<f64> {
        &self.initial
    }

    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    pub fn emission(&self) -> &DMatrix<f64> {
        &self.emission
    }

    pub fn num_states(&self) -> usize {
        self.initial.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.emission.ncols()
    }

    /// Log-space copy of all three tables.
    pub fn log_view(&self) -> LogModel {
        LogModel {
            initial: self.initial.map(safe_ln),
            transition: self.transition.map(safe_ln),
            emission: self.emission.map(safe_ln),
        }
    }

    /// Copy the tables out as nested rows.
    pub fn to_tables(&self) -> ModelTables {
        ModelTables {
            initial: self.initial.iter().copied().collect(),
            transition: rows_of(&self.transition),
            emission: rows_of(&self.emission),
        }
    }
}

impl TryFrom<ModelTables> for HmmModel {
    type Error = HmmError;

    fn try_from(tables: ModelTables) -> Result<Self> {
        Self::from_rows(tables.initial, tables.transition, tables.emission)
    }
}

impl From<HmmModel> for ModelTables {
    fn from(model: HmmModel) -> Self {
        model.to_tables()
    }
}

fn rows_of(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

fn random_distributions<R: Rng>(height: usize, width: usize, rng: &mut R) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(height, width);
    for i in 0..height {
        let variates: Vec<f64> = (0..width).map(|_| 1.0 - rng.gen::<f64>()).collect();
        let sum: f64 = variates.iter().sum();
        for (j, v) in variates.into_iter().enumerate() {
            matrix[(i, j)] = v / sum;
        }
    }
    matrix
}

fn check_row<I>(table: Table, row: usize, values: I) -> Result<()>
where
    I: Iterator<Item = f64>,
{
    let mut sum = 0.0;
    for p in values {
        if !p.is_finite() || p < 0.0 {
            return Err(HmmError::InvalidDistribution { table, row, sum: p });
        }
        sum += p;
    }
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(HmmError::InvalidDistribution { table, row, sum });
    }
    Ok(())
}
