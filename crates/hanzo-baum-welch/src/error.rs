//! Error types for Baum-Welch estimation

use thiserror::Error;

/// Result type alias for estimator operations
pub type Result<T> = std::result::Result<T, HmmError>;

/// Estimator error types
#[derive(Debug, Error)]
pub enum HmmError {
    /// Caller-supplied input is unusable (empty sequence, zero states, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A sequence symbol is missing from the supplied alphabet
    #[error("Invalid input: symbol at position {position} is not in the alphabet")]
    UnknownSymbol { position: usize },

    /// A model row is not a discrete probability distribution
    #[error("Invalid distribution in {table} row {row}: sums to {sum}")]
    InvalidDistribution {
        table: Table,
        row: usize,
        sum: f64,
    },

    /// Tables or observations disagree on shape
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A re-estimation denominator vanished; recovered by the row policy
    #[error("Numerical degeneracy: {table} row for state {state} has zero occupancy")]
    NumericalDegeneracy { table: Table, state: usize },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HmmError {
    /// True for every variant that rejects caller input before computation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            HmmError::InvalidInput(_) | HmmError::UnknownSymbol { .. }
        )
    }
}

/// The three probability tables of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Initial,
    Transition,
    Emission,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Table::Initial => write!(f, "initial"),
            Table::Transition => write!(f, "transition"),
            Table::Emission => write!(f, "emission"),
        }
    }
}
