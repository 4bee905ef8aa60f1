//! # Hanzo Baum-Welch - HMM parameter estimation
//!
//! Fits a discrete-output Hidden Markov Model to a single observed symbol
//! sequence with the Baum-Welch Expectation-Maximisation algorithm.
//!
//! Given a sequence and a number of hidden states, it returns a locally
//! optimal initial distribution, transition matrix and emission matrix, plus
//! the sequence log-likelihood under the fitted model.
//!
//! ## Pipeline
//!
//! - **Alphabet**: maps symbols to emission columns
//! - **Forward / backward**: scaled log-space recursions; each forward row is
//!   normalized and its constant `c[t]` kept, so long sequences never underflow
//! - **Posteriors**: state (gamma) and transition (xi) posteriors
//! - **Re-estimation**: the M-step, with an explicit policy for states that
//!   were never occupied
//! - **Controller**: iterates until the likelihood gain drops within tolerance,
//!   the likelihood decreases, or the iteration budget runs out
//!
//! ## Quick Start
//!
//! ```rust
//! use hanzo_baum_welch::{estimate, EmConfig};
//!
//! let sequence: Vec<char> = "ABABABAB".chars().collect();
//! let config = EmConfig::default().with_seed(42);
//! let fitted = estimate(&sequence, 2, &config).unwrap();
//!
//! assert_eq!(fitted.alphabet, vec!['A', 'B']);
//! assert!(fitted.log_likelihood() <= 1e-12);
//! ```
//!
//! Decoding (most likely state path) and model-order selection are not
//! provided.

pub mod alphabet;
pub mod backward;
pub mod config;
pub mod em;
pub mod error;
pub mod forward;
pub mod logspace;
pub mod model;
pub mod posterior;
pub mod reestimate;
mod rows;
mod serde_f64;

use std::fmt::Debug;
use std::hash::Hash;

pub use alphabet::Alphabet;
pub use config::{DegenerateRowPolicy, EmConfig};
pub use em::{BaumWelch, FitOutcome, FittedHmm, IterationObserver, NoopObserver, StopReason};
pub use error::{HmmError, Result, Table};
pub use forward::log_likelihood;
pub use model::{HmmModel, LogModel, ModelTables};

/// Fit an HMM to `sequence`, deriving the alphabet from first occurrence.
pub fn estimate<S>(sequence: &[S], num_states: usize, config: &EmConfig) -> Result<FittedHmm<S>>
where
    S: Clone + Eq + Hash + Debug,
{
    BaumWelch::new(config.clone())?.estimate(sequence, None, num_states, &mut NoopObserver)
}

/// Fit an HMM to `sequence` over an explicit alphabet.
///
/// Every symbol of `sequence` must appear in `alphabet`; emission columns
/// follow the alphabet's order.
pub fn estimate_with_alphabet<S>(
    sequence: &[S],
    alphabet: Vec<S>,
    num_states: usize,
    config: &EmConfig,
) -> Result<FittedHmm<S>>
where
    S: Clone + Eq + Hash + Debug,
{
    BaumWelch::new(config.clone())?.estimate(
        sequence,
        Some(alphabet),
        num_states,
        &mut NoopObserver,
    )
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{DegenerateRowPolicy, EmConfig};
    pub use crate::em::{BaumWelch, FittedHmm, IterationObserver, StopReason};
    pub use crate::error::{HmmError, Result};
    pub use crate::model::HmmModel;
    pub use crate::{estimate, estimate_with_alphabet};
}
