//! Baum-Welch convergence controller.
//!
//! Each iteration runs forward, backward, posteriors and re-estimation on the
//! accepted model, then scores the candidate with a fresh forward pass. That
//! forward pass is reused by the next iteration if the candidate is accepted.
//!
//! Stopping rule, with `L` the accepted log-likelihood and `L'` the
//! candidate's:
//! - `L' - L > tolerance`: accept and continue
//! - `0 <= L' - L <= tolerance`: accept and stop ([`StopReason::Converged`])
//! - `L' < L` or `L'` is NaN: discard and stop ([`StopReason::LikelihoodDecreased`])
//! - budget spent: stop ([`StopReason::MaxIterations`])

use std::fmt::Debug;
use std::hash::Hash;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::backward::backward;
use crate::config::EmConfig;
use crate::error::{HmmError, Result};
use crate::forward::forward;
use crate::model::HmmModel;
use crate::posterior::posteriors;
use crate::reestimate::reestimate;

/// Receives `(iteration, log_likelihood)` once per evaluated model.
///
/// Iteration 0 is the starting model; iteration `k` is the candidate of the
/// k-th EM step, reported whether or not it is accepted.
pub trait IterationObserver {
    fn on_iteration(&mut self, iteration: usize, log_likelihood: f64);
}

impl<F> IterationObserver for F
where
    F: FnMut(usize, f64),
{
    fn on_iteration(&mut self, iteration: usize, log_likelihood: f64) {
        self(iteration, log_likelihood)
    }
}

/// Observer that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IterationObserver for NoopObserver {
    fn on_iteration(&mut self, _iteration: usize, _log_likelihood: f64) {}
}

/// Why the EM loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Improvement fell to within the tolerance
    Converged,
    /// The candidate scored worse than the accepted model
    LikelihoodDecreased,
    /// The iteration budget ran out
    MaxIterations,
}

/// Outcome of fitting on an encoded sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOutcome {
    /// Last accepted model
    pub model: HmmModel,
    /// Sequence log-likelihood under `model`; `-inf` if the sequence is impossible
    #[serde(with = "crate::serde_f64")]
    pub log_likelihood: f64,
    /// EM steps performed, including a rejected final step
    pub iterations: usize,
    pub stop_reason: StopReason,
    /// Log-likelihood of the starting model and of every accepted candidate
    #[serde(with = "crate::serde_f64::vec")]
    pub history: Vec<f64>,
    /// Rows that fell back to the degenerate-row policy, over all steps
    pub degenerate_rows: usize,
}

/// Fitted model expressed over the caller's symbols
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedHmm<S> {
    /// Emission column `k` belongs to `alphabet[k]`
    pub alphabet: Vec<S>,
    #[serde(flatten)]
    pub fit: FitOutcome,
}

impl<S> FittedHmm<S> {
    pub fn model(&self) -> &HmmModel {
        &self.fit.model
    }

    pub fn log_likelihood(&self) -> f64 {
        self.fit.log_likelihood
    }

    pub fn initial(&self) -> Vec<f64> {
        self.fit.model.initial().iter().copied().collect()
    }

    pub fn transition(&self) -> Vec<Vec<f64>> {
        self.fit.model.to_tables().transition
    }

    pub fn emission(&self) -> Vec<Vec<f64>> {
        self.fit.model.to_tables().emission
    }
}

/// Baum-Welch estimator
#[derive(Debug, Clone)]
pub struct BaumWelch {
    config: EmConfig,
}

impl BaumWelch {
    pub fn new(config: EmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EmConfig {
        &self.config
    }

    /// Encode `sequence`, draw a random model, and fit it.
    pub fn estimate<S>(
        &self,
        sequence: &[S],
        alphabet: Option<Vec<S>>,
        num_states: usize,
        observer: &mut dyn IterationObserver,
    ) -> Result<FittedHmm<S>>
    where
        S: Clone + Eq + Hash + Debug,
    {
        if sequence.is_empty() {
            return Err(HmmError::InvalidInput("sequence is empty".into()));
        }
        if num_states < 1 {
            return Err(HmmError::InvalidInput("num_states must be at least 1".into()));
        }

        let alphabet = match alphabet {
            Some(symbols) => Alphabet::new(symbols)?,
            None => Alphabet::from_sequence(sequence)?,
        };
        let observations = alphabet.encode(sequence)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let initial = HmmModel::random(num_states, alphabet.len(), &mut rng)?;
        let fit = self.fit_from_observed(initial, &observations, observer)?;

        Ok(FittedHmm {
            alphabet: alphabet.into_symbols(),
            fit,
        })
    }

    /// Fit from a random model drawn with the caller's generator.
    pub fn fit_with_rng<R: Rng>(
        &self,
        observations: &[usize],
        num_states: usize,
        num_symbols: usize,
        rng: &mut R,
    ) -> Result<FitOutcome> {
        let initial = HmmModel::random(num_states, num_symbols, rng)?;
        self.fit_from(initial, observations)
    }

    /// Fit starting from a caller-supplied model.
    pub fn fit_from(&self, initial: HmmModel, observations: &[usize]) -> Result<FitOutcome> {
        self.fit_from_observed(initial, observations, &mut NoopObserver)
    }

    /// Fit starting from `initial`, reporting every evaluated model.
    pub fn fit_from_observed(
        &self,
        initial: HmmModel,
        observations: &[usize],
        observer: &mut dyn IterationObserver,
    ) -> Result<FitOutcome> {
        let fan_out = self.config.fan_out(initial.num_states());
        let policy = self.config.degenerate_rows;

        let mut model = initial;
        let mut log_model = model.log_view();
        let mut alpha = forward(&log_model, observations, fan_out)?;
        let mut log_likelihood = alpha.log_likelihood();

        observer.on_iteration(0, log_likelihood);
        debug!("Baum-Welch start: log-likelihood {}", log_likelihood);

        let mut history = vec![log_likelihood];
        let mut degenerate_rows = 0;
        let mut iterations = 0;
        let mut stop_reason = StopReason::MaxIterations;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let beta = backward(&log_model, observations, &alpha, fan_out)?;
            let post = posteriors(&log_model, observations, &alpha, &beta)?;
            let step = reestimate(&model, observations, &post, policy)?;
            degenerate_rows += step.degenerate.len();

            let candidate_log = step.model.log_view();
            let candidate_alpha = forward(&candidate_log, observations, fan_out)?;
            let candidate_ll = candidate_alpha.log_likelihood();

            observer.on_iteration(iterations, candidate_ll);
            debug!(
                "Baum-Welch iteration {}: log-likelihood {}",
                iterations, candidate_ll
            );

            // NaN fails this comparison too
            if !(candidate_ll >= log_likelihood) {
                stop_reason = StopReason::LikelihoodDecreased;
                break;
            }

            let improvement = candidate_ll - log_likelihood;
            model = step.model;
            log_model = candidate_log;
            alpha = candidate_alpha;
            log_likelihood = candidate_ll;
            history.push(log_likelihood);

            if !(improvement > self.config.tolerance) {
                stop_reason = StopReason::Converged;
                break;
            }
        }

        debug!(
            "Baum-Welch stopped after {} iterations ({:?}), log-likelihood {}",
            iterations, stop_reason, log_likelihood
        );

        Ok(FitOutcome {
            model,
            log_likelihood,
            iterations,
            stop_reason,
            history,
            degenerate_rows,
        })
    }
}
