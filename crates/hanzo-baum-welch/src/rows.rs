//! Per-state row evaluation shared by the forward and backward passes.
//!
//! Entries of one trellis row are independent of each other, so a row may be
//! fanned out over the rayon pool. The call returns only once every entry is
//! computed, which is the barrier the time recursion needs.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Evaluate `f(s)` for every state `s` in `0..n_states`, in state order.
#[cfg(feature = "parallel")]
pub(crate) fn map_states<F>(n_states: usize, fan_out: bool, f: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    if fan_out {
        (0..n_states).into_par_iter().map(f).collect()
    } else {
        (0..n_states).map(f).collect()
    }
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_states<F>(n_states: usize, _fan_out: bool, f: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    (0..n_states).map(f).collect()
}
