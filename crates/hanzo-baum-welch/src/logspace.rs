//! Total log-space arithmetic.
//!
//! Zero probabilities are carried as `-inf` throughout the engines, so every
//! helper here must accept `-inf` without producing `NaN`.

/// Natural log with `ln(0) = -inf`.
#[inline]
pub fn safe_ln(p: f64) -> f64 {
    if p == 0.0 {
        f64::NEG_INFINITY
    } else {
        p.ln()
    }
}

/// Exponential with `exp(-inf) = 0`.
#[inline]
pub fn safe_exp(x: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        0.0
    } else {
        x.exp()
    }
}

/// log(Σ exp(x_i)) = max(x) + log(Σ exp(x_i - max(x)))
///
/// Returns `-inf` for an empty input or when every term is `-inf`.
pub fn log_sum_exp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let max_val = iter.clone().fold(f64::NEG_INFINITY, f64::max);
    if max_val == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max_val == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = iter.map(|x| safe_exp(x - max_val)).sum();
    max_val + sum.ln()
}

/// Subtract `log_sum_exp(row)` from every entry and return the constant.
///
/// An all `-inf` row is left untouched and reports `-inf`.
pub fn log_normalize(row: &mut [f64]) -> f64 {
    let c = log_sum_exp(row.iter().copied());
    if c.is_finite() {
        for v in row.iter_mut() {
            *v -= c;
        }
    }
    c
}

/// `x - c` that keeps `-inf` rows at `-inf` when `c` is itself `-inf`.
#[inline]
pub fn log_sub(x: f64, c: f64) -> f64 {
    if c.is_finite() {
        x - c
    } else {
        f64::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_are_total() {
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert_eq!(safe_exp(f64::NEG_INFINITY), 0.0);
        assert_eq!(safe_ln(1.0), 0.0);
        assert!((safe_exp(safe_ln(0.25)) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn log_sum_exp_matches_direct_sum() {
        let probs = [0.1f64, 0.2, 0.3];
        let lse = log_sum_exp(probs.iter().map(|p| p.ln()));
        assert!((lse - 0.6f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn log_sum_exp_survives_underflow() {
        let lse = log_sum_exp([-1000.0, -1000.0]);
        assert!((lse - (-1000.0 + 2f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn log_sum_exp_of_impossible_terms() {
        assert_eq!(log_sum_exp(Vec::<f64>::new()), f64::NEG_INFINITY);
        assert_eq!(
            log_sum_exp([f64::NEG_INFINITY, f64::NEG_INFINITY]),
            f64::NEG_INFINITY
        );
        assert!((log_sum_exp([f64::NEG_INFINITY, 0.0])).abs() < 1e-15);
    }

    #[test]
    fn normalize_yields_distribution() {
        let mut row = vec![0.2f64.ln(), 0.6f64.ln()];
        let c = log_normalize(&mut row);
        assert!((c - 0.8f64.ln()).abs() < 1e-12);
        let total: f64 = row.iter().map(|v| v.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_leaves_impossible_row_alone() {
        let mut row = vec![f64::NEG_INFINITY; 3];
        let c = log_normalize(&mut row);
        assert_eq!(c, f64::NEG_INFINITY);
        assert!(row.iter().all(|v| *v == f64::NEG_INFINITY));
        assert_eq!(log_sub(f64::NEG_INFINITY, c), f64::NEG_INFINITY);
    }
}
