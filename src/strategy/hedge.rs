//! Hedge Ratio Estimation
//!
//! OLS regression `y = beta * x + alpha`; beta sizes the offsetting leg and
//! the spread is `y - beta * x`.

use crate::strategy::stats::{simple_ols, StatError};

/// Hedge ratio of `y` against `x`.
///
/// Fails with `SingularRegression` when `x` is flat over the window (stale
/// prices); callers treat that as "pair currently unusable".
pub fn estimate_hedge_ratio(y: &[f64], x: &[f64]) -> Result<f64, StatError> {
    let n = y.len().min(x.len());
    let fit = simple_ols(&y[y.len() - n..], &x[x.len() - n..])?;
    if !fit.slope.is_finite() {
        return Err(StatError::SingularRegression);
    }
    Ok(fit.slope)
}

/// `y_i - hedge * x_i` over the trailing points both series share
pub fn compute_spread(y: &[f64], x: &[f64], hedge: f64) -> Vec<f64> {
    let n = y.len().min(x.len());
    y[y.len() - n..]
        .iter()
        .zip(&x[x.len() - n..])
        .map(|(yi, xi)| yi - hedge * xi)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hedge_ratio_of_scaled_series() {
        let x: Vec<f64> = (0..20).map(|i| 40.0 + i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.8 * v + 5.0).collect();
        assert_relative_eq!(estimate_hedge_ratio(&y, &x).unwrap(), 1.8, epsilon = 1e-10);
    }

    #[test]
    fn test_stale_regressor_is_singular() {
        let x = vec![25.0; 20];
        let y: Vec<f64> = (0..20).map(|i| 50.0 + i as f64).collect();
        assert_eq!(estimate_hedge_ratio(&y, &x), Err(StatError::SingularRegression));
    }

    #[test]
    fn test_spread_aligns_on_latest_points() {
        let y = [10.0, 11.0, 12.0, 13.0];
        let x = [5.5, 6.0, 6.5];
        let spread = compute_spread(&y, &x, 2.0);
        assert_eq!(spread, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_hedge_and_spread_share_alignment() {
        // y has one stale leading point; both functions must drop it
        let x: Vec<f64> = (0..10).map(|i| 20.0 + i as f64).collect();
        let mut y = vec![999.0];
        y.extend(x.iter().map(|v| 3.0 * v + 1.0));
        let hedge = estimate_hedge_ratio(&y, &x).unwrap();
        assert_relative_eq!(hedge, 3.0, epsilon = 1e-10);
        for value in compute_spread(&y, &x, hedge) {
            assert_relative_eq!(value, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_spread_values() {
        let spread = compute_spread(&[100.0, 102.0], &[50.0, 50.0], 1.5);
        assert_eq!(spread, vec![25.0, 27.0]);
    }
}
