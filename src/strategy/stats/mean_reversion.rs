//! Mean-Reversion Speed
//!
//! - Half-life from the lag-1 regression dS_t = kappa * S_{t-1} + c + e
//! - Hurst exponent from the scaling of lagged-difference dispersion
//!
//! H < 0.5 indicates mean reversion, H = 0.5 a random walk, H > 0.5 trending.

use super::regression::simple_ols;
use super::{population_std, StatError};

/// Smallest series accepted by `hurst_exponent`
pub const HURST_MIN_LEN: usize = 100;

/// Lags used for the Hurst regression (2..=99)
const HURST_LAGS: std::ops::Range<usize> = 2..100;

/// Mean-reversion half-life in periods: `-ln(2) / kappa`.
///
/// Index 0 has no predecessor: it is regressed with its own level as the lag
/// and a zero delta. Fails with `DegenerateFit` when kappa >= 0 or the lagged
/// spread is flat.
pub fn half_life(spread: &[f64]) -> Result<f64, StatError> {
    let n = spread.len();
    if n < 3 {
        return Err(StatError::too_short(3, n));
    }

    let mut lagged = Vec::with_capacity(n);
    let mut deltas = Vec::with_capacity(n);
    lagged.push(spread[0]);
    deltas.push(0.0);
    for w in spread.windows(2) {
        lagged.push(w[0]);
        deltas.push(w[1] - w[0]);
    }

    let kappa = match simple_ols(&deltas, &lagged) {
        Ok(fit) => fit.slope,
        Err(StatError::SingularRegression) => return Err(StatError::DegenerateFit(0.0)),
        Err(e) => return Err(e),
    };

    if kappa >= 0.0 || !kappa.is_finite() {
        return Err(StatError::DegenerateFit(kappa));
    }

    let half_life = -(2.0_f64.ln()) / kappa;
    if !half_life.is_finite() {
        return Err(StatError::DegenerateFit(kappa));
    }
    Ok(half_life)
}

/// Hurst exponent: twice the slope of log10(lag) vs log10(sqrt(std(x[t+lag] - x[t])))
pub fn hurst_exponent(spread: &[f64]) -> Result<f64, StatError> {
    let n = spread.len();
    if n < HURST_MIN_LEN {
        return Err(StatError::too_short(HURST_MIN_LEN, n));
    }

    let mut log_lags = Vec::with_capacity(HURST_LAGS.len());
    let mut log_tau = Vec::with_capacity(HURST_LAGS.len());
    for lag in HURST_LAGS {
        // Need at least two differences for a dispersion estimate
        if n - lag < 2 {
            continue;
        }
        let diffs: Vec<f64> = spread[lag..]
            .iter()
            .zip(spread.iter())
            .map(|(later, earlier)| later - earlier)
            .collect();
        let tau = population_std(&diffs).sqrt();
        if tau <= 0.0 {
            return Err(StatError::InsufficientData(format!(
                "lagged differences have zero dispersion at lag {}",
                lag
            )));
        }
        log_lags.push((lag as f64).log10());
        log_tau.push(tau.log10());
    }

    if log_lags.len() < 2 {
        return Err(StatError::too_short(HURST_MIN_LEN, n));
    }

    let fit = simple_ols(&log_tau, &log_lags)?;
    Ok(2.0 * fit.slope)
}
