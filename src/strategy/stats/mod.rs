//! Statistical Tests
//!
//! Pure functions over one or two numeric series used by the pair screener:
//! - Pearson correlation
//! - Engle-Granger cointegration (direction sensitive)
//! - Augmented Dickey-Fuller stationarity with AIC lag selection
//! - Mean-reversion half-life and Hurst exponent
//! - Shapiro-Wilk normality (Royston approximation)
//!
//! Every test returns `Result<f64, StatError>` so callers can tell
//! "computed and failed a threshold" apart from "could not be computed".

pub mod regression;
pub mod adf;
pub mod mean_reversion;
pub mod normality;

pub use regression::{simple_ols, multiple_ols, OlsFit, MultipleFit};
pub use adf::{adf_test, cointegration_p_value, stationarity_p_value, mackinnon_p_value, AdfResult, Trend};
pub use mean_reversion::{half_life, hurst_exponent};
pub use normality::{normality_p_value, shapiro_wilk, ShapiroWilk};

use thiserror::Error;

/// Minimum variance treated as non-degenerate
pub(crate) const MIN_VARIANCE: f64 = 1e-12;

/// Failure to compute a statistic
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatError {
    /// Series too short or degenerate (e.g. zero variance)
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// Regressor has zero variance over the window
    #[error("Singular regression: regressor has zero variance")]
    SingularRegression,
    /// Fitted coefficient makes the statistic undefined
    #[error("Degenerate fit: coefficient {0} is not mean-reverting")]
    DegenerateFit(f64),
}

impl StatError {
    pub(crate) fn too_short(needed: usize, got: usize) -> Self {
        StatError::InsufficientData(format!("need at least {} points, got {}", needed, got))
    }
}

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let d = v - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Trailing `len` values of a series (the whole series if shorter)
pub fn tail(values: &[f64], len: usize) -> &[f64] {
    let start = values.len().saturating_sub(len);
    &values[start..]
}

/// Pearson correlation of two aligned series.
///
/// Uses the common trailing length when the inputs differ in length.
pub fn correlation(a: &[f64], b: &[f64]) -> Result<f64, StatError> {
    let n = a.len().min(b.len());
    if n < 2 {
        return Err(StatError::too_short(2, n));
    }
    let a = tail(a, n);
    let b = tail(b, n);

    let mean_a = mean(a);
    let mean_b = mean(b);

    let (cov, var_a, var_b) = a
        .iter()
        .zip(b.iter())
        .fold((0.0, 0.0, 0.0), |(cov, va, vb), (x, y)| {
            let dx = x - mean_a;
            let dy = y - mean_b;
            (cov + dx * dy, va + dx * dx, vb + dy * dy)
        });

    if var_a / n as f64 <= MIN_VARIANCE || var_b / n as f64 <= MIN_VARIANCE {
        return Err(StatError::InsufficientData(
            "zero variance series".to_string(),
        ));
    }

    let r = cov / (var_a * var_b).sqrt();
    if !r.is_finite() {
        return Err(StatError::InsufficientData(format!("non-finite correlation {}", r)));
    }
    Ok(r.clamp(-1.0, 1.0))
}
