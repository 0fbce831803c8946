//! Augmented Dickey-Fuller and Engle-Granger Tests
//!
//! ADF regression: dX_t = [c] + gamma * X_{t-1} + sum_i phi_i * dX_{t-i} + e_t
//!
//! The lag order is chosen by minimum AIC over `0..=max_lag` on a common
//! sample, then the regression is refit on the widest sample for that lag.
//! The t-statistic of gamma is mapped to a p-value with MacKinnon's (1994,
//! 2010) response-surface approximation.

use statrs::distribution::{ContinuousCDF, Normal};

use super::regression::{multiple_ols, simple_ols};
use super::StatError;

/// Deterministic terms included in the ADF regression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// No constant (used on Engle-Granger residuals)
    None,
    /// Constant term
    Constant,
}

impl Trend {
    fn terms(&self) -> usize {
        match self {
            Trend::None => 0,
            Trend::Constant => 1,
        }
    }
}

/// Outcome of an ADF regression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    /// t-statistic of the lagged level coefficient
    pub statistic: f64,
    /// Number of lagged differences selected by AIC
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
}

/// Which MacKinnon response surface maps the statistic to a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PValueSurface {
    /// Single series unit-root test with constant
    Adf,
    /// Residual-based cointegration test of two series with constant
    EngleGranger,
}

struct SurfaceCoefficients {
    tau_max: f64,
    tau_min: f64,
    tau_star: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
}

const ADF_SURFACE: SurfaceCoefficients = SurfaceCoefficients {
    tau_max: 2.74,
    tau_min: -18.83,
    tau_star: -1.61,
    small_p: [2.1659, 1.4412, 0.038269],
    large_p: [1.7339, 0.93202, -0.12745, -0.010368],
};

const ENGLE_GRANGER_SURFACE: SurfaceCoefficients = SurfaceCoefficients {
    tau_max: 0.92,
    tau_min: -18.86,
    tau_star: -2.62,
    small_p: [2.92, 1.5012, 0.039796],
    large_p: [2.1945, 0.64695, -0.29198, -0.042377],
};

/// Evaluate a polynomial with coefficients in ascending order
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// MacKinnon approximate asymptotic p-value for a Dickey-Fuller statistic
pub fn mackinnon_p_value(statistic: f64, surface: PValueSurface) -> f64 {
    let coefficients = match surface {
        PValueSurface::Adf => &ADF_SURFACE,
        PValueSurface::EngleGranger => &ENGLE_GRANGER_SURFACE,
    };

    if statistic > coefficients.tau_max {
        return 1.0;
    }
    if statistic < coefficients.tau_min {
        return 0.0;
    }

    let z = if statistic <= coefficients.tau_star {
        polyval(&coefficients.small_p, statistic)
    } else {
        polyval(&coefficients.large_p, statistic)
    };
    Normal::standard().cdf(z)
}

/// Default maximum lag: ceil(12 * (n / 100)^(1/4))
fn default_max_lag(nobs: usize) -> usize {
    (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Design rows for lag order `lag`, using observations `start..diffs.len()`
fn design(
    levels: &[f64],
    diffs: &[f64],
    lag: usize,
    start: usize,
    trend: Trend,
) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mut y = Vec::with_capacity(diffs.len() - start);
    let mut rows = Vec::with_capacity(diffs.len() - start);
    for t in start..diffs.len() {
        let mut row = Vec::with_capacity(1 + lag + trend.terms());
        row.push(levels[t]);
        row.extend((1..=lag).map(|i| diffs[t - i]));
        if trend == Trend::Constant {
            row.push(1.0);
        }
        y.push(diffs[t]);
        rows.push(row);
    }
    (y, rows)
}

/// Run an augmented Dickey-Fuller regression with AIC lag selection
pub fn adf_test(series: &[f64], trend: Trend, max_lag: Option<usize>) -> Result<AdfResult, StatError> {
    let n = series.len();
    let min_len = 2 * (trend.terms() + 2);
    if n < min_len {
        return Err(StatError::too_short(min_len, n));
    }

    let cap = n / 2 - trend.terms() - 1;
    let max_lag = max_lag.unwrap_or_else(|| default_max_lag(n)).min(cap);

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag search on the common sample trimmed by max_lag
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let (y, rows) = design(series, &diffs, lag, max_lag, trend);
        let fit = match multiple_ols(&y, &rows) {
            Ok(fit) => fit,
            Err(_) => continue,
        };
        let aic = fit.aic();
        if !aic.is_finite() {
            continue;
        }
        match best {
            Some((best_aic, _)) if aic >= best_aic => {}
            _ => best = Some((aic, lag)),
        }
    }

    let used_lag = match best {
        Some((_, lag)) => lag,
        None => return Err(StatError::SingularRegression),
    };

    let (y, rows) = design(series, &diffs, used_lag, used_lag, trend);
    let fit = multiple_ols(&y, &rows)?;
    let statistic = fit.t_value(0);
    if statistic.is_nan() {
        return Err(StatError::InsufficientData(
            "ADF statistic is undefined".to_string(),
        ));
    }

    Ok(AdfResult {
        statistic,
        used_lag,
        nobs: fit.nobs,
    })
}

/// ADF p-value that `spread` has a unit root (lower = more mean-reverting)
pub fn stationarity_p_value(spread: &[f64]) -> Result<f64, StatError> {
    let result = adf_test(spread, Trend::Constant, None)?;
    Ok(mackinnon_p_value(result.statistic, PValueSurface::Adf))
}

/// Engle-Granger p-value for cointegration of `a` regressed on `b`.
///
/// Direction sensitive: the residuals come from regressing `a` on `b`,
/// so swapping the arguments can change the result.
pub fn cointegration_p_value(a: &[f64], b: &[f64]) -> Result<f64, StatError> {
    let n = a.len().min(b.len());
    let a = &a[a.len() - n..];
    let b = &b[b.len() - n..];

    let fit = simple_ols(a, b)?;

    // Perfectly collinear series: residuals carry no information
    if fit.r_squared >= 1.0 - 100.0 * f64::EPSILON.sqrt() {
        return Ok(0.0);
    }

    let residuals = fit.residuals(a, b);
    let result = adf_test(&residuals, Trend::None, None)?;
    Ok(mackinnon_p_value(result.statistic, PValueSurface::EngleGranger))
}
