//! Ordinary Least Squares
//!
//! Closed-form bivariate OLS for hedge ratios and lag regressions, plus a small
//! multiple-regression solver (normal equations, Gauss-Jordan with partial
//! pivoting) for the augmented Dickey-Fuller lag search.

use super::{mean, StatError, MIN_VARIANCE};

/// Result of `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OlsFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Number of observations used
    pub n: usize,
}

impl OlsFit {
    /// Residuals `y_i - (slope * x_i + intercept)`
    pub fn residuals(&self, y: &[f64], x: &[f64]) -> Vec<f64> {
        y.iter()
            .zip(x.iter())
            .map(|(yi, xi)| yi - (self.slope * xi + self.intercept))
            .collect()
    }
}

/// Fit `y = slope * x + intercept` over the aligned prefix of both series.
///
/// Fails with `SingularRegression` when `x` has zero variance.
pub fn simple_ols(y: &[f64], x: &[f64]) -> Result<OlsFit, StatError> {
    let n = y.len().min(x.len());
    if n < 2 {
        return Err(StatError::too_short(2, n));
    }
    let y = &y[..n];
    let x = &x[..n];

    let mean_x = mean(x);
    let mean_y = mean(y);

    let (sxy, sxx, syy) = x
        .iter()
        .zip(y.iter())
        .fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (xi, yi)| {
            let dx = xi - mean_x;
            let dy = yi - mean_y;
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        });

    if sxx / n as f64 <= MIN_VARIANCE {
        return Err(StatError::SingularRegression);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy > 0.0 { (sxy * sxy) / (sxx * syy) } else { 1.0 };

    Ok(OlsFit {
        slope,
        intercept,
        r_squared,
        n,
    })
}

/// Result of a multiple regression `y = X b + e`
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Residual sum of squares
    pub rss: f64,
    pub nobs: usize,
}

impl MultipleFit {
    /// t-statistic of coefficient `index`
    pub fn t_value(&self, index: usize) -> f64 {
        self.coefficients[index] / self.std_errors[index]
    }

    /// Gaussian log-likelihood of the fit
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.rss / n).ln() + 1.0)
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Fit `y = X b` where `rows[i]` holds the regressors of observation `i`.
pub fn multiple_ols(y: &[f64], rows: &[Vec<f64>]) -> Result<MultipleFit, StatError> {
    let nobs = y.len();
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 || rows.len() != nobs {
        return Err(StatError::InsufficientData(
            "regressor matrix does not match observations".to_string(),
        ));
    }
    if nobs <= k {
        return Err(StatError::too_short(k + 1, nobs));
    }

    // X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, yi) in rows.iter().zip(y.iter()) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let inverse = invert(xtx).ok_or(StatError::SingularRegression)?;

    let coefficients: Vec<f64> = inverse
        .iter()
        .map(|row| row.iter().zip(xty.iter()).map(|(a, b)| a * b).sum())
        .collect();

    let rss: f64 = rows
        .iter()
        .zip(y.iter())
        .map(|(row, yi)| {
            let fitted: f64 = row.iter().zip(coefficients.iter()).map(|(a, b)| a * b).sum();
            let e = yi - fitted;
            e * e
        })
        .sum();

    let sigma2 = rss / (nobs - k) as f64;
    let std_errors = (0..k)
        .map(|i| (sigma2 * inverse[i][i]).max(0.0).sqrt())
        .collect();

    Ok(MultipleFit {
        coefficients,
        std_errors,
        rss,
        nobs,
    })
}

/// Gauss-Jordan inversion with partial pivoting
fn invert(mut matrix: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tolerance = scale * 1e-13;

    let mut inverse: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot][col].abs() <= tolerance {
            return None;
        }
        matrix.swap(col, pivot);
        inverse.swap(col, pivot);

        let p = matrix[col][col];
        for j in 0..n {
            matrix[col][j] /= p;
            inverse[col][j] /= p;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }

    Some(inverse)
}
