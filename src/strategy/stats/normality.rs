//! Shapiro-Wilk Normality Test
//!
//! Royston (1995) algorithm AS R94: approximate Shapiro-Wilk coefficients from
//! normal order statistics, and a normalizing transform of W for the p-value.
//! Used as a confirming filter on the shape of spread residuals.

use statrs::distribution::{ContinuousCDF, Normal};

use super::{mean, StatError};

/// Smallest sample accepted
pub const SHAPIRO_MIN_LEN: usize = 4;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const GAMMA: [f64; 2] = [-2.273, 0.459];

/// W statistic and its p-value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Half of the antisymmetric coefficient vector (largest order statistic first)
fn coefficients(n: usize, normal: &Normal) -> Vec<f64> {
    let half = n / 2;
    let an = n as f64;

    // Expected normal order statistics for the lower half (negative values)
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let mut a = vec![0.0; half];
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    a[0] = a1;

    let (first_plain, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };

    for i in first_plain..half {
        a[i] = -m[i] / fac;
    }
    a
}

/// Shapiro-Wilk test of the hypothesis that `values` are normally distributed
pub fn shapiro_wilk(values: &[f64]) -> Result<ShapiroWilk, StatError> {
    let n = values.len();
    if n < SHAPIRO_MIN_LEN {
        return Err(StatError::too_short(SHAPIRO_MIN_LEN, n));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StatError::InsufficientData("non-finite value in sample".to_string()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let range = sorted[n - 1] - sorted[0];
    if range <= f64::EPSILON * sorted[n - 1].abs().max(1.0) {
        return Err(StatError::InsufficientData("sample has zero range".to_string()));
    }

    let normal = Normal::standard();
    let a = coefficients(n, &normal);

    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (sorted[n - 1 - i] - sorted[i]))
        .sum();
    let m = mean(&sorted);
    let ss: f64 = sorted.iter().map(|v| (v - m) * (v - m)).sum();

    let w = ((numerator * numerator) / ss).min(1.0);
    let p_value = w_p_value(w, n, &normal);

    Ok(ShapiroWilk { w, p_value })
}

/// Royston's normalizing transformation of W
fn w_p_value(w: f64, n: usize, normal: &Normal) -> f64 {
    if w >= 1.0 {
        return 1.0;
    }
    let an = n as f64;
    let w1 = (1.0 - w).ln();

    let (y, m, s) = if n <= 11 {
        let gamma = poly(&GAMMA, an);
        if w1 >= gamma {
            return 0.0;
        }
        let y = -(gamma - w1).ln();
        (y, poly(&C3, an), poly(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (w1, poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };

    (1.0 - normal.cdf((y - m) / s)).clamp(0.0, 1.0)
}

/// Shapiro-Wilk p-value of the spread distribution
pub fn normality_p_value(spread: &[f64]) -> Result<f64, StatError> {
    shapiro_wilk(spread).map(|result| result.p_value)
}
