//! Flat per-share commission model

/// Commission for a dollar bet on one leg: shares bought times the per-share rate.
///
/// Returns 0.0 for a non-positive price.
pub fn estimate_commission(price: f64, bet_size: f64, rate: f64) -> f64 {
    if price <= 0.0 || !price.is_finite() {
        return 0.0;
    }
    rate * bet_size.abs() / price
}

/// Commission charged on a fill of `shares`
pub fn fill_commission(shares: f64, rate: f64) -> f64 {
    rate * shares.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_commission_scales_with_shares() {
        // $5000 at $50 = 100 shares
        assert_relative_eq!(estimate_commission(50.0, 5000.0, 0.0035), 0.35);
        assert_relative_eq!(estimate_commission(50.0, -5000.0, 0.0035), 0.35);
    }

    #[test]
    fn test_commission_guards_bad_price() {
        assert_eq!(estimate_commission(0.0, 5000.0, 0.0035), 0.0);
        assert_eq!(estimate_commission(f64::NAN, 5000.0, 0.0035), 0.0);
    }

    #[test]
    fn test_fill_commission() {
        assert_relative_eq!(fill_commission(-200.0, 0.005), 1.0);
    }
}
