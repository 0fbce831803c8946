//! Screening Gates
//!
//! An ordered pipeline of statistical gates. Each gate computes one metric
//! over its own trailing window and either passes, fails its threshold or
//! fails to compute. The pipeline short-circuits on the first gate that
//! does not pass.

use crate::domain::{MetricKind, ScreeningMetrics};
use crate::strategy::hedge::{compute_spread, estimate_hedge_ratio};
use crate::strategy::params::ScreeningParams;
use crate::strategy::stats::{self, tail, StatError};

/// Statistics the gates are evaluated with.
///
/// `first`/`second` are the two legs of a directed pair; implementations
/// must not assume symmetry.
pub trait PairStatistics: Send + Sync {
    fn correlation(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError>;
    fn cointegration_p_value(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError>;
    fn hedge_ratio(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError>;
    fn stationarity_p_value(&self, spread: &[f64]) -> Result<f64, StatError>;
    fn hurst_exponent(&self, spread: &[f64]) -> Result<f64, StatError>;
    fn half_life(&self, spread: &[f64]) -> Result<f64, StatError>;
    fn normality_p_value(&self, spread: &[f64]) -> Result<f64, StatError>;
}

/// Pearson / Engle-Granger / ADF / Hurst / OLS half-life / Shapiro-Wilk
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalStatistics;

impl PairStatistics for ClassicalStatistics {
    fn correlation(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError> {
        stats::correlation(first, second)
    }

    fn cointegration_p_value(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError> {
        stats::cointegration_p_value(first, second)
    }

    fn hedge_ratio(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError> {
        estimate_hedge_ratio(first, second)
    }

    fn stationarity_p_value(&self, spread: &[f64]) -> Result<f64, StatError> {
        stats::stationarity_p_value(spread)
    }

    fn hurst_exponent(&self, spread: &[f64]) -> Result<f64, StatError> {
        stats::hurst_exponent(spread)
    }

    fn half_life(&self, spread: &[f64]) -> Result<f64, StatError> {
        stats::half_life(spread)
    }

    fn normality_p_value(&self, spread: &[f64]) -> Result<f64, StatError> {
        stats::normality_p_value(spread)
    }
}

/// One gate with its resolved threshold and window
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    Correlation { min_abs: f64, lookback: usize },
    Cointegration { max_p: f64, lookback: usize },
    Stationarity { max_p: f64, lookback: usize },
    /// Open interval (lower, upper)
    Hurst { lower: f64, upper: f64, lookback: usize },
    /// Closed interval [min, max]
    HalfLife { min: f64, max: f64, lookback: usize },
    Normality { max_p: f64, lookback: usize },
}

/// Result of evaluating a single gate
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Pass(f64),
    Fail(f64),
    Error(StatError),
}

impl Gate {
    pub fn kind(&self) -> MetricKind {
        match self {
            Gate::Correlation { .. } => MetricKind::Correlation,
            Gate::Cointegration { .. } => MetricKind::Cointegration,
            Gate::Stationarity { .. } => MetricKind::Stationarity,
            Gate::Hurst { .. } => MetricKind::Hurst,
            Gate::HalfLife { .. } => MetricKind::HalfLife,
            Gate::Normality { .. } => MetricKind::Normality,
        }
    }

    pub fn lookback(&self) -> usize {
        match self {
            Gate::Correlation { lookback, .. }
            | Gate::Cointegration { lookback, .. }
            | Gate::Stationarity { lookback, .. }
            | Gate::Hurst { lookback, .. }
            | Gate::HalfLife { lookback, .. }
            | Gate::Normality { lookback, .. } => *lookback,
        }
    }

    /// Threshold check on a computed metric
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Gate::Correlation { min_abs, .. } => value.abs() >= *min_abs,
            Gate::Cointegration { max_p, .. }
            | Gate::Stationarity { max_p, .. }
            | Gate::Normality { max_p, .. } => value <= *max_p,
            Gate::Hurst { lower, upper, .. } => value > *lower && value < *upper,
            Gate::HalfLife { min, max, .. } => value >= *min && value <= *max,
        }
    }

    /// Compute this gate's metric over its trailing window
    pub fn compute(
        &self,
        statistics: &dyn PairStatistics,
        first: &[f64],
        second: &[f64],
    ) -> Result<f64, StatError> {
        let lookback = self.lookback();
        let n = first.len().min(second.len());
        if n < lookback {
            return Err(StatError::too_short(lookback, n));
        }
        let first = tail(first, lookback);
        let second = tail(second, lookback);

        match self {
            Gate::Correlation { .. } => statistics.correlation(first, second),
            Gate::Cointegration { .. } => statistics.cointegration_p_value(first, second),
            _ => {
                let hedge = statistics.hedge_ratio(first, second)?;
                let spread = compute_spread(first, second, hedge);
                match self {
                    Gate::Stationarity { .. } => statistics.stationarity_p_value(&spread),
                    Gate::Hurst { .. } => statistics.hurst_exponent(&spread),
                    Gate::HalfLife { .. } => statistics.half_life(&spread),
                    _ => statistics.normality_p_value(&spread),
                }
            }
        }
    }

    pub fn evaluate(
        &self,
        statistics: &dyn PairStatistics,
        first: &[f64],
        second: &[f64],
    ) -> GateOutcome {
        match self.compute(statistics, first, second) {
            Ok(value) if self.accepts(value) => GateOutcome::Pass(value),
            Ok(value) => GateOutcome::Fail(value),
            Err(e) => GateOutcome::Error(e),
        }
    }
}

/// Enabled gates in pipeline order with thresholds resolved from params
pub fn build_pipeline(params: &ScreeningParams) -> Vec<Gate> {
    params
        .enabled_gates()
        .into_iter()
        .map(|kind| {
            let lookback = params.gate_lookback(kind);
            match kind {
                MetricKind::Correlation => Gate::Correlation {
                    min_abs: params.correlation.min_abs,
                    lookback,
                },
                MetricKind::Cointegration => Gate::Cointegration {
                    max_p: params.p_value_threshold(kind),
                    lookback,
                },
                MetricKind::Stationarity => Gate::Stationarity {
                    max_p: params.p_value_threshold(kind),
                    lookback,
                },
                MetricKind::Hurst => Gate::Hurst {
                    lower: params.hurst.lower,
                    upper: params.hurst.upper,
                    lookback,
                },
                MetricKind::HalfLife => Gate::HalfLife {
                    min: params.half_life.lower,
                    max: params.half_life.upper,
                    lookback,
                },
                MetricKind::Normality => Gate::Normality {
                    max_p: params.p_value_threshold(kind),
                    lookback,
                },
            }
        })
        .collect()
}

/// How a candidate left the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Survived,
    Rejected(MetricKind),
    Failed(MetricKind, StatError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateRun {
    pub metrics: ScreeningMetrics,
    pub verdict: Verdict,
}

/// Run every gate in order, stopping at the first one that does not pass
pub fn run_pipeline(
    gates: &[Gate],
    statistics: &dyn PairStatistics,
    first: &[f64],
    second: &[f64],
) -> GateRun {
    let mut metrics = ScreeningMetrics::default();
    for gate in gates {
        match gate.evaluate(statistics, first, second) {
            GateOutcome::Pass(value) => metrics.set(gate.kind(), value),
            GateOutcome::Fail(value) => {
                metrics.set(gate.kind(), value);
                return GateRun {
                    metrics,
                    verdict: Verdict::Rejected(gate.kind()),
                };
            }
            GateOutcome::Error(e) => {
                return GateRun {
                    metrics,
                    verdict: Verdict::Failed(gate.kind(), e),
                };
            }
        }
    }
    GateRun {
        metrics,
        verdict: Verdict::Survived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::stats::test_series::{random_walk, white_noise};
    use approx::assert_relative_eq;

    /// Returns fixed values regardless of input
    struct Canned {
        correlation: Result<f64, StatError>,
        cointegration: Result<f64, StatError>,
        stationarity: Result<f64, StatError>,
        hurst: Result<f64, StatError>,
        half_life: Result<f64, StatError>,
        normality: Result<f64, StatError>,
    }

    impl Canned {
        fn passing() -> Self {
            Canned {
                correlation: Ok(0.97),
                cointegration: Ok(0.001),
                stationarity: Ok(0.02),
                hurst: Ok(0.3),
                half_life: Ok(12.0),
                normality: Ok(0.03),
            }
        }
    }

    impl PairStatistics for Canned {
        fn correlation(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            self.correlation.clone()
        }
        fn cointegration_p_value(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            self.cointegration.clone()
        }
        fn hedge_ratio(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            Ok(1.0)
        }
        fn stationarity_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
            self.stationarity.clone()
        }
        fn hurst_exponent(&self, _: &[f64]) -> Result<f64, StatError> {
            self.hurst.clone()
        }
        fn half_life(&self, _: &[f64]) -> Result<f64, StatError> {
            self.half_life.clone()
        }
        fn normality_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
            self.normality.clone()
        }
    }

    fn history() -> (Vec<f64>, Vec<f64>) {
        (vec![1.0; 730], vec![2.0; 730])
    }

    #[test]
    fn test_default_pipeline_order_and_thresholds() {
        let gates = build_pipeline(&ScreeningParams::default());
        let kinds: Vec<MetricKind> = gates.iter().map(Gate::kind).collect();
        assert_eq!(kinds, MetricKind::ALL.to_vec());
        match &gates[1] {
            Gate::Cointegration { max_p, lookback } => {
                assert_relative_eq!(*max_p, 0.2 / 6.0);
                assert_eq!(*lookback, 730);
            }
            other => panic!("unexpected gate {:?}", other),
        }
    }

    #[test]
    fn test_all_gates_pass() {
        let gates = build_pipeline(&ScreeningParams::default());
        let (a, b) = history();
        let run = run_pipeline(&gates, &Canned::passing(), &a, &b);
        assert_eq!(run.verdict, Verdict::Survived);
        assert_eq!(run.metrics.half_life, Some(12.0));
        assert_eq!(run.metrics.normality_p, Some(0.03));
    }

    #[test]
    fn test_pipeline_short_circuits_on_fail() {
        let gates = build_pipeline(&ScreeningParams::default());
        let (a, b) = history();
        let stats = Canned {
            cointegration: Ok(0.2),
            ..Canned::passing()
        };
        let run = run_pipeline(&gates, &stats, &a, &b);
        assert_eq!(run.verdict, Verdict::Rejected(MetricKind::Cointegration));
        // computed but failed: recorded
        assert_eq!(run.metrics.cointegration_p, Some(0.2));
        // never reached: absent
        assert_eq!(run.metrics.stationarity_p, None);
    }

    #[test]
    fn test_computation_error_leaves_metric_absent() {
        let gates = build_pipeline(&ScreeningParams::default());
        let (a, b) = history();
        let stats = Canned {
            half_life: Err(StatError::DegenerateFit(0.0)),
            ..Canned::passing()
        };
        let run = run_pipeline(&gates, &stats, &a, &b);
        assert_eq!(
            run.verdict,
            Verdict::Failed(MetricKind::HalfLife, StatError::DegenerateFit(0.0))
        );
        assert_eq!(run.metrics.half_life, None);
        assert_eq!(run.metrics.hurst, Some(0.3));
    }

    #[test]
    fn test_negative_correlation_passes_by_magnitude() {
        let gate = Gate::Correlation {
            min_abs: 0.95,
            lookback: 10,
        };
        assert!(gate.accepts(-0.97));
        assert!(!gate.accepts(0.9));
        assert!(!gate.accepts(f64::NAN));
    }

    #[test]
    fn test_band_edges() {
        let hurst = Gate::Hurst {
            lower: 0.0,
            upper: 0.5,
            lookback: 100,
        };
        assert!(!hurst.accepts(0.0));
        assert!(!hurst.accepts(0.5));
        assert!(hurst.accepts(0.49));

        let half_life = Gate::HalfLife {
            min: 10.0,
            max: 16.0,
            lookback: 100,
        };
        assert!(half_life.accepts(10.0));
        assert!(half_life.accepts(16.0));
        assert!(!half_life.accepts(16.01));
    }

    #[test]
    fn test_disabled_gate_is_skipped() {
        let params = ScreeningParams::default().with_gate(MetricKind::Normality, false);
        let gates = build_pipeline(&params);
        assert_eq!(gates.len(), 5);
        let (a, b) = history();
        let stats = Canned {
            normality: Ok(0.9),
            ..Canned::passing()
        };
        let run = run_pipeline(&gates, &stats, &a, &b);
        assert_eq!(run.verdict, Verdict::Survived);
        assert_eq!(run.metrics.normality_p, None);
    }

    #[test]
    fn test_short_history_is_an_error() {
        let gate = Gate::Correlation {
            min_abs: 0.95,
            lookback: 730,
        };
        let a = vec![1.0; 100];
        assert!(matches!(
            gate.evaluate(&ClassicalStatistics, &a, &a),
            GateOutcome::Error(StatError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_correlation_symmetric_cointegration_directional() {
        let x = random_walk(500, 50.0, 1.0, 3);
        let noise = white_noise(500, 4);
        let y: Vec<f64> = x
            .iter()
            .zip(noise.iter())
            .map(|(v, e)| 0.5 * v + 20.0 + 3.0 * e)
            .collect();
        let stats = ClassicalStatistics;
        let forward = stats.correlation(&y, &x).unwrap();
        let backward = stats.correlation(&x, &y).unwrap();
        assert_relative_eq!(forward, backward, epsilon = 1e-12);

        let gate = Gate::Cointegration {
            max_p: 0.05,
            lookback: 500,
        };
        assert!(matches!(gate.evaluate(&stats, &y, &x), GateOutcome::Pass(_)));
        assert!(matches!(gate.evaluate(&stats, &x, &y), GateOutcome::Fail(_)));
    }
}
