//! Strategy Parameters
//!
//! Typed runtime parameters for screening, trading and allocation.
//! Defaults follow the classic sector-pairs setup: two-year screening
//! lookback, 20-period hedge and z-score windows, entry at 1.0 sigma and
//! exit at 0.2 sigma.

use serde::{Deserialize, Serialize};

use crate::domain::MetricKind;

/// How capital is split between shortlisted pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairWeighting {
    /// 1 / number of pairs
    #[default]
    Equal,
    /// |correlation| share of the shortlist's total |correlation|
    Correlation,
}

/// Correlation-magnitude gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationGateParams {
    pub enabled: bool,
    pub min_abs: f64,
    pub lookback: Option<usize>,
}

impl Default for CorrelationGateParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_abs: 0.95,
            lookback: None,
        }
    }
}

/// Gate passing when a p-value is at or below a threshold.
///
/// Without an explicit `max_p_value` the threshold is the significance
/// budget split across enabled gates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PValueGateParams {
    pub enabled: bool,
    pub max_p_value: Option<f64>,
    pub lookback: Option<usize>,
}

impl PValueGateParams {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Gate passing when a value falls inside a band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeGateParams {
    pub enabled: bool,
    pub lower: f64,
    pub upper: f64,
    pub lookback: Option<usize>,
}

impl RangeGateParams {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            enabled: true,
            lower,
            upper,
            lookback: None,
        }
    }
}

/// Pair screening configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningParams {
    /// Price history length used by every gate without its own lookback
    pub lookback: usize,
    pub desired_pairs: usize,
    pub ranking_metric: MetricKind,
    /// Family-wise false-positive budget shared by enabled gates
    pub significance_budget: f64,
    /// Compare assets across partitions
    pub cross_partition: bool,
    pub max_partition_size: usize,
    pub correlation: CorrelationGateParams,
    pub cointegration: PValueGateParams,
    pub stationarity: PValueGateParams,
    /// Open interval
    pub hurst: RangeGateParams,
    /// Closed interval, in periods
    pub half_life: RangeGateParams,
    pub normality: PValueGateParams,
}

impl Default for ScreeningParams {
    fn default() -> Self {
        Self {
            lookback: 730,
            desired_pairs: 4,
            ranking_metric: MetricKind::Cointegration,
            significance_budget: 0.20,
            cross_partition: false,
            max_partition_size: 500,
            correlation: CorrelationGateParams::default(),
            cointegration: PValueGateParams::enabled(),
            stationarity: PValueGateParams::enabled(),
            hurst: RangeGateParams::new(0.0, 0.5),
            half_life: RangeGateParams::new(10.0, 16.0),
            normality: PValueGateParams::enabled(),
        }
    }
}

impl ScreeningParams {
    pub fn with_desired_pairs(mut self, count: usize) -> Self {
        self.desired_pairs = count;
        self
    }

    pub fn with_ranking_metric(mut self, metric: MetricKind) -> Self {
        self.ranking_metric = metric;
        self
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Enable or disable one gate
    pub fn with_gate(mut self, kind: MetricKind, enabled: bool) -> Self {
        match kind {
            MetricKind::Correlation => self.correlation.enabled = enabled,
            MetricKind::Cointegration => self.cointegration.enabled = enabled,
            MetricKind::Stationarity => self.stationarity.enabled = enabled,
            MetricKind::Hurst => self.hurst.enabled = enabled,
            MetricKind::HalfLife => self.half_life.enabled = enabled,
            MetricKind::Normality => self.normality.enabled = enabled,
        }
        self
    }

    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Correlation => self.correlation.enabled,
            MetricKind::Cointegration => self.cointegration.enabled,
            MetricKind::Stationarity => self.stationarity.enabled,
            MetricKind::Hurst => self.hurst.enabled,
            MetricKind::HalfLife => self.half_life.enabled,
            MetricKind::Normality => self.normality.enabled,
        }
    }

    /// Enabled gates in pipeline order
    pub fn enabled_gates(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .iter()
            .copied()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }

    /// Per-gate significance level after splitting the budget
    pub fn corrected_significance(&self) -> f64 {
        let enabled = self.enabled_gates().len().max(1);
        self.significance_budget / enabled as f64
    }

    /// Threshold for a p-value gate (explicit override or corrected budget)
    pub fn p_value_threshold(&self, kind: MetricKind) -> f64 {
        let explicit = match kind {
            MetricKind::Cointegration => self.cointegration.max_p_value,
            MetricKind::Stationarity => self.stationarity.max_p_value,
            MetricKind::Normality => self.normality.max_p_value,
            _ => None,
        };
        explicit.unwrap_or_else(|| self.corrected_significance())
    }

    /// History length a gate evaluates
    pub fn gate_lookback(&self, kind: MetricKind) -> usize {
        let own = match kind {
            MetricKind::Correlation => self.correlation.lookback,
            MetricKind::Cointegration => self.cointegration.lookback,
            MetricKind::Stationarity => self.stationarity.lookback,
            MetricKind::Hurst => self.hurst.lookback,
            MetricKind::HalfLife => self.half_life.lookback,
            MetricKind::Normality => self.normality.lookback,
        };
        own.unwrap_or(self.lookback)
    }

    /// Longest history any enabled gate needs
    pub fn max_lookback(&self) -> usize {
        self.enabled_gates()
            .into_iter()
            .map(|k| self.gate_lookback(k))
            .max()
            .unwrap_or(self.lookback)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.lookback < 2 {
            return Err(ParamsError::InvalidLookback("screening.lookback", self.lookback));
        }
        for kind in MetricKind::ALL {
            if self.gate_lookback(kind) < 2 {
                return Err(ParamsError::InvalidLookback(kind.label(), self.gate_lookback(kind)));
            }
        }
        if self.desired_pairs == 0 {
            return Err(ParamsError::NoPairsRequested);
        }
        if self.max_partition_size < 2 {
            return Err(ParamsError::InvalidPartitionSize(self.max_partition_size));
        }
        if !(self.significance_budget > 0.0 && self.significance_budget <= 1.0) {
            return Err(ParamsError::InvalidSignificance(self.significance_budget));
        }
        if !self.is_enabled(self.ranking_metric) {
            return Err(ParamsError::RankingByDisabledGate(self.ranking_metric));
        }
        if !(0.0..=1.0).contains(&self.correlation.min_abs) {
            return Err(ParamsError::InvalidCorrelation(self.correlation.min_abs));
        }
        for gate in [&self.cointegration, &self.stationarity, &self.normality] {
            if let Some(p) = gate.max_p_value {
                if !(p > 0.0 && p <= 1.0) {
                    return Err(ParamsError::InvalidSignificance(p));
                }
            }
        }
        if self.hurst.lower >= self.hurst.upper {
            return Err(ParamsError::EmptyBand("hurst", self.hurst.lower, self.hurst.upper));
        }
        if self.half_life.lower > self.half_life.upper || self.half_life.lower < 0.0 {
            return Err(ParamsError::EmptyBand(
                "half_life",
                self.half_life.lower,
                self.half_life.upper,
            ));
        }
        Ok(())
    }
}

/// Monitoring and position sizing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingParams {
    /// Window for the per-cycle hedge ratio regression
    pub hedge_lookback: usize,
    /// Trailing spread values in the z-score window
    pub z_window: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub leverage: f64,
    pub pair_weighting: PairWeighting,
    /// Stop evaluating pairs after the first transition in a cycle
    pub single_transition_per_cycle: bool,
}

impl Default for TradingParams {
    fn default() -> Self {
        Self {
            hedge_lookback: 20,
            z_window: 20,
            entry_threshold: 1.0,
            exit_threshold: 0.2,
            leverage: 1.0,
            pair_weighting: PairWeighting::Equal,
            single_transition_per_cycle: true,
        }
    }
}

impl TradingParams {
    pub fn with_thresholds(mut self, entry: f64, exit: f64) -> Self {
        self.entry_threshold = entry;
        self.exit_threshold = exit;
        self
    }

    pub fn with_z_window(mut self, window: usize) -> Self {
        self.z_window = window;
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.hedge_lookback < 2 {
            return Err(ParamsError::InvalidLookback("trading.hedge_lookback", self.hedge_lookback));
        }
        if self.z_window < 2 {
            return Err(ParamsError::InvalidLookback("trading.z_window", self.z_window));
        }
        if self.exit_threshold < 0.0 || self.entry_threshold <= self.exit_threshold {
            return Err(ParamsError::InvalidThresholds {
                entry: self.entry_threshold,
                exit: self.exit_threshold,
            });
        }
        if !(self.leverage > 0.0 && self.leverage.is_finite()) {
            return Err(ParamsError::InvalidLeverage(self.leverage));
        }
        Ok(())
    }
}

/// Allocation and cost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationParams {
    /// Maximum sum of absolute weights, as a fraction of portfolio value
    pub gross_exposure_cap: f64,
    pub commission_per_share: f64,
}

impl Default for AllocationParams {
    fn default() -> Self {
        Self {
            gross_exposure_cap: 1.0,
            commission_per_share: 0.0035,
        }
    }
}

impl AllocationParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.gross_exposure_cap > 0.0 && self.gross_exposure_cap.is_finite()) {
            return Err(ParamsError::InvalidExposureCap(self.gross_exposure_cap));
        }
        if !(self.commission_per_share >= 0.0 && self.commission_per_share.is_finite()) {
            return Err(ParamsError::InvalidCommission(self.commission_per_share));
        }
        Ok(())
    }
}

/// Everything a pair-trading session needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTradingParams {
    pub screening: ScreeningParams,
    pub trading: TradingParams,
    pub allocation: AllocationParams,
    /// Screening runs on every Nth screening trigger
    pub rebalance_interval: u32,
}

impl Default for PairTradingParams {
    fn default() -> Self {
        Self {
            screening: ScreeningParams::default(),
            trading: TradingParams::default(),
            allocation: AllocationParams::default(),
            rebalance_interval: 21,
        }
    }
}

impl PairTradingParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.screening.validate()?;
        self.trading.validate()?;
        self.allocation.validate()?;
        if self.rebalance_interval == 0 {
            return Err(ParamsError::InvalidRebalanceInterval);
        }
        Ok(())
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid lookback for {0}: {1} (minimum 2)")]
    InvalidLookback(&'static str, usize),
    #[error("desired_pairs must be at least 1")]
    NoPairsRequested,
    #[error("Invalid max partition size: {0} (minimum 2)")]
    InvalidPartitionSize(usize),
    #[error("Invalid significance level: {0} (must be 0 < p <= 1)")]
    InvalidSignificance(f64),
    #[error("Ranking metric {0} refers to a disabled gate")]
    RankingByDisabledGate(MetricKind),
    #[error("Invalid correlation threshold: {0} (must be 0-1)")]
    InvalidCorrelation(f64),
    #[error("Empty {0} band: [{1}, {2}]")]
    EmptyBand(&'static str, f64, f64),
    #[error("Entry threshold {entry} must exceed exit threshold {exit} (exit >= 0)")]
    InvalidThresholds { entry: f64, exit: f64 },
    #[error("Invalid leverage: {0}")]
    InvalidLeverage(f64),
    #[error("Invalid gross exposure cap: {0}")]
    InvalidExposureCap(f64),
    #[error("Invalid commission per share: {0}")]
    InvalidCommission(f64),
    #[error("rebalance_interval must be at least 1")]
    InvalidRebalanceInterval,
}
