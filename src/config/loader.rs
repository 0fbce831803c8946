//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/default.toml.
//! Every key is optional; missing keys take the defaults below.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::domain::MetricKind;
use crate::strategy::params::{
    AllocationParams, CorrelationGateParams, PValueGateParams, PairTradingParams, PairWeighting,
    RangeGateParams, ScreeningParams, TradingParams,
};

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub screening: ScreeningSection,
    #[serde(default)]
    pub trading: TradingSection,
    #[serde(default)]
    pub portfolio: PortfolioSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Pair screening section
#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningSection {
    /// Price history length for screening (in periods)
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// Number of pairs to trade
    #[serde(default = "default_desired_pairs")]
    pub desired_pairs: usize,
    /// Metric used to rank surviving pairs
    #[serde(default = "default_ranking_metric")]
    pub ranking_metric: MetricKind,
    /// Family-wise significance budget split across enabled gates
    #[serde(default = "default_significance_budget")]
    pub significance_budget: f64,
    /// Compare assets across sectors
    #[serde(default)]
    pub cross_partition: bool,
    /// Assets considered per sector
    #[serde(default = "default_max_partition_size")]
    pub max_partition_size: usize,
    #[serde(default)]
    pub correlation: CorrelationSection,
    #[serde(default)]
    pub cointegration: PValueSection,
    #[serde(default)]
    pub stationarity: PValueSection,
    #[serde(default)]
    pub hurst: HurstSection,
    #[serde(default)]
    pub half_life: HalfLifeSection,
    #[serde(default)]
    pub normality: PValueSection,
}

fn default_lookback() -> usize {
    730
}

fn default_desired_pairs() -> usize {
    4
}

fn default_ranking_metric() -> MetricKind {
    MetricKind::Cointegration
}

fn default_significance_budget() -> f64 {
    0.20
}

fn default_max_partition_size() -> usize {
    500
}

fn default_true() -> bool {
    true
}

impl Default for ScreeningSection {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            desired_pairs: default_desired_pairs(),
            ranking_metric: default_ranking_metric(),
            significance_budget: default_significance_budget(),
            cross_partition: false,
            max_partition_size: default_max_partition_size(),
            correlation: CorrelationSection::default(),
            cointegration: PValueSection::default(),
            stationarity: PValueSection::default(),
            hurst: HurstSection::default(),
            half_life: HalfLifeSection::default(),
            normality: PValueSection::default(),
        }
    }
}

/// Correlation gate
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum |correlation|
    #[serde(default = "default_min_abs_correlation")]
    pub min_abs: f64,
    #[serde(default)]
    pub lookback: Option<usize>,
}

fn default_min_abs_correlation() -> f64 {
    0.95
}

impl Default for CorrelationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            min_abs: default_min_abs_correlation(),
            lookback: None,
        }
    }
}

/// Cointegration, stationarity and normality gates
#[derive(Debug, Clone, Deserialize)]
pub struct PValueSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the corrected significance level
    #[serde(default)]
    pub max_p_value: Option<f64>,
    #[serde(default)]
    pub lookback: Option<usize>,
}

impl Default for PValueSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_p_value: None,
            lookback: None,
        }
    }
}

/// Hurst exponent gate, open interval (lower, upper)
#[derive(Debug, Clone, Deserialize)]
pub struct HurstSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub lower: f64,
    #[serde(default = "default_hurst_upper")]
    pub upper: f64,
    #[serde(default)]
    pub lookback: Option<usize>,
}

fn default_hurst_upper() -> f64 {
    0.5
}

impl Default for HurstSection {
    fn default() -> Self {
        Self {
            enabled: true,
            lower: 0.0,
            upper: default_hurst_upper(),
            lookback: None,
        }
    }
}

/// Half-life gate, closed interval [min, max] in periods
#[derive(Debug, Clone, Deserialize)]
pub struct HalfLifeSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_half_life_min")]
    pub min: f64,
    #[serde(default = "default_half_life_max")]
    pub max: f64,
    #[serde(default)]
    pub lookback: Option<usize>,
}

fn default_half_life_min() -> f64 {
    10.0
}

fn default_half_life_max() -> f64 {
    16.0
}

impl Default for HalfLifeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            min: default_half_life_min(),
            max: default_half_life_max(),
            lookback: None,
        }
    }
}

/// Monitoring and sizing section
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSection {
    /// Periods in the per-cycle hedge regression
    #[serde(default = "default_window")]
    pub hedge_lookback: usize,
    /// Spread values in the z-score window
    #[serde(default = "default_window")]
    pub z_window: usize,
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,
    #[serde(default = "default_exit_threshold")]
    pub exit_threshold: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    /// "equal" or "correlation"
    #[serde(default)]
    pub pair_weighting: PairWeighting,
    /// At most one pair changes position per monitoring cycle
    #[serde(default = "default_true")]
    pub single_transition_per_cycle: bool,
}

fn default_window() -> usize {
    20
}

fn default_entry_threshold() -> f64 {
    1.0
}

fn default_exit_threshold() -> f64 {
    0.2
}

fn default_leverage() -> f64 {
    1.0
}

impl Default for TradingSection {
    fn default() -> Self {
        Self {
            hedge_lookback: default_window(),
            z_window: default_window(),
            entry_threshold: default_entry_threshold(),
            exit_threshold: default_exit_threshold(),
            leverage: default_leverage(),
            pair_weighting: PairWeighting::Equal,
            single_transition_per_cycle: true,
        }
    }
}

/// Portfolio section
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioSection {
    /// Maximum gross exposure as a fraction of portfolio value
    #[serde(default = "default_gross_exposure_cap")]
    pub gross_exposure_cap: f64,
    /// Flat commission per share traded
    #[serde(default = "default_commission_per_share")]
    pub commission_per_share: f64,
    /// Starting cash for paper trading
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
}

fn default_gross_exposure_cap() -> f64 {
    1.0
}

fn default_commission_per_share() -> f64 {
    0.0035
}

fn default_initial_cash() -> f64 {
    100_000.0
}

impl Default for PortfolioSection {
    fn default() -> Self {
        Self {
            gross_exposure_cap: default_gross_exposure_cap(),
            commission_per_share: default_commission_per_share(),
            initial_cash: default_initial_cash(),
        }
    }
}

/// Scheduling section
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    /// Screening runs on every Nth screening trigger
    #[serde(default = "default_rebalance_interval")]
    pub rebalance_interval: u32,
}

fn default_rebalance_interval() -> u32 {
    21
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            rebalance_interval: default_rebalance_interval(),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        PairTradingParams::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if !(self.portfolio.initial_cash > 0.0 && self.portfolio.initial_cash.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "initial_cash must be > 0, got {}",
                self.portfolio.initial_cash
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

fn p_value_gate(section: &PValueSection) -> PValueGateParams {
    PValueGateParams {
        enabled: section.enabled,
        max_p_value: section.max_p_value,
        lookback: section.lookback,
    }
}

// Conversion from Config to PairTradingParams
impl From<&Config> for PairTradingParams {
    fn from(config: &Config) -> Self {
        let s = &config.screening;
        let t = &config.trading;
        PairTradingParams {
            screening: ScreeningParams {
                lookback: s.lookback,
                desired_pairs: s.desired_pairs,
                ranking_metric: s.ranking_metric,
                significance_budget: s.significance_budget,
                cross_partition: s.cross_partition,
                max_partition_size: s.max_partition_size,
                correlation: CorrelationGateParams {
                    enabled: s.correlation.enabled,
                    min_abs: s.correlation.min_abs,
                    lookback: s.correlation.lookback,
                },
                cointegration: p_value_gate(&s.cointegration),
                stationarity: p_value_gate(&s.stationarity),
                hurst: RangeGateParams {
                    enabled: s.hurst.enabled,
                    lower: s.hurst.lower,
                    upper: s.hurst.upper,
                    lookback: s.hurst.lookback,
                },
                half_life: RangeGateParams {
                    enabled: s.half_life.enabled,
                    lower: s.half_life.min,
                    upper: s.half_life.max,
                    lookback: s.half_life.lookback,
                },
                normality: p_value_gate(&s.normality),
            },
            trading: TradingParams {
                hedge_lookback: t.hedge_lookback,
                z_window: t.z_window,
                entry_threshold: t.entry_threshold,
                exit_threshold: t.exit_threshold,
                leverage: t.leverage,
                pair_weighting: t.pair_weighting,
                single_transition_per_cycle: t.single_transition_per_cycle,
            },
            allocation: AllocationParams {
                gross_exposure_cap: config.portfolio.gross_exposure_cap,
                commission_per_share: config.portfolio.commission_per_share,
            },
            rebalance_interval: config.schedule.rebalance_interval,
        }
    }
}
