//! Strategy Layer - Statistical Pair Selection and Spread Trading
//!
//! - `stats`: correlation, cointegration, stationarity, half-life, Hurst, normality
//! - `hedge`: OLS hedge ratio and spread
//! - `gates` / `screener`: gated candidate screening, ranking and dedup
//! - `spread_tracker`: per-pair spread history and rolling z-score
//! - `position_machine`: flat / long / short transitions and leg weights
//! - `allocator`: tradability sanitization and the gross-exposure cap

pub mod params;
pub mod stats;
pub mod hedge;
pub mod gates;
pub mod screener;
pub mod spread_tracker;
pub mod position_machine;
pub mod allocator;

pub use params::{
    AllocationParams, PairTradingParams, PairWeighting, ParamsError, ScreeningParams, TradingParams,
};
pub use stats::StatError;
pub use hedge::{compute_spread, estimate_hedge_ratio};
pub use gates::{ClassicalStatistics, Gate, GateOutcome, PairStatistics};
pub use screener::{GateTally, PairScreener, ScreeningReport, Shortlist, ShortlistEntry};
pub use spread_tracker::{SpreadHistory, SpreadObservation, SpreadTracker, TrackError, ZScoreResult};
pub use position_machine::{holdings_pct, LegWeights, PositionStateMachine, Transition};
pub use allocator::{AllocationOutcome, DropReason, PortfolioAllocator};
