//! Replay Orchestrator
//!
//! Drives a pair trading session over replayed prices.
//! Each period: advance the clock, re-mark the portfolio, fire the screening
//! and monitoring triggers, and submit any order request to execution.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::application::session::{PairTradingSession, SessionError};
use crate::domain::{Pair, PositionState, UniversePartition};
use crate::ports::{ExecutionError, ExecutionPort, PortfolioPort, PriceHistoryPort, ReplayClock};
use crate::strategy::PairTradingParams;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// What happened in one replayed period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    pub period: usize,
    pub screened: bool,
    pub transitions: usize,
    pub fills: usize,
    pub commission: f64,
}

/// Totals over a replay run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub periods: usize,
    pub screenings: usize,
    pub transitions: usize,
    pub orders: usize,
    pub fills: usize,
    pub errors: usize,
    pub total_commission: f64,
    pub final_value: f64,
}

impl ReplaySummary {
    fn record(&mut self, tick: &TickSummary) {
        self.periods += 1;
        self.screenings += usize::from(tick.screened);
        self.transitions += tick.transitions;
        self.orders += usize::from(tick.fills > 0 || tick.commission > 0.0);
        self.fills += tick.fills;
        self.total_commission += tick.commission;
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Periods replayed:  {}", self.periods)?;
        writeln!(f, "Screenings:        {}", self.screenings)?;
        writeln!(f, "Transitions:       {}", self.transitions)?;
        writeln!(f, "Orders / fills:    {} / {}", self.orders, self.fills)?;
        writeln!(f, "Tick errors:       {}", self.errors)?;
        writeln!(f, "Commission paid:   ${:.2}", self.total_commission)?;
        write!(f, "Final value:       ${:.2}", self.final_value)
    }
}

/// Status snapshot of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorStatus {
    pub is_running: bool,
    pub period: usize,
    pub positions: BTreeMap<Pair, PositionState>,
    pub portfolio_value: f64,
}

/// Replays prices through a session and an execution venue
pub struct ReplayOrchestrator<F, B> {
    session: Arc<RwLock<PairTradingSession>>,
    feed: Arc<F>,
    broker: Arc<B>,
    universe: UniversePartition,
    is_running: Arc<RwLock<bool>>,
    /// Latched by `stop`, never cleared; a stop sent before `run` starts still halts it
    stop_requested: Arc<RwLock<bool>>,
}

impl<F, B> ReplayOrchestrator<F, B>
where
    F: PriceHistoryPort + ReplayClock + 'static,
    B: ExecutionPort + PortfolioPort + 'static,
{
    pub fn new(
        params: PairTradingParams,
        feed: Arc<F>,
        broker: Arc<B>,
        universe: UniversePartition,
    ) -> Result<Self, OrchestratorError> {
        let session = PairTradingSession::new(params)?;
        Ok(Self::with_session(session, feed, broker, universe))
    }

    pub fn with_session(
        session: PairTradingSession,
        feed: Arc<F>,
        broker: Arc<B>,
        universe: UniversePartition,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            feed,
            broker,
            universe,
            is_running: Arc::new(RwLock::new(false)),
            stop_requested: Arc::new(RwLock::new(false)),
        }
    }

    /// First period with enough history for screening and hedging
    pub fn warmup_periods(params: &PairTradingParams) -> usize {
        params.screening.max_lookback().max(params.trading.hedge_lookback)
    }

    /// Replay every period from `start` to the end of the feed
    pub async fn run(&self, start: usize) -> Result<ReplaySummary, OrchestratorError> {
        *self.is_running.write().await = true;

        let end = self.feed.periods();
        tracing::info!("Starting replay over periods {}..={}", start, end);

        let mut summary = ReplaySummary::default();
        for period in start..=end {
            if *self.stop_requested.read().await {
                tracing::info!("Replay stopped at period {}", period);
                break;
            }
            match self.tick(period).await {
                Ok(tick) => summary.record(&tick),
                Err(e) => {
                    tracing::error!("Tick error at period {}: {}", period, e);
                    summary.periods += 1;
                    summary.errors += 1;
                }
            }
            // let a stop request in between periods
            tokio::task::yield_now().await;
        }

        *self.is_running.write().await = false;
        self.mark_portfolio();
        summary.final_value = self.broker.snapshot().value();
        tracing::info!("Replay finished: {} periods, value ${:.2}", summary.periods, summary.final_value);
        Ok(summary)
    }

    /// Execute one period
    pub async fn tick(&self, period: usize) -> Result<TickSummary, OrchestratorError> {
        self.feed.advance_to(period);
        self.mark_portfolio();
        let portfolio = self.broker.snapshot();

        let (report, outcome) = {
            let mut session = self.session.write().await;
            let report = session.on_screening_trigger(&self.universe, self.feed.as_ref(), &portfolio);
            let outcome = session.on_monitoring_trigger(self.feed.as_ref(), &portfolio);
            (report, outcome)
        };

        let mut tick = TickSummary {
            period,
            screened: report.is_some(),
            transitions: outcome.transitions.len(),
            ..Default::default()
        };
        if let Some(report) = report {
            tracing::info!(
                "Period {}: screened {} candidates, {} survivors, {} shortlisted",
                period,
                report.candidates,
                report.survivors,
                report.shortlist.len()
            );
        }

        if let Some(allocation) = outcome.allocation {
            let execution = self.broker.submit(allocation.request).await?;
            tracing::info!(
                "Period {}: {} fills, commission ${:.2}",
                period,
                execution.fills.len(),
                execution.total_commission
            );
            tick.fills = execution.fills.len();
            tick.commission = execution.total_commission;
        }

        Ok(tick)
    }

    fn mark_portfolio(&self) {
        let marks = self
            .broker
            .snapshot()
            .holdings
            .keys()
            .filter_map(|asset| {
                self.feed
                    .current_price(asset)
                    .ok()
                    .map(|price| (asset.clone(), price))
            })
            .collect();
        self.broker.update_marks(&marks);
    }

    /// Stop the replay loop
    pub async fn stop(&self) {
        *self.stop_requested.write().await = true;
        *self.is_running.write().await = false;
        tracing::info!("Stop signal sent to orchestrator");
    }

    /// Get current status snapshot
    pub async fn status(&self) -> OrchestratorStatus {
        let session = self.session.read().await;
        let positions = session
            .shortlist()
            .pairs()
            .into_iter()
            .filter_map(|pair| {
                let state = session.status(&pair)?.state;
                Some((pair, state))
            })
            .collect();

        OrchestratorStatus {
            is_running: *self.is_running.read().await,
            period: self.feed.now(),
            positions,
            portfolio_value: self.broker.snapshot().value(),
        }
    }
}

impl<F, B> Clone for ReplayOrchestrator<F, B> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            feed: Arc::clone(&self.feed),
            broker: Arc::clone(&self.broker),
            universe: self.universe.clone(),
            is_running: Arc::clone(&self.is_running),
            stop_requested: Arc::clone(&self.stop_requested),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::market_data::{ReplayPriceFeed, SyntheticUniverse};
    use crate::adapters::paper::PaperBroker;
    use crate::strategy::{PairStatistics, ScreeningParams, StatError, TradingParams};

    /// Accepts every candidate
    struct AcceptAll;

    impl PairStatistics for AcceptAll {
        fn correlation(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            Ok(0.99)
        }
        fn cointegration_p_value(&self, first: &[f64], _: &[f64]) -> Result<f64, StatError> {
            Ok(first[0] / 1e6)
        }
        fn hedge_ratio(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            Ok(1.0)
        }
        fn stationarity_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(0.001)
        }
        fn hurst_exponent(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(0.3)
        }
        fn half_life(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(12.0)
        }
        fn normality_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(0.01)
        }
    }

    type Orchestrator = ReplayOrchestrator<ReplayPriceFeed, PaperBroker<ReplayPriceFeed>>;

    fn params() -> PairTradingParams {
        PairTradingParams {
            screening: ScreeningParams::default().with_lookback(60).with_desired_pairs(2),
            trading: TradingParams::default(),
            rebalance_interval: 50,
            ..Default::default()
        }
    }

    fn create_test_orchestrator() -> Orchestrator {
        let file = SyntheticUniverse {
            sectors: 2,
            periods: 200,
            ..Default::default()
        }
        .generate();
        let universe = file.sectors.clone();
        let feed = Arc::new(ReplayPriceFeed::new(file));
        let broker = Arc::new(PaperBroker::new(Arc::clone(&feed), 100_000.0, 0.0035));
        let session = PairTradingSession::with_statistics(params(), Box::new(AcceptAll)).unwrap();
        ReplayOrchestrator::with_session(session, feed, broker, universe)
    }

    #[test]
    fn test_warmup_covers_longest_window() {
        let mut params = params();
        assert_eq!(Orchestrator::warmup_periods(&params), 60);
        params.trading.hedge_lookback = 90;
        assert_eq!(Orchestrator::warmup_periods(&params), 90);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let file = SyntheticUniverse::default().generate();
        let universe = file.sectors.clone();
        let feed = Arc::new(ReplayPriceFeed::new(file));
        let broker = Arc::new(PaperBroker::new(Arc::clone(&feed), 100_000.0, 0.0));
        let mut params = params();
        params.screening.desired_pairs = 0;
        assert!(matches!(
            Orchestrator::new(params, feed, broker, universe),
            Err(OrchestratorError::Session(_))
        ));
    }

    #[tokio::test]
    async fn test_first_tick_screens() {
        let orch = create_test_orchestrator();
        let tick = orch.tick(60).await.unwrap();
        assert!(tick.screened);
        assert_eq!(tick.transitions, 0);

        let status = orch.status().await;
        assert_eq!(status.period, 60);
        assert_eq!(status.positions.len(), 2);
        assert!(status.positions.values().all(|s| *s == PositionState::Flat));
        assert!(!orch.tick(61).await.unwrap().screened);
    }

    #[tokio::test]
    async fn test_replay_trades_and_pays_commission() {
        let orch = create_test_orchestrator();
        let summary = orch.run(60).await.unwrap();

        assert_eq!(summary.periods, 141);
        assert_eq!(summary.errors, 0);
        // periods 60, 110 and 160
        assert_eq!(summary.screenings, 3);
        assert!(summary.transitions > 0);
        assert!(summary.orders > 0);
        assert!(summary.total_commission > 0.0);
        assert!(summary.final_value > 0.0);
        assert!(!orch.status().await.is_running);
    }

    #[tokio::test]
    async fn test_stop_before_spawned_run_starts() {
        let orch = create_test_orchestrator();
        let runner = orch.clone();
        orch.stop().await;
        let handle = tokio::spawn(async move { runner.run(60).await });

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.periods, 0);
        assert_eq!(summary.screenings, 0);
        assert!(!orch.status().await.is_running);
    }

    #[tokio::test]
    async fn test_stop_halts_running_replay() {
        let orch = create_test_orchestrator();
        let runner = orch.clone();
        let handle = tokio::spawn(async move { runner.run(60).await });

        // the feed starts fully visible; wait for the replay to rewind it
        while orch.status().await.period == 200 && !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        orch.stop().await;
        let summary = handle.await.unwrap().unwrap();
        assert!(summary.periods >= 1);
        assert!(summary.periods < 141);
    }
}
