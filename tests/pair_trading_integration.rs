//! Pair Trading Integration Tests
//!
//! Integration tests that verify the components work together:
//! 1. Screening -> Shortlist -> PositionStateMachine leg weights
//! 2. Session monitoring -> PortfolioAllocator two-leg removal
//! 3. ReplayOrchestrator over a seeded cointegrated universe with paper execution
//!
//! All tests are deterministic and use in-memory or seeded data.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use approx::assert_relative_eq;
use butters_pairs::adapters::{PaperBroker, PriceFile, ReplayPriceFeed};
use butters_pairs::application::{PairTradingSession, ReplayOrchestrator};
use butters_pairs::domain::{Asset, Pair, PairStatus, PortfolioSnapshot, PositionState, TargetWeights, UniversePartition};
use butters_pairs::ports::mocks::MockPriceHistory;
use butters_pairs::ports::ReplayClock;
use butters_pairs::strategy::{
    AllocationParams, DropReason, PairStatistics, PairTradingParams, PortfolioAllocator,
    PositionStateMachine, ScreeningParams, StatError, TradingParams, Transition,
};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Statistics that report the same values for every candidate
struct CannedStatistics;

impl PairStatistics for CannedStatistics {
    fn correlation(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
        Ok(0.97)
    }
    fn cointegration_p_value(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
        Ok(0.001)
    }
    fn hedge_ratio(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
        Ok(0.8)
    }
    fn stationarity_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
        Ok(0.02)
    }
    fn hurst_exponent(&self, _: &[f64]) -> Result<f64, StatError> {
        Ok(0.3)
    }
    fn half_life(&self, _: &[f64]) -> Result<f64, StatError> {
        Ok(12.0)
    }
    fn normality_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
        Ok(0.03)
    }
}

fn asset(symbol: &str) -> Asset {
    Asset::from(symbol)
}

fn pair(a: &str, b: &str) -> Pair {
    Pair::new(asset(a), asset(b)).unwrap()
}

fn sector_universe() -> UniversePartition {
    let mut universe = UniversePartition::new();
    universe.insert("beverages", vec![asset("KO"), asset("PEP")]);
    universe.insert("energy", vec![asset("XOM"), asset("CVX")]);
    universe
}

fn scenario_params() -> PairTradingParams {
    PairTradingParams {
        screening: ScreeningParams::default().with_lookback(30).with_desired_pairs(2),
        trading: TradingParams {
            leverage: 2.0,
            ..TradingParams::default().with_z_window(3)
        },
        rebalance_interval: 1,
        ..Default::default()
    }
}

/// KO tracks PEP one-for-one with a 40 offset, plus `ko_tail` bumps
fn beverage_prices(ko_tail: &[f64]) -> MockPriceHistory {
    let pep: Vec<f64> = (0..30 + ko_tail.len())
        .map(|i| 100.0 + 10.0 * (i as f64 * 0.7).sin())
        .collect();
    let mut ko: Vec<f64> = (0..30)
        .map(|i| pep[i] - 40.0 + if i % 2 == 1 { 0.1 } else { 0.0 })
        .collect();
    for (i, bump) in ko_tail.iter().enumerate() {
        ko.push(pep[30 + i] - 40.0 + bump);
    }
    MockPriceHistory::new().with_series("KO", ko).with_series("PEP", pep)
}

fn scenario_prices() -> MockPriceHistory {
    let mut prices = beverage_prices(&[]);
    for i in 0..30 {
        prices.push("XOM", 110.0 + (i as f64 * 0.4).cos());
        prices.push("CVX", 150.0 + (i as f64 * 0.4).cos());
    }
    prices
}

/// 64-bit LCG so the cointegrated fixture is identical on every platform
struct Lcg(u64);

impl Lcg {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 + 0.5) / (1u64 << 53) as f64
    }

    fn normal(&mut self) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// 900 periods of one "cointegrated" sector: HEDGED = 1.4 * BASE + 12 + spread,
/// where the spread is AR(1) with a 12-period half-life and skewed innovations.
/// DRIFT is an unrelated random walk.
///
/// Over the first 730 periods HEDGED/BASE clears every default gate
/// (|corr| 0.99, coint p < 0.001, half-life about 12, Hurst about 0.15, non-normal spread).
fn cointegrated_sector() -> PriceFile {
    let mut rng = Lcg(5);
    let phi = (-std::f64::consts::LN_2 / 12.0).exp();
    let (mut base, mut drift, mut spread) = (100.0, 80.0, 0.0);
    let (mut hedged_px, mut base_px, mut drift_px) = (Vec::new(), Vec::new(), Vec::new());
    for _ in 0..900 {
        base += rng.normal();
        drift += rng.normal();
        let shock = -rng.uniform().ln() - 1.0;
        spread = phi * spread + 0.5 * shock;
        base_px.push(base);
        drift_px.push(drift);
        hedged_px.push(1.4 * base + 12.0 + spread);
    }

    let mut sectors = UniversePartition::new();
    sectors.insert("cointegrated", vec![asset("HEDGED"), asset("BASE"), asset("DRIFT")]);
    let mut prices = BTreeMap::new();
    prices.insert(asset("HEDGED"), hedged_px);
    prices.insert(asset("BASE"), base_px);
    prices.insert(asset("DRIFT"), drift_px);
    PriceFile {
        sectors,
        prices,
        untradeable: BTreeSet::new(),
    }
}

fn is_hedged_base(pair: &Pair) -> bool {
    let legs: BTreeSet<&str> = [pair.first.symbol(), pair.second.symbol()].into_iter().collect();
    legs == ["BASE", "HEDGED"].into_iter().collect()
}

// ============================================================================
// Screening -> Trading Scenario
// ============================================================================

#[test]
fn test_canned_pair_is_shortlisted_and_shorted() {
    let params = scenario_params();
    let mut session = PairTradingSession::with_statistics(params.clone(), Box::new(CannedStatistics)).unwrap();
    let report = session
        .on_screening_trigger(&sector_universe(), &scenario_prices(), &PortfolioSnapshot::new(100_000.0))
        .unwrap();

    // Identical metrics: generation order decides, first ordering wins
    assert_eq!(report.shortlist.pairs(), vec![pair("KO", "PEP"), pair("XOM", "CVX")]);
    let metrics = &report.shortlist.entries()[0].metrics;
    assert_eq!(metrics.correlation, Some(0.97));
    assert_eq!(metrics.cointegration_p, Some(0.001));
    assert_eq!(metrics.half_life, Some(12.0));

    // z = 1.3 above the 1.0 entry threshold opens a short spread
    let machine = PositionStateMachine::new(&params.trading);
    let mut status = PairStatus::default();
    let transition = machine.decide(&status, 1.3).unwrap();
    assert_eq!(transition, Transition::EnterShort);

    let share = session.pair_share(&pair("KO", "PEP")).unwrap();
    assert_relative_eq!(share, 0.5);
    let legs = machine.target_weights(transition, 0.8, (60.0, 100.0), share);
    assert!(legs.first < 0.0);
    assert!(legs.second > 0.0);
    // leverage / numPairs
    assert_relative_eq!(legs.first.abs() + legs.second.abs(), 1.0, epsilon = 1e-12);

    machine.apply(&mut status, transition, 0.8);
    assert_eq!(status.state, PositionState::Short);
    assert_eq!(status.hedge_ratio, Some(0.8));
}

#[test]
fn test_screening_is_idempotent() {
    let file = cointegrated_sector();
    let universe = file.sectors.clone();
    let feed = ReplayPriceFeed::new(file);
    feed.advance_to(730);
    let params = PairTradingParams::default();
    let portfolio = PortfolioSnapshot::new(100_000.0);

    let mut first = PairTradingSession::new(params.clone()).unwrap();
    let mut second = PairTradingSession::new(params).unwrap();
    let a = first.on_screening_trigger(&universe, &feed, &portfolio).unwrap();
    let b = second.on_screening_trigger(&universe, &feed, &portfolio).unwrap();
    assert_eq!(a, b);

    // DRIFT is uncorrelated, dedup keeps one ordering of HEDGED/BASE
    assert_eq!(a.shortlist.len(), 1);
    assert!(is_hedged_base(&a.shortlist.pairs()[0]));
    let metrics = &a.shortlist.entries()[0].metrics;
    let half_life = metrics.half_life.unwrap();
    assert!((10.0..=16.0).contains(&half_life));
}

#[test]
fn test_shortlist_never_repeats_an_asset() {
    let mut universe = UniversePartition::new();
    universe.insert("all", ["A", "B", "C", "D", "E", "F"].iter().map(|s| asset(s)).collect());
    let mut prices = MockPriceHistory::new();
    for symbol in ["A", "B", "C", "D", "E", "F"] {
        for i in 0..30 {
            prices.push(symbol, 50.0 + i as f64);
        }
    }
    let params = PairTradingParams {
        screening: ScreeningParams::default().with_lookback(30).with_desired_pairs(10),
        ..Default::default()
    };
    let mut session = PairTradingSession::with_statistics(params, Box::new(CannedStatistics)).unwrap();
    let report = session
        .on_screening_trigger(&universe, &prices, &PortfolioSnapshot::new(1.0))
        .unwrap();

    // 30 ordered candidates survive, dedup leaves 3 disjoint pairs
    assert_eq!(report.survivors, 30);
    assert_eq!(report.shortlist.len(), 3);
    let assets: Vec<Asset> = report
        .shortlist
        .pairs()
        .iter()
        .flat_map(|p| [p.first.clone(), p.second.clone()])
        .collect();
    let distinct: BTreeSet<&Asset> = assets.iter().collect();
    assert_eq!(distinct.len(), assets.len());
}

// ============================================================================
// Allocation Invariants
// ============================================================================

#[test]
fn test_allocation_respects_cap_and_finiteness() {
    let prices = MockPriceHistory::new()
        .with_series("KO", vec![60.0])
        .with_series("PEP", vec![100.0])
        .with_series("XOM", vec![110.0])
        .with_series("CVX", vec![150.0]);
    let mut weights = TargetWeights::new();
    weights.set(asset("KO"), -0.9);
    weights.set(asset("PEP"), 0.9);
    weights.set(asset("XOM"), f64::NAN);
    weights.set(asset("CVX"), -0.4);
    let mut pool: BTreeSet<Asset> = ["KO", "PEP", "XOM", "CVX"].iter().map(|s| asset(s)).collect();

    let allocator = PortfolioAllocator::new(&AllocationParams {
        gross_exposure_cap: 1.5,
        ..Default::default()
    });
    let outcome = allocator.allocate(
        weights,
        &[pair("KO", "PEP"), pair("XOM", "CVX")],
        &mut pool,
        &prices,
        &PortfolioSnapshot::new(10_000.0),
    );

    let objective = &outcome.request.objective;
    assert!(objective.iter().all(|(_, w)| w.is_finite()));
    assert!(objective.gross_exposure() <= 1.5 + 1e-12);
    assert_relative_eq!(outcome.scale, 1.5 / 1.8, epsilon = 1e-12);
    assert_eq!(outcome.removed_pairs, vec![pair("XOM", "CVX")]);
    assert!(outcome.request.check_constraints().is_ok());
    assert_eq!(pool.len(), 2);
}

#[test]
fn test_untradeable_leg_removes_pair_from_session() {
    let params = PairTradingParams {
        screening: ScreeningParams::default().with_lookback(30),
        trading: TradingParams::default().with_z_window(3),
        ..Default::default()
    };
    let mut session = PairTradingSession::with_statistics(params, Box::new(CannedStatistics)).unwrap();
    let universe = UniversePartition::flat(vec![asset("KO"), asset("PEP")]);
    let portfolio = PortfolioSnapshot::new(100_000.0);
    session.on_screening_trigger(&universe, &beverage_prices(&[]), &portfolio);
    assert_eq!(session.shortlist().pairs(), vec![pair("KO", "PEP")]);

    let tails: [&[f64]; 4] = [&[0.0], &[0.0, 0.1], &[0.0, 0.1, 0.0], &[0.0, 0.1, 0.0, 0.1]];
    for tail in tails {
        let outcome = session.on_monitoring_trigger(&beverage_prices(tail), &portfolio);
        assert!(outcome.transitions.is_empty());
    }

    // KO jumps and is halted on the same period
    let halted = beverage_prices(&[0.0, 0.1, 0.0, 0.1, 3.0]).with_untradeable("KO");
    let outcome = session.on_monitoring_trigger(&halted, &portfolio);
    assert_eq!(outcome.transitions, vec![(pair("KO", "PEP"), Transition::EnterShort)]);

    let allocation = outcome.allocation.unwrap();
    assert_eq!(
        allocation.dropped,
        vec![(asset("KO"), DropReason::Untradeable), (asset("PEP"), DropReason::PartnerDropped)]
    );
    assert!(allocation.request.objective.is_empty());
    assert!(session.shortlist().is_empty());
    assert!(session.pool().is_empty());
    assert!(session.status(&pair("KO", "PEP")).is_none());
}

// ============================================================================
// Replay
// ============================================================================

#[tokio::test]
async fn test_replay_trades_cointegrated_pair() {
    let file = cointegrated_sector();
    let universe = file.sectors.clone();
    let feed = Arc::new(ReplayPriceFeed::new(file));
    let broker = Arc::new(PaperBroker::new(Arc::clone(&feed), 100_000.0, 0.0035));
    // one screening at the first period, none after
    let params = PairTradingParams {
        rebalance_interval: 200,
        ..Default::default()
    };

    let start = ReplayOrchestrator::<ReplayPriceFeed, PaperBroker<ReplayPriceFeed>>::warmup_periods(&params);
    assert_eq!(start, 730);
    let orchestrator = ReplayOrchestrator::new(params, feed, broker, universe).unwrap();
    let summary = orchestrator.run(start).await.unwrap();

    assert_eq!(summary.periods, 171);
    assert_eq!(summary.screenings, 1);
    assert_eq!(summary.errors, 0);
    assert!(summary.transitions > 0);
    assert!(summary.total_commission > 0.0);
    assert!(summary.final_value > 0.0);
}
