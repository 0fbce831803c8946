//! Pair Trading Session
//!
//! Owns all screening and monitoring state between scheduler invocations:
//! the shortlist and its metrics, per-pair status, spread histories, target
//! weights and the working universe pool.
//!
//! Two entry points, never called concurrently:
//! - `on_screening_trigger`: throttled to every `rebalance_interval` triggers,
//!   rebuilds the shortlist and wipes per-pair state
//! - `on_monitoring_trigger`: appends spreads, drives the state machine and
//!   produces a sanitized order request on any transition

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Asset, Pair, PairStatus, PortfolioSnapshot, TargetWeights, UniversePartition};
use crate::ports::PriceHistoryPort;
use crate::strategy::{
    AllocationOutcome, ClassicalStatistics, PairScreener, PairStatistics, PairTradingParams,
    PairWeighting, ParamsError, PortfolioAllocator, PositionStateMachine, ScreeningReport, Shortlist,
    SpreadTracker, TrackError, Transition,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

/// What one monitoring cycle did
#[derive(Debug, Clone, Default)]
pub struct MonitoringOutcome {
    pub transitions: Vec<(Pair, Transition)>,
    /// Pairs whose update was aborted this cycle
    pub skipped: Vec<(Pair, TrackError)>,
    /// Present when a transition produced new target weights
    pub allocation: Option<AllocationOutcome>,
}

pub struct PairTradingSession {
    params: PairTradingParams,
    statistics: Box<dyn PairStatistics>,
    trigger_count: u64,
    shortlist: Shortlist,
    statuses: BTreeMap<Pair, PairStatus>,
    pair_shares: BTreeMap<Pair, f64>,
    tracker: SpreadTracker,
    machine: PositionStateMachine,
    allocator: PortfolioAllocator,
    weights: TargetWeights,
    pool: BTreeSet<Asset>,
}

impl PairTradingSession {
    /// Session using the classical statistical tests
    pub fn new(params: PairTradingParams) -> Result<Self, SessionError> {
        Self::with_statistics(params, Box::new(ClassicalStatistics))
    }

    pub fn with_statistics(
        params: PairTradingParams,
        statistics: Box<dyn PairStatistics>,
    ) -> Result<Self, SessionError> {
        params.validate()?;
        Ok(Self {
            tracker: SpreadTracker::new(&params.trading),
            machine: PositionStateMachine::new(&params.trading),
            allocator: PortfolioAllocator::new(&params.allocation),
            params,
            statistics,
            trigger_count: 0,
            shortlist: Shortlist::default(),
            statuses: BTreeMap::new(),
            pair_shares: BTreeMap::new(),
            weights: TargetWeights::new(),
            pool: BTreeSet::new(),
        })
    }

    pub fn params(&self) -> &PairTradingParams {
        &self.params
    }

    pub fn shortlist(&self) -> &Shortlist {
        &self.shortlist
    }

    pub fn status(&self, pair: &Pair) -> Option<&PairStatus> {
        self.statuses.get(pair)
    }

    pub fn weights(&self) -> &TargetWeights {
        &self.weights
    }

    pub fn pool(&self) -> &BTreeSet<Asset> {
        &self.pool
    }

    pub fn tracker(&self) -> &SpreadTracker {
        &self.tracker
    }

    /// Capital share of a shortlisted pair
    pub fn pair_share(&self, pair: &Pair) -> Option<f64> {
        self.pair_shares.get(pair).copied()
    }

    /// Screening entry point.
    ///
    /// Returns `None` when this trigger falls outside the rebalance cadence.
    pub fn on_screening_trigger(
        &mut self,
        universe: &UniversePartition,
        prices: &dyn PriceHistoryPort,
        portfolio: &PortfolioSnapshot,
    ) -> Option<ScreeningReport> {
        let due = self.trigger_count % u64::from(self.params.rebalance_interval) == 0;
        self.trigger_count += 1;
        if !due {
            debug!("Screening trigger {} skipped", self.trigger_count);
            return None;
        }

        let screener = PairScreener::new(&self.params.screening, self.statistics.as_ref());
        let mut report = screener.screen(universe, prices);
        report.shortlist.estimate_commissions(
            prices,
            portfolio.value(),
            self.params.allocation.commission_per_share,
            self.params.screening.desired_pairs,
        );

        self.shortlist = report.shortlist.clone();
        self.statuses = self
            .shortlist
            .entries()
            .iter()
            .map(|e| (e.pair.clone(), PairStatus::default()))
            .collect();
        self.pair_shares = self.compute_pair_shares();
        self.tracker.reset(self.statuses.keys());

        let assets = universe.assets();
        self.weights = TargetWeights::zeroed(assets.iter());
        self.pool = assets;

        for entry in self.shortlist.entries() {
            info!("Selected {} ({:?})", entry.pair, entry.metrics);
        }
        Some(report)
    }

    fn compute_pair_shares(&self) -> BTreeMap<Pair, f64> {
        let entries = self.shortlist.entries();
        let equal = 1.0 / entries.len().max(1) as f64;
        let correlations: Option<Vec<f64>> = match self.params.trading.pair_weighting {
            PairWeighting::Equal => None,
            PairWeighting::Correlation => entries
                .iter()
                .map(|e| e.metrics.correlation.map(f64::abs))
                .collect(),
        };
        let total: f64 = correlations.iter().flatten().sum();

        entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let share = match &correlations {
                    Some(c) if total > 0.0 => c[i] / total,
                    _ => equal,
                };
                (e.pair.clone(), share)
            })
            .collect()
    }

    /// Monitoring entry point
    pub fn on_monitoring_trigger(
        &mut self,
        prices: &dyn PriceHistoryPort,
        portfolio: &PortfolioSnapshot,
    ) -> MonitoringOutcome {
        let mut outcome = MonitoringOutcome::default();

        for pair in self.shortlist.pairs() {
            let observation = match self.tracker.observe(&pair, prices) {
                Ok(observation) => observation,
                Err(e) => {
                    warn!("Skipping {} this cycle: {}", pair, e);
                    outcome.skipped.push((pair, e));
                    continue;
                }
            };
            let Some(z) = observation.z else {
                continue;
            };
            let Some(status) = self.statuses.get_mut(&pair) else {
                continue;
            };
            let Some(transition) = self.machine.decide(status, z.z_score) else {
                continue;
            };

            let share = self.pair_shares.get(&pair).copied().unwrap_or(0.0);
            let legs = self.machine.target_weights(transition, observation.hedge_ratio, observation.prices, share);
            self.weights.set(pair.first.clone(), legs.first);
            self.weights.set(pair.second.clone(), legs.second);
            self.machine.apply(status, transition, observation.hedge_ratio);

            info!(
                "{}: {:?} at z={:.3} (hedge {:.4}, weights {:.4} / {:.4})",
                pair, transition, z.z_score, observation.hedge_ratio, legs.first, legs.second
            );
            outcome.transitions.push((pair, transition));

            if self.params.trading.single_transition_per_cycle {
                break;
            }
        }

        if !outcome.transitions.is_empty() {
            let allocation = self.allocator.allocate(
                self.weights.clone(),
                &self.shortlist.pairs(),
                &mut self.pool,
                prices,
                portfolio,
            );
            for (asset, _) in &allocation.dropped {
                self.weights.remove(asset);
            }
            for pair in &allocation.removed_pairs {
                warn!("Removing {} from the shortlist", pair);
                self.shortlist.remove(pair);
                self.statuses.remove(pair);
                self.tracker.remove(pair);
            }
            outcome.allocation = Some(allocation);
        }

        outcome
    }
}
