//! Spread Tracker
//!
//! Keeps each shortlisted pair's spread history, one value per monitoring
//! cycle, and scores the latest value against a trailing window.
//!
//! Z-Score Formula: z = (latest_spread - window_mean) / window_std
//!
//! The window includes the latest value and uses the population standard
//! deviation. No score is produced until the history holds more than
//! `z_window` values.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::Pair;
use crate::ports::{MarketDataError, PriceHistoryPort};
use crate::strategy::hedge::estimate_hedge_ratio;
use crate::strategy::params::TradingParams;
use crate::strategy::stats::{mean, population_std, tail, StatError};

/// Result of z-score calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    pub z_score: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Latest spread value
    pub spread: f64,
}

impl ZScoreResult {
    /// Spread unusually low
    pub fn is_below(&self, threshold: f64) -> bool {
        self.z_score < -threshold
    }

    /// Spread unusually high
    pub fn is_above(&self, threshold: f64) -> bool {
        self.z_score > threshold
    }
}

/// Append-only spread values for one pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadHistory {
    values: Vec<f64>,
}

impl SpreadHistory {
    pub fn push(&mut self, spread: f64) {
        self.values.push(spread);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Score the latest value against the trailing `window` values
    pub fn z_score(&self, window: usize) -> Option<ZScoreResult> {
        if window == 0 || self.values.len() <= window {
            return None;
        }
        let recent = tail(&self.values, window);
        let mean = mean(recent);
        let std_dev = population_std(recent);

        // Avoid division by zero
        if std_dev < 1e-10 {
            return None;
        }

        let spread = *recent.last()?;
        Some(ZScoreResult {
            z_score: (spread - mean) / std_dev,
            mean,
            std_dev,
            spread,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackError {
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
    #[error("Hedge estimation failed: {0}")]
    Hedge(#[from] StatError),
}

/// One monitoring-cycle update for a pair
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadObservation {
    pub hedge_ratio: f64,
    pub spread: f64,
    /// Latest prices of the first and second leg
    pub prices: (f64, f64),
    pub z: Option<ZScoreResult>,
}

/// Spread histories for the current shortlist
#[derive(Debug, Clone)]
pub struct SpreadTracker {
    hedge_lookback: usize,
    z_window: usize,
    histories: BTreeMap<Pair, SpreadHistory>,
}

impl SpreadTracker {
    pub fn new(params: &TradingParams) -> Self {
        Self {
            hedge_lookback: params.hedge_lookback,
            z_window: params.z_window,
            histories: BTreeMap::new(),
        }
    }

    /// Start fresh histories for a new shortlist
    pub fn reset<'a>(&mut self, pairs: impl IntoIterator<Item = &'a Pair>) {
        self.histories = pairs
            .into_iter()
            .map(|p| (p.clone(), SpreadHistory::default()))
            .collect();
    }

    /// Stop tracking a pair
    pub fn remove(&mut self, pair: &Pair) {
        self.histories.remove(pair);
    }

    pub fn history(&self, pair: &Pair) -> Option<&SpreadHistory> {
        self.histories.get(pair)
    }

    /// Append a spread value and score it
    pub fn record(&mut self, pair: &Pair, spread: f64) -> Option<ZScoreResult> {
        let history = self.histories.entry(pair.clone()).or_default();
        history.push(spread);
        history.z_score(self.z_window)
    }

    /// Re-estimate the hedge ratio on recent prices, append the latest
    /// spread and score it.
    ///
    /// Nothing is appended when prices are unavailable or the regression is
    /// singular.
    pub fn observe(
        &mut self,
        pair: &Pair,
        prices: &dyn PriceHistoryPort,
    ) -> Result<SpreadObservation, TrackError> {
        let legs = [pair.first.clone(), pair.second.clone()];
        let mut series = prices.aligned_history(&legs, self.hedge_lookback)?.into_iter();
        let (first, second) = match (series.next(), series.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => return Err(MarketDataError::NoPrice(pair.to_string()).into()),
        };

        let hedge_ratio = estimate_hedge_ratio(&first, &second)?;
        let (p1, p2) = match (first.last(), second.last()) {
            (Some(p1), Some(p2)) => (*p1, *p2),
            _ => return Err(MarketDataError::NoPrice(pair.to_string()).into()),
        };
        let spread = p1 - hedge_ratio * p2;
        let z = self.record(pair, spread);

        Ok(SpreadObservation {
            hedge_ratio,
            spread,
            prices: (p1, p2),
            z,
        })
    }
}
