use thiserror::Error;

use crate::domain::Asset;

/// Market data error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Not enough history for {asset}: requested {requested}, available {available}")]
    NotEnoughHistory {
        asset: String,
        requested: usize,
        available: usize,
    },

    #[error("No current price for {0}")]
    NoPrice(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),
}

/// Price history provider.
///
/// Histories are oldest-first and contiguous; the last element is the
/// most recent close.
#[cfg_attr(test, mockall::automock)]
pub trait PriceHistoryPort: Send + Sync {
    /// Trailing `length` closes for one asset
    fn history(&self, asset: &Asset, length: usize) -> Result<Vec<f64>, MarketDataError>;

    /// Trailing `length` closes for several assets, aligned on the same periods
    fn aligned_history(
        &self,
        assets: &[Asset],
        length: usize,
    ) -> Result<Vec<Vec<f64>>, MarketDataError> {
        assets.iter().map(|a| self.history(a, length)).collect()
    }

    /// Latest close
    fn current_price(&self, asset: &Asset) -> Result<f64, MarketDataError> {
        self.history(asset, 1)?
            .last()
            .copied()
            .ok_or_else(|| MarketDataError::NoPrice(asset.to_string()))
    }

    /// Tradability predicate
    fn can_trade(&self, asset: &Asset) -> bool;
}

/// Provider that can be stepped through recorded periods
pub trait ReplayClock: Send + Sync {
    /// Total number of recorded periods
    fn periods(&self) -> usize;

    /// Number of periods currently visible
    fn now(&self) -> usize;

    /// Make the first `period` periods visible
    fn advance_to(&self, period: usize);
}
