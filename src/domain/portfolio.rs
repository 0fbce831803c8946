use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pair::Asset;

/// A position in the portfolio marked at the latest price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: Asset,
    /// Signed share count (negative = short)
    pub shares: f64,
    pub entry_price: f64,
    pub current_price: f64,
}

impl Holding {
    pub fn new(asset: Asset, shares: f64, entry_price: f64) -> Self {
        Holding {
            asset,
            shares,
            entry_price,
            current_price: entry_price,
        }
    }

    pub fn update_price(&mut self, price: f64) {
        self.current_price = price;
    }

    pub fn market_value(&self) -> f64 {
        self.shares * self.current_price
    }

    pub fn pnl(&self) -> f64 {
        (self.current_price - self.entry_price) * self.shares
    }
}

/// Read-only view of the account handed to the core each cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub holdings: BTreeMap<Asset, Holding>,
    pub cash: f64,
}

impl PortfolioSnapshot {
    pub fn new(cash: f64) -> Self {
        PortfolioSnapshot {
            holdings: BTreeMap::new(),
            cash,
        }
    }

    pub fn with_holding(mut self, holding: Holding) -> Self {
        self.holdings.insert(holding.asset.clone(), holding);
        self
    }

    /// Cash plus marked value of every holding
    pub fn value(&self) -> f64 {
        self.cash + self.holdings.values().map(Holding::market_value).sum::<f64>()
    }

    pub fn shares(&self, asset: &Asset) -> f64 {
        self.holdings.get(asset).map(|h| h.shares).unwrap_or(0.0)
    }

    pub fn is_held(&self, asset: &Asset) -> bool {
        self.shares(asset) != 0.0
    }

    pub fn total_pnl(&self) -> f64 {
        self.holdings.values().map(Holding::pnl).sum()
    }
}
