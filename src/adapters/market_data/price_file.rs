//! JSON price file and a replay feed over it
//!
//! ```json
//! { "sectors": { "staples": ["KO", "PEP"] },
//!   "prices": { "KO": [60.1, 60.4], "PEP": [170.2, 171.0] },
//!   "untradeable": [] }
//! ```
//!
//! Series are aligned on their first element. An asset whose series ends
//! before the replay cursor is treated as delisted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{Asset, UniversePartition};
use crate::ports::{MarketDataError, PriceHistoryPort, ReplayClock};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFile {
    pub sectors: UniversePartition,
    pub prices: BTreeMap<Asset, Vec<f64>>,
    #[serde(default)]
    pub untradeable: BTreeSet<Asset>,
}

impl PriceFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MarketDataError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MarketDataError::ParseError(format!("{}: {}", path.display(), e)))?;
        let file: PriceFile = serde_json::from_str(&content)
            .map_err(|e| MarketDataError::ParseError(format!("{}: {}", path.display(), e)))?;
        file.validate()?;
        Ok(file)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MarketDataError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MarketDataError::ParseError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| MarketDataError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Every sector asset needs a finite, positive price series
    pub fn validate(&self) -> Result<(), MarketDataError> {
        for asset in self.sectors.assets() {
            let series = self
                .prices
                .get(&asset)
                .ok_or_else(|| MarketDataError::UnknownAsset(asset.to_string()))?;
            if let Some(bad) = series.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
                return Err(MarketDataError::ParseError(format!(
                    "{} has invalid price {}",
                    asset, bad
                )));
            }
        }
        Ok(())
    }

    /// Length of the longest series
    pub fn periods(&self) -> usize {
        self.prices.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// Price history provider that only reveals periods up to a cursor
#[derive(Debug)]
pub struct ReplayPriceFeed {
    file: PriceFile,
    cursor: AtomicUsize,
}

impl ReplayPriceFeed {
    /// Feed with every period visible
    pub fn new(file: PriceFile) -> Self {
        let periods = file.periods();
        Self {
            file,
            cursor: AtomicUsize::new(periods),
        }
    }

    pub fn universe(&self) -> &UniversePartition {
        &self.file.sectors
    }

    fn visible<'a>(&'a self, asset: &Asset) -> Result<&'a [f64], MarketDataError> {
        let series = self
            .file
            .prices
            .get(asset)
            .ok_or_else(|| MarketDataError::UnknownAsset(asset.to_string()))?;
        let end = self.now().min(series.len());
        Ok(&series[..end])
    }
}

impl PriceHistoryPort for ReplayPriceFeed {
    fn history(&self, asset: &Asset, length: usize) -> Result<Vec<f64>, MarketDataError> {
        let visible = self.visible(asset)?;
        if visible.len() < length {
            return Err(MarketDataError::NotEnoughHistory {
                asset: asset.to_string(),
                requested: length,
                available: visible.len(),
            });
        }
        Ok(visible[visible.len() - length..].to_vec())
    }

    fn aligned_history(
        &self,
        assets: &[Asset],
        length: usize,
    ) -> Result<Vec<Vec<f64>>, MarketDataError> {
        // a delisted series would misalign with the others
        for asset in assets {
            if self.visible(asset)?.len() < self.now() {
                return Err(MarketDataError::NoPrice(asset.to_string()));
            }
        }
        assets.iter().map(|a| self.history(a, length)).collect()
    }

    fn can_trade(&self, asset: &Asset) -> bool {
        if self.file.untradeable.contains(asset) {
            return false;
        }
        let now = self.now();
        match self.file.prices.get(asset) {
            Some(series) => now > 0 && series.len() >= now,
            None => false,
        }
    }
}

impl ReplayClock for ReplayPriceFeed {
    fn periods(&self) -> usize {
        self.file.periods()
    }

    fn now(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn advance_to(&self, period: usize) {
        self.cursor.store(period.min(self.file.periods()), Ordering::SeqCst);
    }
}
