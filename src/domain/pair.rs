use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier of a tradable instrument
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Asset(symbol.into())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Asset {
    fn from(symbol: &str) -> Self {
        Asset::new(symbol)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PairError {
    #[error("A pair needs two distinct assets, got {0} twice")]
    SameAsset(Asset),
}

/// Ordered pair of assets; the spread is `first - hedge * second`.
///
/// (A, B) and (B, A) are distinct candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    pub first: Asset,
    pub second: Asset,
}

impl Pair {
    pub fn new(first: Asset, second: Asset) -> Result<Self, PairError> {
        if first == second {
            return Err(PairError::SameAsset(first));
        }
        Ok(Self { first, second })
    }

    /// The same assets in the opposite direction
    pub fn reversed(&self) -> Pair {
        Pair {
            first: self.second.clone(),
            second: self.first.clone(),
        }
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        &self.first == asset || &self.second == asset
    }

    /// The other leg, if `asset` is one of the legs
    pub fn partner(&self, asset: &Asset) -> Option<&Asset> {
        if &self.first == asset {
            Some(&self.second)
        } else if &self.second == asset {
            Some(&self.first)
        } else {
            None
        }
    }

    pub fn assets(&self) -> [&Asset; 2] {
        [&self.first, &self.second]
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// Identifies one screening statistic (and the gate that checks it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Correlation,
    Cointegration,
    Stationarity,
    Hurst,
    HalfLife,
    Normality,
}

impl MetricKind {
    /// Gate order used by the screener
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Correlation,
        MetricKind::Cointegration,
        MetricKind::Stationarity,
        MetricKind::Hurst,
        MetricKind::HalfLife,
        MetricKind::Normality,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Correlation => "correlation",
            MetricKind::Cointegration => "cointegration",
            MetricKind::Stationarity => "stationarity",
            MetricKind::Hurst => "hurst",
            MetricKind::HalfLife => "half_life",
            MetricKind::Normality => "normality",
        }
    }

    /// Ranking direction: correlation ranks descending, everything else ascending
    pub fn higher_is_better(&self) -> bool {
        matches!(self, MetricKind::Correlation)
    }

    /// Whether the metric is a p-value (shares the significance budget)
    pub fn is_p_value(&self) -> bool {
        matches!(
            self,
            MetricKind::Cointegration | MetricKind::Stationarity | MetricKind::Normality
        )
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-pair screening record; `None` means the gate was never reached or
/// its computation failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningMetrics {
    pub correlation: Option<f64>,
    pub cointegration_p: Option<f64>,
    pub stationarity_p: Option<f64>,
    pub hurst: Option<f64>,
    pub half_life: Option<f64>,
    pub normality_p: Option<f64>,
}

impl ScreeningMetrics {
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Correlation => self.correlation,
            MetricKind::Cointegration => self.cointegration_p,
            MetricKind::Stationarity => self.stationarity_p,
            MetricKind::Hurst => self.hurst,
            MetricKind::HalfLife => self.half_life,
            MetricKind::Normality => self.normality_p,
        }
    }

    pub fn set(&mut self, kind: MetricKind, value: f64) {
        let slot = match kind {
            MetricKind::Correlation => &mut self.correlation,
            MetricKind::Cointegration => &mut self.cointegration_p,
            MetricKind::Stationarity => &mut self.stationarity_p,
            MetricKind::Hurst => &mut self.hurst,
            MetricKind::HalfLife => &mut self.half_life,
            MetricKind::Normality => &mut self.normality_p,
        };
        *slot = Some(value);
    }

    /// Value used for ranking (correlation by magnitude)
    pub fn ranking_key(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Correlation => self.correlation.map(f64::abs),
            other => self.get(other),
        }
    }
}

/// Trading state of a shortlisted pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    /// Long the first leg, short the hedged second leg
    Long,
    /// Short the first leg, long the hedged second leg
    Short,
}

/// Mutable per-pair status, reset at every screening cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PairStatus {
    pub state: PositionState,
    /// Hedge ratio used for the open position
    pub hedge_ratio: Option<f64>,
}

impl PairStatus {
    pub fn currently_long(&self) -> bool {
        self.state == PositionState::Long
    }

    pub fn currently_short(&self) -> bool {
        self.state == PositionState::Short
    }

    pub fn is_flat(&self) -> bool {
        self.state == PositionState::Flat
    }
}
