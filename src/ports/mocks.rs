use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{Asset, PortfolioSnapshot};
use crate::ports::execution::{ExecutionError, ExecutionPort, ExecutionReport, OrderRequest, PortfolioPort};
use crate::ports::market_data::{MarketDataError, PriceHistoryPort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory price histories with a controllable tradability set
#[derive(Debug, Default, Clone)]
pub struct MockPriceHistory {
    series: BTreeMap<Asset, Vec<f64>>,
    untradeable: BTreeSet<Asset>,
    calls: Arc<Mutex<Vec<Asset>>>,
}

impl MockPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the full history of an asset
    pub fn with_series(mut self, asset: &str, prices: Vec<f64>) -> Self {
        self.series.insert(Asset::from(asset), prices);
        self
    }

    /// Builder method to mark an asset as untradeable
    pub fn with_untradeable(mut self, asset: &str) -> Self {
        self.untradeable.insert(Asset::from(asset));
        self
    }

    /// Append one close to an asset's history
    pub fn push(&mut self, asset: &str, price: f64) {
        self.series.entry(Asset::from(asset)).or_default().push(price);
    }

    /// Assets requested so far, in call order
    pub fn get_calls(&self) -> Vec<Asset> {
        lock(&self.calls).clone()
    }
}

impl PriceHistoryPort for MockPriceHistory {
    fn history(&self, asset: &Asset, length: usize) -> Result<Vec<f64>, MarketDataError> {
        lock(&self.calls).push(asset.clone());
        let series = self
            .series
            .get(asset)
            .ok_or_else(|| MarketDataError::UnknownAsset(asset.to_string()))?;
        if series.len() < length {
            return Err(MarketDataError::NotEnoughHistory {
                asset: asset.to_string(),
                requested: length,
                available: series.len(),
            });
        }
        Ok(series[series.len() - length..].to_vec())
    }

    fn can_trade(&self, asset: &Asset) -> bool {
        self.series.contains_key(asset) && !self.untradeable.contains(asset)
    }
}

/// Execution port that records every request and answers with a configured result
#[derive(Debug, Default, Clone)]
pub struct MockExecution {
    requests: Arc<Mutex<Vec<OrderRequest>>>,
    failure: Option<ExecutionError>,
}

impl MockExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to reject every request
    pub fn failing_with(mut self, error: ExecutionError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn get_requests(&self) -> Vec<OrderRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ExecutionPort for MockExecution {
    async fn submit(&self, request: OrderRequest) -> Result<ExecutionReport, ExecutionError> {
        lock(&self.requests).push(request);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(ExecutionReport::empty()),
        }
    }
}

/// Portfolio port returning a fixed snapshot
#[derive(Debug, Default, Clone)]
pub struct MockPortfolio {
    snapshot: Arc<Mutex<PortfolioSnapshot>>,
}

impl MockPortfolio {
    pub fn new(snapshot: PortfolioSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn set(&self, snapshot: PortfolioSnapshot) {
        *lock(&self.snapshot) = snapshot;
    }
}

impl PortfolioPort for MockPortfolio {
    fn snapshot(&self) -> PortfolioSnapshot {
        lock(&self.snapshot).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetWeights;

    #[test]
    fn test_mock_price_history() {
        let prices = MockPriceHistory::new()
            .with_series("KO", vec![60.0, 61.0, 62.0])
            .with_untradeable("PEP")
            .with_series("PEP", vec![170.0]);

        assert_eq!(prices.history(&Asset::from("KO"), 2), Ok(vec![61.0, 62.0]));
        assert!(matches!(
            prices.history(&Asset::from("PEP"), 5),
            Err(MarketDataError::NotEnoughHistory { available: 1, .. })
        ));
        assert!(prices.can_trade(&Asset::from("KO")));
        assert!(!prices.can_trade(&Asset::from("PEP")));
        assert!(!prices.can_trade(&Asset::from("MO")));
        assert_eq!(prices.get_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_execution_records() {
        let execution = MockExecution::new();
        let request = OrderRequest::new(TargetWeights::new(), 1.0);
        assert!(execution.submit(request.clone()).await.is_ok());
        assert_eq!(execution.get_requests(), vec![request]);

        let failing = MockExecution::new().failing_with(ExecutionError::Rejected("closed".into()));
        assert!(failing.submit(OrderRequest::new(TargetWeights::new(), 1.0)).await.is_err());
    }

    #[test]
    fn test_mock_portfolio() {
        let portfolio = MockPortfolio::new(PortfolioSnapshot::new(1000.0));
        assert_eq!(portfolio.snapshot().value(), 1000.0);
        portfolio.set(PortfolioSnapshot::new(500.0));
        assert_eq!(portfolio.snapshot().cash, 500.0);
    }
}
