use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::domain::{fill_commission, Asset, Holding, PortfolioSnapshot};
use crate::ports::{
    ExecutionError, ExecutionPort, ExecutionReport, Fill, OrderRequest, PortfolioPort, PriceHistoryPort,
};

/// Fills below this many shares are skipped
const MIN_SHARES: f64 = 1e-9;

/// Paper execution and portfolio: fills every target at the latest close
/// and charges a flat per-share commission.
#[derive(Debug)]
pub struct PaperBroker<P: PriceHistoryPort> {
    prices: Arc<P>,
    commission_per_share: f64,
    state: Mutex<PortfolioSnapshot>,
}

impl<P: PriceHistoryPort> PaperBroker<P> {
    pub fn new(prices: Arc<P>, initial_cash: f64, commission_per_share: f64) -> Self {
        Self {
            prices,
            commission_per_share,
            state: Mutex::new(PortfolioSnapshot::new(initial_cash)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PortfolioSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply_fill(state: &mut PortfolioSnapshot, fill: &Fill) {
        state.cash -= fill.shares * fill.price + fill.commission;

        let holding = state
            .holdings
            .entry(fill.asset.clone())
            .or_insert_with(|| Holding::new(fill.asset.clone(), 0.0, fill.price));
        let before = holding.shares;
        let after = before + fill.shares;

        if before == 0.0 || before.signum() != after.signum() {
            // opened or flipped
            holding.entry_price = fill.price;
        } else if after.abs() > before.abs() {
            holding.entry_price = (holding.entry_price * before + fill.price * fill.shares) / after;
        }
        holding.shares = after;
        holding.current_price = fill.price;

        if holding.shares.abs() < MIN_SHARES {
            state.holdings.remove(&fill.asset);
        }
    }
}

#[async_trait]
impl<P: PriceHistoryPort + 'static> ExecutionPort for PaperBroker<P> {
    async fn submit(&self, request: OrderRequest) -> Result<ExecutionReport, ExecutionError> {
        request.check_constraints()?;

        let mut quotes = BTreeMap::new();
        for (asset, _) in request.objective.iter() {
            let price = self
                .prices
                .current_price(asset)
                .map_err(|_| ExecutionError::MissingPrice(asset.clone()))?;
            quotes.insert(asset.clone(), price);
        }

        let mut state = self.lock();
        for (asset, price) in &quotes {
            if let Some(holding) = state.holdings.get_mut(asset) {
                holding.update_price(*price);
            }
        }
        let value = state.value();
        if value <= 0.0 {
            return Err(ExecutionError::Rejected(format!("portfolio value {:.2}", value)));
        }

        let mut fills = Vec::new();
        for (asset, weight) in request.objective.iter() {
            let price = quotes[asset];
            let target = weight * value / price;
            let shares = target - state.shares(asset);
            if shares.abs() < MIN_SHARES {
                continue;
            }
            let fill = Fill {
                asset: asset.clone(),
                shares,
                price,
                commission: fill_commission(shares, self.commission_per_share),
            };
            debug!("Paper fill: {} {:+.4} @ {:.4}", fill.asset, fill.shares, fill.price);
            Self::apply_fill(&mut state, &fill);
            fills.push(fill);
        }

        let total_commission = fills.iter().map(|f| f.commission).sum();
        info!(
            "Paper execution: {} fills, commission {:.2}, portfolio value {:.2}",
            fills.len(),
            total_commission,
            state.value()
        );
        Ok(ExecutionReport {
            fills,
            total_commission,
            timestamp: Utc::now(),
        })
    }
}

impl<P: PriceHistoryPort> PortfolioPort for PaperBroker<P> {
    fn snapshot(&self) -> PortfolioSnapshot {
        self.lock().clone()
    }

    fn update_marks(&self, prices: &BTreeMap<Asset, f64>) {
        let mut state = self.lock();
        for (asset, price) in prices {
            if let Some(holding) = state.holdings.get_mut(asset) {
                holding.update_price(*price);
            }
        }
    }
}
