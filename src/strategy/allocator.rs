//! Portfolio Allocator
//!
//! Sanitizes target weights before they reach execution:
//! - an untradeable asset or a non-finite weight drops the asset and its
//!   pair partner together
//! - zero weights on assets the portfolio does not hold are pruned; every
//!   asset left in the objective is tradeable
//! - gross exposure is scaled down to the cap

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use crate::domain::{Asset, Pair, PortfolioSnapshot, TargetWeights};
use crate::ports::{OrderRequest, PriceHistoryPort};
use crate::strategy::params::AllocationParams;

/// Why an asset was removed from the target weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DropReason {
    InvalidWeight(f64),
    Untradeable,
    /// Removed because its pair partner was dropped
    PartnerDropped,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::InvalidWeight(w) => write!(f, "invalid weight {}", w),
            DropReason::Untradeable => f.write_str("untradeable"),
            DropReason::PartnerDropped => f.write_str("partner dropped"),
        }
    }
}

/// Result of one allocation pass
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    /// Request to hand to execution
    pub request: OrderRequest,
    pub dropped: Vec<(Asset, DropReason)>,
    /// Pairs that lost both legs in this pass
    pub removed_pairs: Vec<Pair>,
    /// Factor applied to fit the exposure cap (1.0 when within the cap)
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct PortfolioAllocator {
    gross_exposure_cap: f64,
}

impl PortfolioAllocator {
    pub fn new(params: &AllocationParams) -> Self {
        Self {
            gross_exposure_cap: params.gross_exposure_cap,
        }
    }

    /// Sanitize `weights` for submission.
    ///
    /// `pool` is the working universe; dropped pairs are removed from it.
    pub fn allocate(
        &self,
        mut weights: TargetWeights,
        pairs: &[Pair],
        pool: &mut BTreeSet<Asset>,
        prices: &dyn PriceHistoryPort,
        portfolio: &PortfolioSnapshot,
    ) -> AllocationOutcome {
        let mut dropped: Vec<(Asset, DropReason)> = Vec::new();
        let mut removed_pairs = Vec::new();

        for asset in weights.assets() {
            let Some(weight) = weights.get(&asset) else {
                // already dropped as a partner
                continue;
            };
            // zero weights on unheld assets are pruned below; held ones must stay tradeable
            if weight == 0.0 && !portfolio.is_held(&asset) {
                continue;
            }
            let reason = if !weight.is_finite() {
                DropReason::InvalidWeight(weight)
            } else if !prices.can_trade(&asset) {
                DropReason::Untradeable
            } else {
                continue;
            };

            warn!("Dropping {} from target weights: {}", asset, reason);
            weights.remove(&asset);
            dropped.push((asset.clone(), reason));

            for pair in pairs.iter().filter(|p| p.contains(&asset)) {
                let Some(partner) = pair.partner(&asset) else {
                    continue;
                };
                if weights.remove(partner).is_some() {
                    warn!("Dropping {} with its partner {}", partner, asset);
                    dropped.push((partner.clone(), DropReason::PartnerDropped));
                    pool.remove(&asset);
                    pool.remove(partner);
                    removed_pairs.push(pair.clone());
                }
            }
        }

        weights.retain(|asset, w| w != 0.0 || portfolio.is_held(asset));

        let gross = weights.gross_exposure();
        let scale = if gross > self.gross_exposure_cap {
            let factor = self.gross_exposure_cap / gross;
            warn!(
                "Gross exposure {:.4} exceeds cap {:.4}, scaling by {:.4}",
                gross, self.gross_exposure_cap, factor
            );
            weights.scale(factor);
            factor
        } else {
            1.0
        };

        AllocationOutcome {
            request: OrderRequest::new(weights, self.gross_exposure_cap),
            dropped,
            removed_pairs,
            scale,
        }
    }
}
