use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{Asset, PortfolioSnapshot, TargetWeights};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("No price available for {0}")]
    MissingPrice(Asset),
    #[error("Constraint violated: {0}")]
    ConstraintViolated(String),
    #[error("Order rejected: {0}")]
    Rejected(String),
}

/// Constraint attached to a target-weight objective
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Sum of absolute weights must not exceed this fraction of portfolio value
    MaxGrossExposure(f64),
}

/// Target-weight objective plus constraints; the core never issues orders directly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub objective: TargetWeights,
    pub constraints: Vec<Constraint>,
}

impl OrderRequest {
    pub fn new(objective: TargetWeights, gross_exposure_cap: f64) -> Self {
        OrderRequest {
            objective,
            constraints: vec![Constraint::MaxGrossExposure(gross_exposure_cap)],
        }
    }

    /// Check the objective against every constraint
    pub fn check_constraints(&self) -> Result<(), ExecutionError> {
        for constraint in &self.constraints {
            match constraint {
                Constraint::MaxGrossExposure(cap) => {
                    let gross = self.objective.gross_exposure();
                    if gross > cap + 1e-9 {
                        return Err(ExecutionError::ConstraintViolated(format!(
                            "gross exposure {:.4} exceeds cap {:.4}",
                            gross, cap
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub asset: Asset,
    /// Signed shares traded
    pub shares: f64,
    pub price: f64,
    pub commission: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub fills: Vec<Fill>,
    pub total_commission: f64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn empty() -> Self {
        ExecutionReport {
            fills: Vec::new(),
            total_commission: 0.0,
            timestamp: Utc::now(),
        }
    }
}

/// Order execution: translates a target-weight objective into trades
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    async fn submit(&self, request: OrderRequest) -> Result<ExecutionReport, ExecutionError>;
}

/// Read-only account state
pub trait PortfolioPort: Send + Sync {
    fn snapshot(&self) -> PortfolioSnapshot;

    /// Re-mark holdings at the latest prices
    fn update_marks(&self, _prices: &BTreeMap<Asset, f64>) {}
}
