//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Price history and tradability
//! - Order execution against a target-weight objective
//! - Read-only portfolio state

pub mod market_data;
pub mod execution;
pub mod mocks;

pub use market_data::{PriceHistoryPort, MarketDataError, ReplayClock};
pub use execution::{
    ExecutionPort, ExecutionError, ExecutionReport, OrderRequest, Constraint, Fill, PortfolioPort,
};
