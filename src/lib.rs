//! Butters Pairs - Statistical Arbitrage Pair Trading Library
//!
//! Screens a sector-partitioned universe for cointegrated, mean-reverting
//! pairs and trades their spreads on z-score thresholds.
//!
//! # Modules
//!
//! - `domain`: Core types (Asset, Pair, TargetWeights, PortfolioSnapshot, commission)
//! - `ports`: Trait abstractions (PriceHistoryPort, ExecutionPort, PortfolioPort)
//! - `strategy`: Statistical tests, screening, spread tracking, positions, allocation
//! - `adapters`: External implementations (price files, synthetic data, paper broker, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Session object and replay orchestrator

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
