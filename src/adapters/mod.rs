//! Adapters Layer - External System Implementations
//!
//! Implementations of the port traits:
//! - Market Data: JSON price files replayed period by period, synthetic universes
//! - Paper: simulated execution and portfolio
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod market_data;
pub mod paper;

pub use cli::CliApp;
pub use market_data::{PriceFile, ReplayPriceFeed, SyntheticUniverse};
pub use paper::PaperBroker;
