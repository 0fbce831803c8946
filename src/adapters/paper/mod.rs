//! Paper Trading Adapter
//!
//! Simulated execution and portfolio state for replays and dry runs.

mod broker;

pub use broker::PaperBroker;
