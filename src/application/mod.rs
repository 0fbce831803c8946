//! Application Layer
//!
//! The session object holding pair trading state and the orchestrator that
//! drives it over replayed data.

pub mod session;
pub mod orchestrator;

pub use session::{MonitoringOutcome, PairTradingSession, SessionError};
pub use orchestrator::{
    OrchestratorError, OrchestratorStatus, ReplayOrchestrator, ReplaySummary, TickSummary,
};
