//! Domain Layer - core types of the pair-trading engine
//!
//! Pure data types with no external I/O. Market data, portfolio state and
//! order execution are reached through the ports layer.

pub mod pair;
pub mod universe;
pub mod weights;
pub mod portfolio;
pub mod commission;

pub use pair::{Asset, Pair, PairError, MetricKind, ScreeningMetrics, PositionState, PairStatus};
pub use universe::UniversePartition;
pub use weights::TargetWeights;
pub use portfolio::{Holding, PortfolioSnapshot};
pub use commission::{estimate_commission, fill_commission};
