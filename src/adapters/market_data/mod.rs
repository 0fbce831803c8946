//! Market Data Adapters
//!
//! - `PriceFile` / `ReplayPriceFeed`: recorded closes replayed period by period
//! - `SyntheticUniverse`: seeded generator of sector universes with embedded
//!   cointegrated pairs

mod price_file;
mod synthetic;

pub use price_file::{PriceFile, ReplayPriceFeed};
pub use synthetic::SyntheticUniverse;
