//! Position State Machine
//!
//! Per-pair state driven by the spread z-score:
//! - Short -> Flat when z < exit
//! - Long -> Flat when z > -exit
//! - -> Long when z < -entry and not already long
//! - -> Short when z > entry and not already short
//!
//! Rules are checked in that order; the first match wins.

use serde::{Deserialize, Serialize};

use crate::domain::{PairStatus, PositionState};
use crate::strategy::params::TradingParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    ExitShort,
    ExitLong,
    EnterLong,
    EnterShort,
}

impl Transition {
    pub fn target_state(&self) -> PositionState {
        match self {
            Transition::ExitShort | Transition::ExitLong => PositionState::Flat,
            Transition::EnterLong => PositionState::Long,
            Transition::EnterShort => PositionState::Short,
        }
    }
}

/// Signed weights for the two legs of a pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegWeights {
    pub first: f64,
    pub second: f64,
}

impl LegWeights {
    pub fn gross(&self) -> f64 {
        self.first.abs() + self.second.abs()
    }
}

/// Convert signed share counts into weights whose absolute values sum to 1.
///
/// Non-finite when both legs have zero notional.
pub fn holdings_pct(first_shares: f64, second_shares: f64, first_price: f64, second_price: f64) -> LegWeights {
    let first_dollars = first_shares * first_price;
    let second_dollars = second_shares * second_price;
    let notional = first_dollars.abs() + second_dollars.abs();
    LegWeights {
        first: first_dollars / notional,
        second: second_dollars / notional,
    }
}

#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    entry_threshold: f64,
    exit_threshold: f64,
    leverage: f64,
}

impl PositionStateMachine {
    pub fn new(params: &TradingParams) -> Self {
        Self {
            entry_threshold: params.entry_threshold,
            exit_threshold: params.exit_threshold,
            leverage: params.leverage,
        }
    }

    /// Transition triggered by `z` from the current status, if any
    pub fn decide(&self, status: &PairStatus, z: f64) -> Option<Transition> {
        if !z.is_finite() {
            return None;
        }
        if status.currently_short() && z < self.exit_threshold {
            Some(Transition::ExitShort)
        } else if status.currently_long() && z > -self.exit_threshold {
            Some(Transition::ExitLong)
        } else if z < -self.entry_threshold && !status.currently_long() {
            Some(Transition::EnterLong)
        } else if z > self.entry_threshold && !status.currently_short() {
            Some(Transition::EnterShort)
        } else {
            None
        }
    }

    /// Leg weights after `transition`, sized to `pair_share` of leveraged capital
    pub fn target_weights(
        &self,
        transition: Transition,
        hedge_ratio: f64,
        prices: (f64, f64),
        pair_share: f64,
    ) -> LegWeights {
        let (first_price, second_price) = prices;
        let unit = match transition {
            Transition::ExitShort | Transition::ExitLong => return LegWeights::default(),
            Transition::EnterLong => holdings_pct(1.0, -hedge_ratio, first_price, second_price),
            Transition::EnterShort => holdings_pct(-1.0, hedge_ratio, first_price, second_price),
        };
        let scale = self.leverage * pair_share;
        LegWeights {
            first: unit.first * scale,
            second: unit.second * scale,
        }
    }

    /// Update the status to reflect a transition
    pub fn apply(&self, status: &mut PairStatus, transition: Transition, hedge_ratio: f64) {
        status.state = transition.target_state();
        status.hedge_ratio = match status.state {
            PositionState::Flat => None,
            _ => Some(hedge_ratio),
        };
    }
}
