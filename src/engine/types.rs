use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::Side;

/// Phase of the buy-then-sell cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for a qualifying post to buy on
    #[default]
    EntryPending,
    /// Holding a position until the exit timer fires
    ExitPending,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::EntryPending => write!(f, "entry-pending"),
            Phase::ExitPending => write!(f, "exit-pending"),
        }
    }
}

/// The single in-flight position
///
/// Owned by the supervisor and lent to the state machine, so it survives
/// feed reconnects. `entry_time` and `filled_quantity` only mean something
/// while `phase == ExitPending`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub phase: Phase,
    pub entry_time: Option<DateTime<Utc>>,
    pub filled_quantity: Decimal,
    pub trigger_text: String,
}

impl PositionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exit_pending(&self) -> bool {
        self.phase == Phase::ExitPending
    }

    /// Record an entry and start the exit timer
    pub fn enter(&mut self, entry_time: DateTime<Utc>, filled_quantity: Decimal, text: &str) {
        self.phase = Phase::ExitPending;
        self.entry_time = Some(entry_time);
        self.filled_quantity = filled_quantity;
        self.trigger_text = text.to_string();
    }

    /// Accept new entries again
    pub fn reopen(&mut self) {
        self.phase = Phase::EntryPending;
    }
}

/// Size of a trade: quote notional for buys, base quantity for sells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAmount {
    Notional(Decimal),
    Quantity(Decimal),
}

/// A single market order the engine wants to place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub side: Side,
    /// Base asset being bought or sold
    pub asset: String,
    pub amount: TradeAmount,
}

impl TradeRequest {
    pub fn buy(asset: impl Into<String>, notional: Decimal) -> Self {
        Self {
            side: Side::Buy,
            asset: asset.into(),
            amount: TradeAmount::Notional(notional),
        }
    }

    pub fn sell(asset: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            side: Side::Sell,
            asset: asset.into(),
            amount: TradeAmount::Quantity(quantity),
        }
    }

    /// Raw amount regardless of unit
    pub fn amount_value(&self) -> Decimal {
        match self.amount {
            TradeAmount::Notional(v) | TradeAmount::Quantity(v) => v,
        }
    }
}

/// Why a trade cannot be funded
///
/// Every variant carries the figures that led to the decision so callers
/// can log them; there is no free text here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsufficientFundsReason {
    /// Quote balance below the buy notional
    InsufficientQuote { available: Decimal, required: Decimal },
    /// Neither quote surplus nor discount asset covers the fee reserve
    FeeReserveUncovered {
        fee: Decimal,
        quote_available: Decimal,
        discount_value: Decimal,
    },
    /// Less base asset held than the position to sell
    InsufficientInventory { held: Decimal, required: Decimal },
    /// Sell value below the exchange minimum order size
    BelowMinimumOrder { value: Decimal, minimum: Decimal },
}

impl std::fmt::Display for InsufficientFundsReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientQuote { available, required } => {
                write!(f, "quote balance {} below notional {}", available, required)
            }
            Self::FeeReserveUncovered {
                fee,
                quote_available,
                discount_value,
            } => write!(
                f,
                "fee reserve {} not covered (quote {}, discount asset value {})",
                fee, quote_available, discount_value
            ),
            Self::InsufficientInventory { held, required } => {
                write!(f, "holding {} below position size {}", held, required)
            }
            Self::BelowMinimumOrder { value, minimum } => {
                write!(f, "sell value {} below minimum order {}", value, minimum)
            }
        }
    }
}

/// Output of the funds validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeasibilityDecision {
    Feasible,
    InsufficientFunds(InsufficientFundsReason),
}

impl FeasibilityDecision {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Feasible)
    }

    pub fn reason(&self) -> Option<InsufficientFundsReason> {
        match self {
            Self::Feasible => None,
            Self::InsufficientFunds(reason) => Some(*reason),
        }
    }
}
