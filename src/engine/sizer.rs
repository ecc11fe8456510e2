use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::types::{BalanceSnapshot, Side};
use crate::config::types::TradingConfig;
use crate::engine::types::{FeasibilityDecision, InsufficientFundsReason, TradeAmount, TradeRequest};

/// Funds validator
///
/// Decides whether a trade can be funded from a fresh [`BalanceSnapshot`].
///
/// # Fee buffer
///
/// Every trade reserves `fee_rate` of its quote notional for fees. The
/// reserve is covered either by quote currency left over after the trade or
/// by the quote value of the discount asset. When neither covers it the
/// trade is refused even if the principal is available.
#[derive(Debug, Clone)]
pub struct FundsValidator {
    quote_asset: String,
    discount_asset: String,
    fee_rate: Decimal,
    min_order_notional: Decimal,
}

impl FundsValidator {
    pub fn new(quote_asset: impl Into<String>, discount_asset: impl Into<String>) -> Self {
        Self {
            quote_asset: quote_asset.into(),
            discount_asset: discount_asset.into(),
            fee_rate: dec!(0.001),
            min_order_notional: dec!(10),
        }
    }

    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(&config.quote_asset, &config.discount_asset)
            .with_fee_rate(config.fee_rate)
            .with_min_order_notional(config.min_order_notional)
    }

    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_min_order_notional(mut self, minimum: Decimal) -> Self {
        self.min_order_notional = minimum;
        self
    }

    /// Fee reserved for a trade of the given quote notional
    pub fn fee_for(&self, notional: Decimal) -> Decimal {
        notional * self.fee_rate
    }

    pub fn evaluate(&self, request: &TradeRequest, snapshot: &BalanceSnapshot) -> FeasibilityDecision {
        let quote_available = snapshot.amount(&self.quote_asset);
        let discount_value = snapshot.quote_value(&self.discount_asset);

        match (request.side, request.amount) {
            (Side::Buy, TradeAmount::Notional(notional)) => {
                self.evaluate_buy(notional, quote_available, discount_value)
            }
            (Side::Sell, TradeAmount::Quantity(quantity)) => {
                let held = snapshot.amount(&request.asset);
                let unit_price = snapshot.unit_price(&request.asset);
                self.evaluate_sell(quantity, held, unit_price, quote_available, discount_value)
            }
            // A buy by quantity or sell by notional is priced at the current unit price
            (Side::Buy, TradeAmount::Quantity(quantity)) => {
                let notional = quantity * snapshot.unit_price(&request.asset);
                self.evaluate_buy(notional, quote_available, discount_value)
            }
            (Side::Sell, TradeAmount::Notional(notional)) => {
                let unit_price = snapshot.unit_price(&request.asset);
                let quantity = if unit_price.is_zero() {
                    Decimal::ZERO
                } else {
                    notional / unit_price
                };
                let held = snapshot.amount(&request.asset);
                self.evaluate_sell(quantity, held, unit_price, quote_available, discount_value)
            }
        }
    }

    fn evaluate_buy(
        &self,
        notional: Decimal,
        quote_available: Decimal,
        discount_value: Decimal,
    ) -> FeasibilityDecision {
        let fee = self.fee_for(notional);

        if quote_available < notional {
            return FeasibilityDecision::InsufficientFunds(
                InsufficientFundsReason::InsufficientQuote {
                    available: quote_available,
                    required: notional,
                },
            );
        }

        if quote_available - notional < fee && discount_value < fee {
            return FeasibilityDecision::InsufficientFunds(
                InsufficientFundsReason::FeeReserveUncovered {
                    fee,
                    quote_available,
                    discount_value,
                },
            );
        }

        FeasibilityDecision::Feasible
    }

    /// Sell checks: inventory, then minimum order value, then fee reserve
    ///
    /// The fee reserve is taken on the current sell value, not on the
    /// notional spent at entry, so a position that gained value needs a
    /// larger reserve and one that lost value a smaller one.
    fn evaluate_sell(
        &self,
        quantity: Decimal,
        held: Decimal,
        unit_price: Decimal,
        quote_available: Decimal,
        discount_value: Decimal,
    ) -> FeasibilityDecision {
        let value = unit_price * quantity;
        let fee = self.fee_for(value);

        if held < quantity {
            return FeasibilityDecision::InsufficientFunds(
                InsufficientFundsReason::InsufficientInventory {
                    held,
                    required: quantity,
                },
            );
        }

        if value < self.min_order_notional {
            return FeasibilityDecision::InsufficientFunds(
                InsufficientFundsReason::BelowMinimumOrder {
                    value,
                    minimum: self.min_order_notional,
                },
            );
        }

        if quote_available < fee && discount_value < fee {
            return FeasibilityDecision::InsufficientFunds(
                InsufficientFundsReason::FeeReserveUncovered {
                    fee,
                    quote_available,
                    discount_value,
                },
            );
        }

        FeasibilityDecision::Feasible
    }
}
