//! Two-phase position state machine
//!
//! `EntryPending` buys on a qualifying post; `ExitPending` sells once the
//! holding period has elapsed. Nothing else is tracked.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::qualifier::{EventQualifier, Rejection};
use super::sizer::FundsValidator;
use super::snapshot::take_snapshot;
use super::timer::{ExitTimer, HoldingPeriod};
use super::types::{FeasibilityDecision, InsufficientFundsReason, PositionState, TradeRequest};
use crate::common::traits::ExchangeClient;
use crate::common::types::{FeedEvent, OrderResult};
use crate::config::types::TradingConfig;

/// What happened to a post handed to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// A position is already open; posts are not evaluated
    PositionOpen,
    /// The post did not qualify
    NotQualified(Rejection),
    /// Balances could not be read
    SnapshotFailed,
    /// The buy could not be funded
    InsufficientFunds(InsufficientFundsReason),
    /// The exchange rejected or failed the buy
    SubmissionFailed,
    /// Bought; the exit timer is running
    Entered(OrderResult),
}

/// What an exit check did
#[derive(Debug, Clone, PartialEq)]
pub enum ExitOutcome {
    /// No position open
    Idle,
    /// Holding period not over yet
    NotDue,
    /// Balances could not be read; exit abandoned
    SnapshotFailed,
    /// The sell could not be funded; exit abandoned
    InsufficientFunds(InsufficientFundsReason),
    /// The exchange rejected or failed the sell; exit abandoned
    SubmissionFailed,
    /// Sold
    Exited(OrderResult),
}

/// Drives buys and sells for a single asset
pub struct PositionManager {
    exchange: Arc<dyn ExchangeClient>,
    validator: FundsValidator,
    qualifier: EventQualifier,
    clock: Arc<dyn Clock>,
    holding: HoldingPeriod,
    config: TradingConfig,
}

impl PositionManager {
    pub fn new(config: TradingConfig, exchange: Arc<dyn ExchangeClient>) -> Self {
        Self {
            validator: FundsValidator::from_config(&config),
            qualifier: EventQualifier::from_config(&config),
            holding: HoldingPeriod::new(config.holding_duration()),
            clock: Arc::new(SystemClock),
            exchange,
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn exit_timer(&self) -> ExitTimer {
        ExitTimer::new(self.config.exit_poll_interval())
    }

    /// Handle one post from the feed
    ///
    /// Posts are only evaluated in `EntryPending`. Every failure leaves the
    /// phase unchanged and is logged.
    #[instrument(skip_all, fields(phase = %state.phase))]
    pub async fn handle_event(&self, state: &mut PositionState, event: &FeedEvent) -> EntryOutcome {
        if state.is_exit_pending() {
            debug!("Position open, ignoring post from {:?}", event.account);
            return EntryOutcome::PositionOpen;
        }

        if let Err(rejection) = self.qualifier.check(event) {
            debug!("Post from {:?} not qualifying: {:?}", event.account, rejection);
            return EntryOutcome::NotQualified(rejection);
        }

        let text = event.text.as_deref().unwrap_or_default();
        info!(
            "Qualifying post from {}: {:?}",
            self.config.tracked_account, text
        );
        self.enter(state, text).await
    }

    async fn enter(&self, state: &mut PositionState, text: &str) -> EntryOutcome {
        let request = TradeRequest::buy(self.config.base_asset(), self.config.notional);

        let snapshot = match take_snapshot(self.exchange.as_ref(), &self.config.quote_asset).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Cannot read balances before buying: {}", e);
                return EntryOutcome::SnapshotFailed;
            }
        };

        if let FeasibilityDecision::InsufficientFunds(reason) =
            self.validator.evaluate(&request, &snapshot)
        {
            warn!(
                "Not enough {} to buy {} {} of {}: {}",
                self.config.quote_asset,
                self.config.notional,
                self.config.quote_asset,
                request.asset,
                reason
            );
            return EntryOutcome::InsufficientFunds(reason);
        }

        let order = match self
            .exchange
            .submit_order(&self.config.symbol(), &request)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                error!("Buy order for {} failed: {}", self.config.symbol(), e);
                return EntryOutcome::SubmissionFailed;
            }
        };

        let entry_time = order.fill_time.unwrap_or_else(|| self.clock.now());
        if !order.confirmed_filled || order.filled_quantity.is_zero() {
            warn!(
                "Buy order {} not confirmed filled (filled quantity {}); exit timer starts at {}",
                order.order_id, order.filled_quantity, entry_time
            );
        }

        state.enter(entry_time, order.filled_quantity, text);
        match self.holding.deadline(entry_time) {
            Some(deadline) => info!(
                "Bought {} {} (order {}), selling after {}",
                order.filled_quantity, request.asset, order.order_id, deadline
            ),
            None => warn!(
                "Bought {} {} (order {}), holding period {} has no representable deadline",
                order.filled_quantity,
                request.asset,
                order.order_id,
                self.holding.duration()
            ),
        }
        EntryOutcome::Entered(order)
    }

    /// True when a position is open and its holding period is over
    pub fn exit_due(&self, state: &PositionState) -> bool {
        if !state.is_exit_pending() {
            return false;
        }
        match state.entry_time {
            Some(entry_time) => self.holding.has_elapsed(entry_time, self.clock.now()),
            None => true,
        }
    }

    /// One exit check: sell if the holding period is over
    pub async fn poll_exit(&self, state: &mut PositionState) -> ExitOutcome {
        if !state.is_exit_pending() {
            return ExitOutcome::Idle;
        }
        if !self.exit_due(state) {
            return ExitOutcome::NotDue;
        }
        self.exit(state).await
    }

    #[instrument(skip_all, fields(quantity = %state.filled_quantity))]
    async fn exit(&self, state: &mut PositionState) -> ExitOutcome {
        // Reopen before the sell so a stuck exit never blocks new entries
        state.reopen();
        let request = TradeRequest::sell(self.config.base_asset(), state.filled_quantity);

        let snapshot = match take_snapshot(self.exchange.as_ref(), &self.config.quote_asset).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.abandon(state.filled_quantity, &format!("balances unavailable: {}", e));
                return ExitOutcome::SnapshotFailed;
            }
        };

        if let FeasibilityDecision::InsufficientFunds(reason) =
            self.validator.evaluate(&request, &snapshot)
        {
            self.abandon(state.filled_quantity, &reason.to_string());
            return ExitOutcome::InsufficientFunds(reason);
        }

        match self
            .exchange
            .submit_order(&self.config.symbol(), &request)
            .await
        {
            Ok(order) => {
                info!(
                    "Sold {} {} (order {}) after post {:?}",
                    order.filled_quantity, request.asset, order.order_id, state.trigger_text
                );
                ExitOutcome::Exited(order)
            }
            Err(e) => {
                self.abandon(state.filled_quantity, &format!("sell order failed: {}", e));
                ExitOutcome::SubmissionFailed
            }
        }
    }

    fn abandon(&self, quantity: Decimal, why: &str) {
        error!(
            "Exit abandoned, {} {} left unsold and needs manual attention: {}",
            quantity,
            self.config.base_asset(),
            why
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::ClientError;
    use crate::common::traits::MockExchangeClient;
    use crate::common::types::{AssetBalance, Side};
    use crate::engine::clock::TokioClock;
    use crate::engine::types::{Phase, TradeAmount};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn config() -> TradingConfig {
        TradingConfig::new("alice", "DOGEUSD", dec!(100), 1.0)
    }

    fn entry_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn filled(quantity: Decimal) -> OrderResult {
        OrderResult {
            order_id: "1".into(),
            fill_time: Some(entry_time()),
            filled_quantity: quantity,
            confirmed_filled: true,
        }
    }

    fn exchange_with(balances: Vec<AssetBalance>, doge_price: Decimal) -> MockExchangeClient {
        let mut exchange = MockExchangeClient::new();
        exchange
            .expect_free_balances()
            .returning(move || Ok(balances.clone()));
        exchange.expect_price().returning(move |symbol| match symbol {
            "DOGEUSD" => Ok(doge_price),
            "BNBUSD" => Ok(dec!(300)),
            other => Err(ClientError::InvalidResponse(format!("unknown {}", other))),
        });
        exchange
    }

    #[tokio::test]
    async fn test_qualifying_post_enters_position() {
        let mut exchange = exchange_with(vec![AssetBalance::new("USD", dec!(500))], dec!(0.25));
        exchange
            .expect_submit_order()
            .withf(|symbol, request| {
                symbol.to_string() == "DOGEUSD"
                    && request.side == Side::Buy
                    && request.asset == "DOGE"
                    && request.amount == TradeAmount::Notional(dec!(100))
            })
            .times(1)
            .returning(|_, _| Ok(filled(dec!(400))));

        let manager = PositionManager::new(config(), Arc::new(exchange));
        let mut state = PositionState::new();

        let outcome = manager
            .handle_event(&mut state, &FeedEvent::post("alice", "Buying $DOGE today"))
            .await;

        assert!(matches!(outcome, EntryOutcome::Entered(_)));
        assert_eq!(state.phase, Phase::ExitPending);
        assert_eq!(state.entry_time, Some(entry_time()));
        assert_eq!(state.filled_quantity, dec!(400));
        assert_eq!(state.trigger_text, "Buying $DOGE today");
    }

    #[tokio::test]
    async fn test_insufficient_funds_keeps_entry_pending() {
        let mut exchange = exchange_with(vec![AssetBalance::new("USD", dec!(50))], dec!(0.25));
        exchange.expect_submit_order().never();

        let manager = PositionManager::new(config(), Arc::new(exchange));
        let mut state = PositionState::new();

        let outcome = manager
            .handle_event(&mut state, &FeedEvent::post("alice", "DOGE"))
            .await;

        assert_eq!(
            outcome,
            EntryOutcome::InsufficientFunds(InsufficientFundsReason::InsufficientQuote {
                available: dec!(50),
                required: dec!(100),
            })
        );
        assert_eq!(state, PositionState::new());
    }

    #[tokio::test]
    async fn test_failed_buy_keeps_entry_pending() {
        let mut exchange = exchange_with(vec![AssetBalance::new("USD", dec!(500))], dec!(0.25));
        exchange
            .expect_submit_order()
            .returning(|_, _| Err(ClientError::OrderSubmission("MIN_NOTIONAL".into())));

        let manager = PositionManager::new(config(), Arc::new(exchange));
        let mut state = PositionState::new();

        let outcome = manager
            .handle_event(&mut state, &FeedEvent::post("alice", "DOGE"))
            .await;

        assert_eq!(outcome, EntryOutcome::SubmissionFailed);
        assert_eq!(state.phase, Phase::EntryPending);
    }

    #[tokio::test]
    async fn test_snapshot_failure_keeps_entry_pending() {
        let mut exchange = MockExchangeClient::new();
        exchange
            .expect_free_balances()
            .returning(|| Err(ClientError::InvalidResponse("503".into())));
        exchange.expect_submit_order().never();

        let manager = PositionManager::new(config(), Arc::new(exchange));
        let mut state = PositionState::new();

        let outcome = manager
            .handle_event(&mut state, &FeedEvent::post("alice", "DOGE"))
            .await;

        assert_eq!(outcome, EntryOutcome::SnapshotFailed);
        assert_eq!(state.phase, Phase::EntryPending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_fill_starts_timer_at_submission() {
        let mut exchange = exchange_with(vec![AssetBalance::new("USD", dec!(500))], dec!(0.25));
        exchange.expect_submit_order().returning(|_, _| {
            Ok(OrderResult {
                order_id: "9".into(),
                fill_time: None,
                filled_quantity: Decimal::ZERO,
                confirmed_filled: false,
            })
        });

        let now = entry_time() + chrono::Duration::minutes(5);
        let manager = PositionManager::new(config(), Arc::new(exchange))
            .with_clock(Arc::new(TokioClock::starting_at(now)));
        let mut state = PositionState::new();

        manager
            .handle_event(&mut state, &FeedEvent::post("alice", "DOGE"))
            .await;

        assert_eq!(state.phase, Phase::ExitPending);
        assert_eq!(state.entry_time, Some(now));
        assert_eq!(state.filled_quantity, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_posts_ignored_while_position_open() {
        let mut exchange = MockExchangeClient::new();
        exchange.expect_free_balances().never();
        exchange.expect_submit_order().never();

        let manager = PositionManager::new(config(), Arc::new(exchange));
        let mut state = PositionState::new();
        state.enter(entry_time(), dec!(400), "first");

        let outcome = manager
            .handle_event(&mut state, &FeedEvent::post("alice", "more DOGE"))
            .await;

        assert_eq!(outcome, EntryOutcome::PositionOpen);
        assert_eq!(state.trigger_text, "first");
    }

    #[tokio::test]
    async fn test_exit_not_due_before_deadline_and_due_at_deadline() {
        let mut exchange = exchange_with(
            vec![AssetBalance::new("USD", dec!(5)), AssetBalance::new("DOGE", dec!(400))],
            dec!(0.25),
        );
        exchange
            .expect_submit_order()
            .withf(|_, request| request.side == Side::Sell && request.amount_value() == dec!(400))
            .times(1)
            .returning(|_, _| Ok(filled(dec!(400))));

        let mut state = PositionState::new();
        state.enter(entry_time(), dec!(400), "DOGE");

        let early = PositionManager::new(config(), Arc::new(MockExchangeClient::new())).with_clock(
            Arc::new(TokioClock::starting_at(
                entry_time() + chrono::Duration::minutes(59) + chrono::Duration::seconds(59),
            )),
        );
        assert!(!early.exit_due(&state));
        assert_eq!(early.poll_exit(&mut state).await, ExitOutcome::NotDue);
        assert!(state.is_exit_pending());

        let on_time = PositionManager::new(config(), Arc::new(exchange)).with_clock(Arc::new(
            TokioClock::starting_at(entry_time() + chrono::Duration::hours(1)),
        ));
        assert!(on_time.exit_due(&state));
        assert!(matches!(
            on_time.poll_exit(&mut state).await,
            ExitOutcome::Exited(_)
        ));
        assert_eq!(state.phase, Phase::EntryPending);
    }

    #[tokio::test]
    async fn test_exit_below_minimum_abandons_and_reopens() {
        let mut exchange = exchange_with(
            vec![AssetBalance::new("USD", dec!(500)), AssetBalance::new("DOGE", dec!(30))],
            dec!(0.25),
        );
        exchange.expect_submit_order().never();

        let manager = PositionManager::new(config(), Arc::new(exchange)).with_clock(Arc::new(
            TokioClock::starting_at(entry_time() + chrono::Duration::hours(2)),
        ));
        let mut state = PositionState::new();
        state.enter(entry_time(), dec!(30), "DOGE");

        let outcome = manager.poll_exit(&mut state).await;

        assert_eq!(
            outcome,
            ExitOutcome::InsufficientFunds(InsufficientFundsReason::BelowMinimumOrder {
                value: dec!(7.5),
                minimum: dec!(10),
            })
        );
        assert_eq!(state.phase, Phase::EntryPending);
    }

    #[tokio::test]
    async fn test_failed_sell_still_reopens() {
        let mut exchange = exchange_with(
            vec![AssetBalance::new("USD", dec!(5)), AssetBalance::new("DOGE", dec!(400))],
            dec!(0.25),
        );
        exchange
            .expect_submit_order()
            .returning(|_, _| Err(ClientError::OrderSubmission("LOT_SIZE".into())));

        let manager = PositionManager::new(config(), Arc::new(exchange)).with_clock(Arc::new(
            TokioClock::starting_at(entry_time() + chrono::Duration::hours(2)),
        ));
        let mut state = PositionState::new();
        state.enter(entry_time(), dec!(400), "DOGE");

        assert_eq!(manager.poll_exit(&mut state).await, ExitOutcome::SubmissionFailed);
        assert_eq!(state.phase, Phase::EntryPending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_timer_fires_at_first_poll_after_deadline() {
        let mut config = config();
        config.holding_hours = 10.0 / 3600.0;

        let mut exchange = exchange_with(
            vec![AssetBalance::new("USD", dec!(5)), AssetBalance::new("DOGE", dec!(400))],
            dec!(0.25),
        );
        exchange
            .expect_submit_order()
            .times(1)
            .returning(|_, _| Ok(filled(dec!(400))));

        let clock = Arc::new(TokioClock::starting_at(entry_time()));
        let manager = PositionManager::new(config, Arc::new(exchange)).with_clock(clock.clone());
        let mut state = PositionState::new();
        state.enter(entry_time(), dec!(400), "DOGE");

        let mut timer = manager.exit_timer();
        let outcome = loop {
            timer.tick().await;
            match manager.poll_exit(&mut state).await {
                ExitOutcome::NotDue => continue,
                outcome => break outcome,
            }
        };

        assert!(matches!(outcome, ExitOutcome::Exited(_)));
        assert_eq!(clock.now(), entry_time() + chrono::Duration::seconds(10));
    }

    #[tokio::test]
    async fn test_unbounded_holding_period_enters_without_deadline() {
        let mut exchange = exchange_with(vec![AssetBalance::new("USD", dec!(500))], dec!(0.25));
        exchange
            .expect_submit_order()
            .times(1)
            .returning(|_, _| Ok(filled(dec!(400))));

        let config = TradingConfig::new("alice", "DOGEUSD", dec!(100), 1e12);
        let manager = PositionManager::new(config, Arc::new(exchange)).with_clock(Arc::new(
            TokioClock::starting_at(entry_time() + chrono::Duration::days(365)),
        ));
        let mut state = PositionState::new();

        let outcome = manager
            .handle_event(&mut state, &FeedEvent::post("alice", "DOGE"))
            .await;

        assert!(matches!(outcome, EntryOutcome::Entered(_)));
        assert_eq!(state.phase, Phase::ExitPending);
        assert!(!manager.exit_due(&state));
    }
}
