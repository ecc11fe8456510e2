//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use post_trigger_trader::common::errors::{ClientError, Result};
use post_trigger_trader::common::traits::{EventFeed, ExchangeClient};
use post_trigger_trader::common::types::{AssetBalance, FeedEvent, FeedMessage, OrderResult, Side};
use post_trigger_trader::config::types::TradingConfig;
use post_trigger_trader::engine::types::{TradeAmount, TradeRequest};
use post_trigger_trader::engine::Clock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Fixed starting instant for clock-driven tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// alice / DOGEUSD / 100 USD, held for `holding_secs`
pub fn doge_config(holding_secs: u64) -> TradingConfig {
    TradingConfig::new("alice", "DOGEUSD", dec!(100), holding_secs as f64 / 3600.0)
}

pub fn alice_post(text: &str) -> FeedMessage {
    FeedMessage::Post(FeedEvent::post("alice", text))
}

/// An order the fake exchange accepted
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOrder {
    pub symbol: String,
    pub request: TradeRequest,
    pub at: DateTime<Utc>,
}

/// In-memory exchange that fills market orders at fixed prices
///
/// Balances move with every fill so a buy followed by a sell can be checked
/// end to end.
pub struct FakeExchange {
    quote_asset: String,
    balances: Mutex<HashMap<String, Decimal>>,
    prices: HashMap<String, Decimal>,
    orders: Mutex<Vec<RecordedOrder>>,
    clock: Arc<dyn Clock>,
    reject_orders: AtomicBool,
    next_id: AtomicU64,
}

impl FakeExchange {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            quote_asset: "USD".to_string(),
            balances: Mutex::new(HashMap::new()),
            prices: HashMap::new(),
            orders: Mutex::new(Vec::new()),
            clock,
            reject_orders: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_balance(self, asset: &str, amount: Decimal) -> Self {
        self.balances
            .lock()
            .unwrap()
            .insert(asset.to_string(), amount);
        self
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances
            .lock()
            .unwrap()
            .get(asset)
            .copied()
            .unwrap_or_default()
    }

    pub fn orders(&self) -> Vec<RecordedOrder> {
        self.orders.lock().unwrap().clone()
    }

    fn adjust(&self, asset: &str, delta: Decimal) {
        let mut balances = self.balances.lock().unwrap();
        *balances.entry(asset.to_string()).or_default() += delta;
    }
}

#[async_trait]
impl ExchangeClient for FakeExchange {
    async fn free_balances(&self) -> Result<Vec<AssetBalance>> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .iter()
            .map(|(asset, free)| AssetBalance::new(asset.clone(), *free))
            .collect())
    }

    async fn price(&self, symbol: &str) -> Result<Decimal> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| ClientError::InvalidResponse(format!("Invalid symbol {}", symbol)))
    }

    async fn submit_order(&self, symbol: &str, request: &TradeRequest) -> Result<OrderResult> {
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(ClientError::OrderSubmission("rejected".to_string()));
        }
        let price = self.price(symbol).await?;

        let quantity = match (request.side, request.amount) {
            (Side::Buy, TradeAmount::Notional(notional)) => {
                let quantity = notional / price;
                self.adjust(&self.quote_asset, -notional);
                self.adjust(&request.asset, quantity);
                quantity
            }
            (Side::Sell, TradeAmount::Quantity(quantity)) => {
                self.adjust(&request.asset, -quantity);
                self.adjust(&self.quote_asset, quantity * price);
                quantity
            }
            (side, amount) => {
                return Err(ClientError::OrderSubmission(format!(
                    "unsupported {} sized by {:?}",
                    side, amount
                )))
            }
        };

        let now = self.clock.now();
        self.orders.lock().unwrap().push(RecordedOrder {
            symbol: symbol.to_string(),
            request: request.clone(),
            at: now,
        });

        Ok(OrderResult {
            order_id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            fill_time: Some(now),
            filled_quantity: quantity,
            confirmed_filled: true,
        })
    }

    fn venue_name(&self) -> &'static str {
        "Fake"
    }
}

/// What one call to [`ScriptedFeed::connect`] does
#[derive(Debug)]
pub enum Session {
    /// Fail the connection attempt
    Refuse(&'static str),
    /// Deliver the messages and keep the stream open
    Deliver(Vec<FeedMessage>),
    /// Deliver the messages, then close the stream
    DeliverThenDrop(Vec<FeedMessage>),
}

/// Feed that plays back one scripted session per connect
///
/// Once the script runs out, connections succeed and stay silent.
pub struct ScriptedFeed {
    sessions: VecDeque<Session>,
    connects: AtomicUsize,
    held: Option<mpsc::Sender<FeedMessage>>,
    connected: bool,
}

impl ScriptedFeed {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: sessions.into(),
            connects: AtomicUsize::new(0),
            held: None,
            connected: false,
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventFeed for ScriptedFeed {
    async fn connect(&mut self, sender: mpsc::Sender<FeedMessage>) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let (messages, keep_open) = match self.sessions.pop_front() {
            Some(Session::Refuse(reason)) => {
                return Err(ClientError::FeedConnection(reason.to_string()))
            }
            Some(Session::Deliver(messages)) => (messages, true),
            Some(Session::DeliverThenDrop(messages)) => (messages, false),
            None => (Vec::new(), true),
        };

        for message in messages {
            sender
                .send(message)
                .await
                .map_err(|e| ClientError::ChannelSend(e.to_string()))?;
        }
        if keep_open {
            self.held = Some(sender);
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.held = None;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn feed_name(&self) -> &'static str {
        "Scripted"
    }
}

/// Sample post stream payloads
pub mod stream_messages {
    pub const ALICE_DOGE: &str = r#"{
        "id_str": "1764000000000000001",
        "text": "Buying $DOGE today",
        "user": {"screen_name": "alice", "id_str": "11"},
        "retweeted_status": null,
        "in_reply_to_status_id": null,
        "in_reply_to_screen_name": null,
        "in_reply_to_user_id": null
    }"#;

    pub const BOB_DOGE: &str = r#"{
        "text": "Buying $DOGE today",
        "user": {"screen_name": "bob"}
    }"#;

    pub const ALICE_REPLY: &str = r#"{
        "text": "@carol doge!",
        "user": {"screen_name": "alice"},
        "in_reply_to_status_id": 1764000000000000000,
        "in_reply_to_screen_name": "carol",
        "in_reply_to_user_id": 42
    }"#;
}

/// Sample exchange API responses
pub mod api_responses {
    pub const ACCOUNT: &str = r#"{
        "makerCommission": 10,
        "canTrade": true,
        "balances": [
            {"asset": "USD", "free": "500.00", "locked": "0.00"},
            {"asset": "DOGE", "free": "0.00000000", "locked": "0.00000000"},
            {"asset": "BNB", "free": "0.50000000", "locked": "0.00000000"}
        ]
    }"#;

    pub const BNB_PRICE: &str = r#"{"symbol": "BNBUSD", "price": "300.0000"}"#;

    pub const DOGE_PRICE: &str = r#"{"symbol": "DOGEUSD", "price": "0.25000000"}"#;

    pub const BUY_FILLED: &str = r#"{
        "symbol": "DOGEUSD",
        "orderId": 5012,
        "orderListId": -1,
        "clientOrderId": "x-1",
        "transactTime": 1709294400000,
        "price": "0.00000000",
        "origQty": "400.00000000",
        "executedQty": "400.00000000",
        "cummulativeQuoteQty": "100.0000",
        "status": "FILLED",
        "timeInForce": "GTC",
        "type": "MARKET",
        "side": "BUY",
        "fills": [
            {"price": "0.2500", "qty": "400.00000000", "commission": "0.00033333", "commissionAsset": "BNB"}
        ]
    }"#;

    pub const MIN_NOTIONAL_REJECTED: &str =
        r#"{"code": -1013, "msg": "Filter failure: MIN_NOTIONAL"}"#;
}
