//! Unified types shared by the adapters and the engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Free balance of one asset as reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    /// Asset symbol (e.g. "DOGE", "USD")
    pub asset: String,
    /// Amount available for trading
    pub free: Decimal,
}

impl AssetBalance {
    /// Create a new asset balance
    pub fn new(asset: impl Into<String>, free: Decimal) -> Self {
        Self {
            asset: asset.into(),
            free,
        }
    }
}

/// One held asset, valued in the quote currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHolding {
    /// Free amount held
    pub amount: Decimal,
    /// Quote-currency value (`unit_price * amount`)
    pub quote_value: Decimal,
    /// Price of one unit in the quote currency
    pub unit_price: Decimal,
}

impl AssetHolding {
    /// Build a holding from an amount and its unit price
    pub fn priced(amount: Decimal, unit_price: Decimal) -> Self {
        Self {
            amount,
            quote_value: amount * unit_price,
            unit_price,
        }
    }
}

/// Point-in-time view of account holdings
///
/// Taken fresh before every sizing decision and never reused across decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Quote currency every value is denominated in
    pub quote_asset: String,
    /// Holdings keyed by asset symbol
    pub holdings: HashMap<String, AssetHolding>,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Create an empty snapshot for a quote currency
    pub fn new(quote_asset: impl Into<String>) -> Self {
        Self {
            quote_asset: quote_asset.into(),
            holdings: HashMap::new(),
            taken_at: Utc::now(),
        }
    }

    /// Add or replace a holding
    pub fn with_holding(mut self, asset: impl Into<String>, holding: AssetHolding) -> Self {
        self.holdings.insert(asset.into(), holding);
        self
    }

    /// Holding for an asset, if held
    pub fn holding(&self, asset: &str) -> Option<&AssetHolding> {
        self.holdings.get(asset)
    }

    /// Free amount of an asset (zero when not held)
    pub fn amount(&self, asset: &str) -> Decimal {
        self.holding(asset).map(|h| h.amount).unwrap_or_default()
    }

    /// Quote value of an asset (zero when not held)
    pub fn quote_value(&self, asset: &str) -> Decimal {
        self.holding(asset).map(|h| h.quote_value).unwrap_or_default()
    }

    /// Unit price of an asset (zero when not held)
    pub fn unit_price(&self, asset: &str) -> Decimal {
        self.holding(asset).map(|h| h.unit_price).unwrap_or_default()
    }

    /// Free quote currency
    pub fn quote_balance(&self) -> Decimal {
        self.amount(&self.quote_asset)
    }

    /// Number of assets held
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// Check if nothing is held
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// Outcome of an accepted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Exchange-assigned order ID
    pub order_id: String,
    /// Exchange transaction time, when reported
    pub fill_time: Option<DateTime<Utc>>,
    /// Base-asset quantity executed
    pub filled_quantity: Decimal,
    /// Whether the exchange reported the order fully filled
    pub confirmed_filled: bool,
}

impl OrderResult {
    /// An accepted order whose fill details are unknown
    pub fn unconfirmed(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            fill_time: None,
            filled_quantity: Decimal::ZERO,
            confirmed_filled: false,
        }
    }
}

/// A post delivered by the event feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// Account that authored the post
    pub account: Option<String>,
    /// Post content; `None` when the payload carried no text
    pub text: Option<String>,
    /// Whether this is a repost of someone else's post
    pub is_repost: bool,
    /// Status the post replies to
    pub reply_to_status_id: Option<String>,
    /// Account the post replies to
    pub reply_to_account: Option<String>,
    /// User ID the post replies to
    pub reply_to_user_id: Option<String>,
}

impl FeedEvent {
    /// Create an original (non-repost, non-reply) post
    pub fn post(account: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Returns true if any reply indicator is set
    pub fn is_reply(&self) -> bool {
        self.reply_to_status_id.is_some()
            || self.reply_to_account.is_some()
            || self.reply_to_user_id.is_some()
    }
}

/// Connection status for a feed client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Successfully connected
    Connected,
    /// Disconnected (with optional reason)
    Disconnected(Option<String>),
    /// Connection error
    Error(String),
}

/// Message forwarded by a feed client to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedMessage {
    /// A post from the followed account(s)
    Post(FeedEvent),
    /// Connection status change
    Status(ConnectionStatus),
    /// Heartbeat/ping response
    Heartbeat,
    /// Raw/unknown message (for debugging)
    Raw(String),
}
