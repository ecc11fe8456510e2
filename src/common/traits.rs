//! Trait definitions for the exchange and event-feed collaborators

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use super::errors::Result;
use super::types::{AssetBalance, FeedMessage, OrderResult};
use crate::engine::types::TradeRequest;

/// Trait for spot exchange clients
///
/// The engine only needs balances, prices and market orders; everything
/// else about the venue stays behind this boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Every asset with a nonzero free balance
    async fn free_balances(&self) -> Result<Vec<AssetBalance>>;

    /// Last price for a trading symbol (e.g. "DOGEUSD")
    async fn price(&self, symbol: &str) -> Result<Decimal>;

    /// Submit a MARKET order for a trading symbol
    ///
    /// BUY requests carry a quote notional, SELL requests a base quantity.
    async fn submit_order(&self, symbol: &str, request: &TradeRequest) -> Result<OrderResult>;

    /// Get the name of the venue
    fn venue_name(&self) -> &'static str;
}

/// Trait for post stream clients
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Open the stream and start forwarding messages to the channel
    ///
    /// Returns once the connection is established; messages then arrive
    /// from an internal task until the stream ends.
    async fn connect(&mut self, sender: mpsc::Sender<FeedMessage>) -> Result<()>;

    /// Gracefully disconnect from the stream
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if the client is currently connected
    fn is_connected(&self) -> bool;

    /// Get the name of the feed
    fn feed_name(&self) -> &'static str;
}
