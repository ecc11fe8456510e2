//! PostTriggerTrader Library
//!
//! Watches a post stream for a tracked account mentioning an asset, buys a
//! fixed notional of it on the exchange, and sells the filled quantity after
//! a fixed holding period.

pub mod common;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod feed;

// Re-export commonly used types
pub use common::errors::{ClientError, Result};
pub use common::traits::{EventFeed, ExchangeClient};
pub use common::types::{
    AssetBalance, BalanceSnapshot, ConnectionStatus, FeedEvent, FeedMessage, OrderResult, Side,
};
pub use config::types::{AppConfig, TradingConfig};
pub use engine::{PositionManager, PositionState, Supervisor};
pub use exchange::{BinanceClient, BinanceRestClient};
pub use feed::PostStreamClient;
