//! Application configuration

pub mod loader;
pub mod types;

pub use loader::{
    load_config, load_config_with_overrides, load_exchange_credentials, load_feed_credentials,
};
pub use types::{
    AppConfig, AppSettings, ExchangeConfig, ExchangeCredentials, FeedConfig, FeedCredentials,
    TradingConfig,
};
