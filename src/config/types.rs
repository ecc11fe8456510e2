//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// What to watch for and how much to trade
    pub trading: TradingConfig,
    /// Exchange-specific configuration
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Event feed configuration
    #[serde(default)]
    pub feed: FeedConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Longest accepted holding period (ten years)
pub const MAX_HOLDING_HOURS: f64 = 24.0 * 365.0 * 10.0;

/// Trade trigger and sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Account whose posts trigger a buy
    pub tracked_account: String,
    /// Trading symbol, base asset followed by the quote asset (e.g. "DOGEUSD")
    pub ticker: String,
    /// Quote-currency amount spent on each buy
    pub notional: Decimal,
    /// Hours to hold the position before selling
    pub holding_hours: f64,
    /// Quote currency notionals are denominated in
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Asset whose value may cover fees instead of quote currency
    #[serde(default = "default_discount_asset")]
    pub discount_asset: String,
    /// Fraction of the notional reserved for fees
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Smallest quote value the exchange accepts for an order
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,
    /// How often the exit timer is re-checked, in milliseconds
    #[serde(default = "default_exit_poll_interval")]
    pub exit_poll_interval_ms: u64,
}

impl TradingConfig {
    /// Create a trading config with default fee and polling settings
    pub fn new(
        tracked_account: impl Into<String>,
        ticker: impl Into<String>,
        notional: Decimal,
        holding_hours: f64,
    ) -> Self {
        Self {
            tracked_account: tracked_account.into(),
            ticker: ticker.into(),
            notional,
            holding_hours,
            quote_asset: default_quote_asset(),
            discount_asset: default_discount_asset(),
            fee_rate: default_fee_rate(),
            min_order_notional: default_min_order_notional(),
            exit_poll_interval_ms: default_exit_poll_interval(),
        }
    }

    /// Base asset of the ticker, i.e. the ticker with the quote suffix removed
    pub fn base_asset(&self) -> String {
        let ticker = self.ticker.to_uppercase();
        let quote = self.quote_asset.to_uppercase();
        match ticker.strip_suffix(&quote) {
            Some(base) if !base.is_empty() => base.to_string(),
            _ => ticker,
        }
    }

    /// Lowercase keyword a post must contain to qualify
    pub fn keyword(&self) -> String {
        self.base_asset().to_lowercase()
    }

    /// Trading symbol as sent to the exchange
    pub fn symbol(&self) -> String {
        self.ticker.to_uppercase()
    }

    /// Holding duration between entry and exit
    pub fn holding_duration(&self) -> chrono::Duration {
        let millis = (self.holding_hours * 3_600_000.0).round().max(0.0);
        chrono::Duration::milliseconds(millis as i64)
    }

    /// Exit timer poll interval
    pub fn exit_poll_interval(&self) -> Duration {
        Duration::from_millis(self.exit_poll_interval_ms)
    }

    /// Check the values that would make the engine misbehave
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tracked_account.trim().is_empty() {
            return Err("tracked_account must not be empty".to_string());
        }
        if self.base_asset() == self.symbol() {
            return Err(format!(
                "ticker {} does not end with quote asset {}",
                self.ticker, self.quote_asset
            ));
        }
        if self.notional <= Decimal::ZERO {
            return Err(format!("notional must be positive, got {}", self.notional));
        }
        if !self.holding_hours.is_finite() || self.holding_hours < 0.0 {
            return Err(format!(
                "holding_hours must be a non-negative number, got {}",
                self.holding_hours
            ));
        }
        if self.holding_hours > MAX_HOLDING_HOURS {
            return Err(format!(
                "holding_hours must be at most {}, got {}",
                MAX_HOLDING_HOURS, self.holding_hours
            ));
        }
        if self.exit_poll_interval_ms == 0 {
            return Err("exit_poll_interval_ms must be positive".to_string());
        }
        Ok(())
    }
}

fn default_quote_asset() -> String {
    "USD".to_string()
}

fn default_discount_asset() -> String {
    "BNB".to_string()
}

fn default_fee_rate() -> Decimal {
    dec!(0.001)
}

fn default_min_order_notional() -> Decimal {
    dec!(10)
}

fn default_exit_poll_interval() -> u64 {
    1000
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Base URL for the REST API
    #[serde(default = "default_exchange_rest_url")]
    pub rest_url: String,
    /// Path to JSON file holding the exchange API keys
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// Signed request validity window in milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_url: default_exchange_rest_url(),
            credentials_file: None,
            recv_window_ms: default_recv_window(),
        }
    }
}

fn default_exchange_rest_url() -> String {
    "https://api.binance.us".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

/// Event feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket URL for the post stream
    #[serde(default = "default_feed_ws_url")]
    pub websocket_url: String,
    /// Path to JSON file holding the feed API keys
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// WebSocket handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            websocket_url: default_feed_ws_url(),
            credentials_file: None,
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_feed_ws_url() -> String {
    "wss://stream.example-posts.com".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Maximum consecutive reconnection attempts (0 = infinite)
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Heartbeat/ping interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: 0,
            heartbeat_interval_seconds: default_heartbeat_interval(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_heartbeat_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

/// Exchange API credentials
#[derive(Clone, Deserialize)]
pub struct ExchangeCredentials {
    #[serde(rename = "binance_api_key")]
    pub api_key: String,
    #[serde(rename = "binance_api_secret_key")]
    pub api_secret: String,
}

impl ExchangeCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// Event feed API credentials
#[derive(Clone, Deserialize)]
pub struct FeedCredentials {
    #[serde(rename = "twitter_api_key")]
    pub api_key: String,
    #[serde(rename = "twitter_api_secret_key")]
    pub api_secret: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_secret_token: Option<String>,
}

impl FeedCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            access_token: None,
            access_secret_token: None,
        }
    }
}

impl std::fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}
