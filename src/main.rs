//! PostTriggerTrader - Main Entry Point
//!
//! Buys an asset when a tracked account posts about it, then sells after a
//! fixed holding period.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use post_trigger_trader::common::traits::ExchangeClient;
use post_trigger_trader::config::{
    load_config_with_overrides, load_exchange_credentials, load_feed_credentials,
};
use post_trigger_trader::engine::{PositionManager, PositionState, Supervisor};
use post_trigger_trader::exchange::BinanceClient;
use post_trigger_trader::feed::PostStreamClient;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides settings.log_level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Account whose posts trigger a buy
    #[arg(short = 'u', long, env = "TRACKED_ACCOUNT")]
    username: Option<String>,

    /// Symbol to trade, e.g. DOGEUSD
    #[arg(short, long, env = "TICKER")]
    ticker: Option<String>,

    /// Quote-currency amount to spend per buy
    #[arg(short = 'd', long, env = "AMOUNT_TO_TRADE_USD")]
    amount_to_trade_usd: Option<String>,

    /// Hours to hold before selling
    #[arg(short = 's', long, env = "SELL_TIME")]
    sell_time: Option<f64>,

    /// JSON file with the post stream API keys
    #[arg(long, env = "TWITTER_API_KEYS_FILE")]
    twitter_api_keys_file: Option<String>,

    /// JSON file with the exchange API keys
    #[arg(long, env = "BINANCE_US_API_KEYS_FILE")]
    binance_us_api_keys_file: Option<String>,
}

impl Args {
    /// Command-line values as config overrides
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(v) = &self.username {
            overrides.push(("trading.tracked_account", v.clone()));
        }
        if let Some(v) = &self.ticker {
            overrides.push(("trading.ticker", v.clone()));
        }
        if let Some(v) = &self.amount_to_trade_usd {
            overrides.push(("trading.notional", v.clone()));
        }
        if let Some(v) = self.sell_time {
            overrides.push(("trading.holding_hours", v.to_string()));
        }
        if let Some(v) = &self.twitter_api_keys_file {
            overrides.push(("feed.credentials_file", v.clone()));
        }
        if let Some(v) = &self.binance_us_api_keys_file {
            overrides.push(("exchange.credentials_file", v.clone()));
        }
        if let Some(v) = &self.log_level {
            overrides.push(("settings.log_level", v.clone()));
        }
        overrides
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = load_config_with_overrides(Some(&args.config), &args.overrides())
        .context("Failed to load configuration")?;

    init_logging(&config.settings.log_level)?;

    info!("Starting PostTriggerTrader");
    info!("Configuration file: {}", args.config);
    info!(
        "Watching @{} for {:?}, trading {} {} of {}, holding {}h",
        config.trading.tracked_account,
        config.trading.keyword(),
        config.trading.notional,
        config.trading.quote_asset,
        config.trading.symbol(),
        config.trading.holding_hours
    );

    let exchange_keys = config
        .exchange
        .credentials_file
        .as_deref()
        .context("No exchange key file given (--binance-us-api-keys-file)")?;
    let exchange_credentials = load_exchange_credentials(exchange_keys)?;

    let feed_credentials = match config.feed.credentials_file.as_deref() {
        Some(path) => Some(load_feed_credentials(path)?),
        None => {
            warn!("No post stream key file given, subscribing without auth");
            None
        }
    };

    let exchange: Arc<dyn ExchangeClient> = Arc::new(BinanceClient::new(
        &config.exchange,
        exchange_credentials,
        Duration::from_secs(config.settings.request_timeout_seconds),
    )?);
    info!("Trading on {}", exchange.venue_name());

    let mut feed = PostStreamClient::new(
        &config.feed.websocket_url,
        vec![config.trading.tracked_account.clone()],
    )
    .with_heartbeat_interval(config.settings.heartbeat_interval_seconds)
    .with_connect_timeout(Duration::from_secs(config.feed.connect_timeout_seconds));
    if let Some(credentials) = feed_credentials {
        feed = feed.with_credentials(credentials);
    }

    let manager = PositionManager::new(config.trading.clone(), exchange);
    let mut supervisor = Supervisor::new(feed, manager)
        .with_reconnect_delay(Duration::from_millis(config.settings.reconnect_delay_ms))
        .with_max_reconnect_attempts(config.settings.max_reconnect_attempts);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            // dropping the sender would read as a shutdown
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
        let _ = shutdown_tx.send(true);
    });

    let mut state = PositionState::new();
    supervisor.run(&mut state, shutdown_rx).await?;

    if state.is_exit_pending() {
        warn!(
            "Shutting down with an open position: {} {} bought at {:?}",
            state.filled_quantity,
            config.trading.base_asset(),
            state.entry_time
        );
    }

    Ok(())
}
