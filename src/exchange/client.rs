//! Binance.US exchange adapter

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::messages::OrderResponse;
use super::rest::BinanceRestClient;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::ExchangeClient;
use crate::common::types::{AssetBalance, OrderResult};
use crate::config::types::{ExchangeConfig, ExchangeCredentials};
use crate::engine::types::TradeRequest;

/// [`ExchangeClient`] backed by the Binance.US REST API
pub struct BinanceClient {
    rest_client: BinanceRestClient,
}

impl BinanceClient {
    pub fn new(
        config: &ExchangeConfig,
        credentials: ExchangeCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let rest_client = BinanceRestClient::with_timeout(&config.rest_url, timeout)?
            .with_credentials(credentials)
            .with_recv_window(config.recv_window_ms);
        Ok(Self { rest_client })
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn free_balances(&self) -> Result<Vec<AssetBalance>> {
        let account = self.rest_client.get_account().await?;
        account
            .balances
            .into_iter()
            .map(|entry| {
                let free: Decimal = entry.free.parse().map_err(|e| {
                    ClientError::InvalidResponse(format!(
                        "Invalid free balance for {}: {}",
                        entry.asset, e
                    ))
                })?;
                Ok(AssetBalance::new(entry.asset, free))
            })
            .collect()
    }

    async fn price(&self, symbol: &str) -> Result<Decimal> {
        self.rest_client.get_price(symbol).await
    }

    #[instrument(skip(self))]
    async fn submit_order(&self, symbol: &str, request: &TradeRequest) -> Result<OrderResult> {
        let result = match self
            .rest_client
            .create_market_order(symbol, request.side, request.amount)
            .await?
        {
            Some(response) => convert_order_response(response),
            None => OrderResult::unconfirmed("unknown"),
        };
        info!(
            "{} {} order {} executed {} (filled: {})",
            request.side, symbol, result.order_id, result.filled_quantity, result.confirmed_filled
        );
        Ok(result)
    }

    fn venue_name(&self) -> &'static str {
        "Binance.US"
    }
}

/// Map the exchange's order response to the engine's view of a fill
///
/// Fields that do not parse degrade to an unconfirmed fill; the order was
/// accepted either way.
fn convert_order_response(response: OrderResponse) -> OrderResult {
    let order_id = response.order_id.to_string();
    let fill_time = response
        .transact_time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    if response.transact_time.is_some() && fill_time.is_none() {
        warn!("Order {} has out-of-range transactTime", order_id);
    }

    let filled_quantity = match response.executed_qty.as_deref() {
        Some(qty) => match qty.parse::<Decimal>() {
            Ok(qty) => qty,
            Err(e) => {
                warn!("Order {} has invalid executedQty {:?}: {}", order_id, qty, e);
                return OrderResult::unconfirmed(order_id);
            }
        },
        None => Decimal::ZERO,
    };

    OrderResult {
        order_id,
        fill_time,
        filled_quantity,
        confirmed_filled: response.status.as_deref() == Some("FILLED"),
    }
}
