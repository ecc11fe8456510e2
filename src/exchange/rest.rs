//! REST API client for Binance.US spot

use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::auth::signed_query;
use super::messages::*;
use crate::common::errors::{ClientError, Result};
use crate::common::types::Side;
use crate::config::types::ExchangeCredentials;
use crate::engine::types::TradeAmount;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// REST API client for Binance.US
#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for the REST API
    base_url: String,
    /// API keys for signed endpoints
    credentials: Option<ExchangeCredentials>,
    /// Validity window sent with signed requests
    recv_window_ms: u64,
}

impl BinanceRestClient {
    /// Create a new REST client (unauthenticated)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
            recv_window_ms: 5000,
        })
    }

    /// Set API credentials for signed requests
    pub fn with_credentials(mut self, credentials: ExchangeCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Signed query string plus the API key to send with it
    fn sign(&self, params: &[(&str, String)]) -> Result<(String, &str)> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            ClientError::Authentication("No exchange API credentials configured".to_string())
        })?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let query = signed_query(&creds.api_secret, params, self.recv_window_ms, timestamp)?;
        Ok((query, creds.api_key.as_str()))
    }

    /// Free and locked balances of every asset on the account
    #[instrument(skip(self))]
    pub async fn get_account(&self) -> Result<AccountResponse> {
        let (query, api_key) = self.sign(&[])?;
        let url = format!("{}/api/v3/account?{}", self.base_url, query);
        debug!("Fetching account from: {}/api/v3/account", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = check_status(response, false).await?;

        let account: AccountResponse = response.json().await?;
        Ok(account)
    }

    /// Latest price for a symbol
    #[instrument(skip(self))]
    pub async fn get_price(&self, symbol: &str) -> Result<Decimal> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);
        debug!("Fetching price from: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, false).await?;

        let ticker: TickerPriceResponse = response.json().await?;
        ticker
            .price
            .parse()
            .map_err(|e| ClientError::InvalidResponse(format!("Invalid price: {}", e)))
    }

    /// Place a market order
    ///
    /// Buys are sized in quote currency (`quoteOrderQty`), sells in base
    /// quantity (`quantity`). Once the exchange has answered 2xx the order
    /// exists, so an unreadable body yields `Ok(None)` rather than an error.
    #[instrument(skip(self))]
    pub async fn create_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: TradeAmount,
    ) -> Result<Option<OrderResponse>> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("type", "MARKET".to_string()),
        ];
        match amount {
            TradeAmount::Notional(notional) => {
                params.push(("quoteOrderQty", notional.normalize().to_string()))
            }
            TradeAmount::Quantity(quantity) => {
                params.push(("quantity", quantity.normalize().to_string()))
            }
        }
        params.push(("newOrderRespType", "FULL".to_string()));

        let (query, api_key) = self.sign(&params)?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);
        debug!("Submitting {} {} market order", side, symbol);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = check_status(response, true).await?;

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("{} {} order accepted but body unreadable: {}", side, symbol, e);
                return Ok(None);
            }
        };
        match serde_json::from_str::<OrderResponse>(&body) {
            Ok(order) => Ok(Some(order)),
            Err(e) => {
                warn!(
                    "{} {} order accepted but response undecodable: {} - {}",
                    side, symbol, e, body
                );
                Ok(None)
            }
        }
    }
}

/// Pass through 2xx responses, map everything else to a `ClientError`
async fn check_status(response: Response, is_order: bool) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, retry_after, &body, is_order))
}

fn status_error(
    status: StatusCode,
    retry_after_seconds: Option<u64>,
    body: &str,
    is_order: bool,
) -> ClientError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) => format!("{} (code {})", err.msg, err.code),
        Err(_) => body.to_string(),
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::IM_A_TEAPOT => ClientError::RateLimit {
            message,
            retry_after_seconds,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClientError::Authentication(format!("Server returned status {}: {}", status, message))
        }
        _ if is_order => {
            ClientError::OrderSubmission(format!("Server returned status {}: {}", status, message))
        }
        _ => ClientError::InvalidResponse(format!("Server returned status {}: {}", status, message)),
    }
}
