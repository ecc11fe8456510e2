//! Binance.US REST payloads

use serde::{Deserialize, Serialize};

/// `GET /api/v3/account`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(default)]
    pub can_trade: Option<bool>,
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: String,
    #[serde(default)]
    pub locked: String,
}

/// `GET /api/v3/ticker/price`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    pub price: String,
}

/// `POST /api/v3/order` with `newOrderRespType=FULL`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Milliseconds since epoch
    #[serde(default)]
    pub transact_time: Option<i64>,
    #[serde(default)]
    pub executed_qty: Option<String>,
    // sic, the API spells it this way
    #[serde(default, rename = "cummulativeQuoteQty")]
    pub cumulative_quote_qty: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fills: Vec<FillEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillEntry {
    pub price: String,
    pub qty: String,
    #[serde(default)]
    pub commission: Option<String>,
    #[serde(default)]
    pub commission_asset: Option<String>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_order_response() {
        let json = r#"{
            "symbol": "DOGEUSD",
            "orderId": 28,
            "orderListId": -1,
            "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
            "transactTime": 1507725176595,
            "price": "0.0000",
            "origQty": "400.00",
            "executedQty": "400.00",
            "cummulativeQuoteQty": "99.90",
            "status": "FILLED",
            "type": "MARKET",
            "side": "BUY",
            "fills": [
                {"price": "0.2497", "qty": "400.00", "commission": "0.0003", "commissionAsset": "BNB"}
            ]
        }"#;

        let order: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, 28);
        assert_eq!(order.transact_time, Some(1507725176595));
        assert_eq!(order.executed_qty.as_deref(), Some("400.00"));
        assert_eq!(order.cumulative_quote_qty.as_deref(), Some("99.90"));
        assert_eq!(order.fills.len(), 1);
        assert_eq!(order.fills[0].commission_asset.as_deref(), Some("BNB"));
    }

    #[test]
    fn test_parse_account_without_locked() {
        let json = r#"{"canTrade": true, "balances": [{"asset": "USD", "free": "250.5"}]}"#;
        let account: AccountResponse = serde_json::from_str(json).unwrap();
        assert_eq!(account.can_trade, Some(true));
        assert_eq!(account.balances[0].free, "250.5");
        assert!(account.balances[0].locked.is_empty());
    }
}
