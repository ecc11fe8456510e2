//! Balance snapshot: holdings valued in the quote currency

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::common::errors::Result;
use crate::common::traits::ExchangeClient;
use crate::common::types::{AssetHolding, BalanceSnapshot};

/// Query every nonzero free balance and price it in `quote_asset`
///
/// The quote currency itself is priced at 1; every other asset `X` is
/// priced from the `X{quote}` symbol. Exchange errors are returned as-is.
#[instrument(skip(exchange))]
pub async fn take_snapshot<E>(exchange: &E, quote_asset: &str) -> Result<BalanceSnapshot>
where
    E: ExchangeClient + ?Sized,
{
    let balances = exchange.free_balances().await?;
    let mut snapshot = BalanceSnapshot::new(quote_asset);

    for balance in balances {
        if balance.free <= Decimal::ZERO || snapshot.holdings.contains_key(&balance.asset) {
            continue;
        }

        let unit_price = if balance.asset == quote_asset {
            Decimal::ONE
        } else {
            exchange
                .price(&format!("{}{}", balance.asset, quote_asset))
                .await?
        };

        debug!(
            "Holding {} {} @ {} {}",
            balance.free, balance.asset, unit_price, quote_asset
        );
        snapshot
            .holdings
            .insert(balance.asset, AssetHolding::priced(balance.free, unit_price));
    }

    snapshot.taken_at = Utc::now();
    Ok(snapshot)
}
