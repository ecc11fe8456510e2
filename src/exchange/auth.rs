//! Request signing for the Binance.US REST API

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::form_urlencoded;

use crate::common::errors::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of the full query string
pub fn sign_query(secret: &str, query: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ClientError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a signed query string
///
/// `recvWindow` and `timestamp` are appended to `params`, then the
/// signature over everything before it.
pub fn signed_query(
    secret: &str,
    params: &[(&str, String)],
    recv_window_ms: u64,
    timestamp_ms: i64,
) -> Result<String> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("recvWindow", &recv_window_ms.to_string());
    serializer.append_pair("timestamp", &timestamp_ms.to_string());
    let query = serializer.finish();

    let signature = sign_query(secret, &query)?;
    Ok(format!("{}&signature={}", query, signature))
}
