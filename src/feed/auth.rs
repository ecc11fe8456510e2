//! Authentication for the post stream subscription

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::messages::WsAuth;
use crate::common::errors::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Path the subscription signature is computed over
pub const STREAM_PATH: &str = "/stream";

/// Generate a base64 HMAC-SHA256 signature
///
/// The signed message is `timestamp + METHOD + path`.
pub fn sign_request(secret: &str, timestamp: i64, method: &str, request_path: &str) -> Result<String> {
    let message = format!("{}{}{}", timestamp, method.to_uppercase(), request_path);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ClientError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Build the auth block sent with the subscribe message
pub fn generate_stream_auth(api_key: &str, api_secret: &str) -> Result<WsAuth> {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign_request(api_secret, timestamp, "GET", STREAM_PATH)?;

    Ok(WsAuth {
        api_key: api_key.to_string(),
        timestamp,
        signature,
    })
}
