//! Post stream message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authentication payload for the subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsAuth {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub timestamp: i64,
    pub signature: String,
}

/// Subscribe message sent right after connecting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSubscribeMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    /// Accounts whose posts should be delivered
    pub follow: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<WsAuth>,
}

impl WsSubscribeMessage {
    pub fn subscribe(follow: Vec<String>, auth: Option<WsAuth>) -> Self {
        Self {
            message_type: "subscribe".to_string(),
            follow,
            auth,
        }
    }
}

/// Post author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default)]
    pub id_str: Option<String>,
}

/// Long-form text container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub full_text: Option<String>,
}

/// A status (post) as delivered on the stream
///
/// Reply ids may arrive as numbers or strings, so they are kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub extended_tweet: Option<ExtendedText>,
    #[serde(default)]
    pub retweeted_status: Option<Value>,
    #[serde(default)]
    pub in_reply_to_status_id: Option<Value>,
    #[serde(default)]
    pub in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    pub in_reply_to_user_id: Option<Value>,
}

/// Server-initiated disconnect notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectNotice {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}
