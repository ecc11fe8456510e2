//! Error types for the application

use thiserror::Error;

/// Result type alias using our ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Main error type for adapter and engine operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Feed connection could not be established
    #[error("Feed connection error: {0}")]
    FeedConnection(String),

    /// Feed dropped or errored while streaming
    #[error("Feed communication error: {0}")]
    FeedCommunication(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}, retry after {retry_after_seconds:?} seconds")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Exchange rejected or failed an order
    #[error("Order submission error: {0}")]
    OrderSubmission(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential file could not be read or parsed
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Channel send errors
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Errors the supervisor recovers from by reconnecting the feed
    pub fn is_feed_failure(&self) -> bool {
        matches!(
            self,
            ClientError::FeedConnection(_)
                | ClientError::FeedCommunication(_)
                | ClientError::Authentication(_)
                | ClientError::RateLimit { .. }
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::FeedCommunication(err.to_string())
    }
}
