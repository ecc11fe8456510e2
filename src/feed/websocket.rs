//! WebSocket client for the post stream

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, instrument, warn};

use super::auth::generate_stream_auth;
use super::messages::*;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::EventFeed;
use crate::common::types::{ConnectionStatus, FeedEvent, FeedMessage};
use crate::config::types::FeedCredentials;

/// Streams posts from the followed accounts
pub struct PostStreamClient {
    /// WebSocket URL
    url: String,
    /// Accounts to follow
    follow: Vec<String>,
    /// Optional API credentials for the subscription
    credentials: Option<FeedCredentials>,
    /// Ping interval in seconds
    heartbeat_interval: u64,
    /// Upper bound on the WebSocket handshake
    connect_timeout: Duration,
    /// Connected state flag
    is_connected: Arc<AtomicBool>,
    /// Stops the reader task
    stop: Option<mpsc::Sender<()>>,
}

impl PostStreamClient {
    pub fn new(url: &str, follow: Vec<String>) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            follow,
            credentials: None,
            heartbeat_interval: 10,
            connect_timeout: Duration::from_secs(10),
            is_connected: Arc::new(AtomicBool::new(false)),
            stop: None,
        }
    }

    pub fn with_credentials(mut self, credentials: FeedCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_interval(mut self, seconds: u64) -> Self {
        self.heartbeat_interval = seconds.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn create_subscribe_message(&self) -> Result<WsSubscribeMessage> {
        let auth = match &self.credentials {
            Some(creds) => Some(generate_stream_auth(&creds.api_key, &creds.api_secret)?),
            None => None,
        };
        Ok(WsSubscribeMessage::subscribe(self.follow.clone(), auth))
    }

    /// Connect, subscribe and spawn the reader task
    #[instrument(skip(self, event_sender), fields(url = %self.url))]
    async fn connect_and_subscribe(&mut self, event_sender: mpsc::Sender<FeedMessage>) -> Result<()> {
        info!("Connecting to post stream: {}", self.url);

        let (ws_stream, _response) = timeout(self.connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| {
                ClientError::FeedConnection(format!(
                    "handshake timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| ClientError::FeedConnection(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        let subscribe_msg = self.create_subscribe_message()?;
        let msg_json = serde_json::to_string(&subscribe_msg)?;
        debug!("Subscribing to {:?}", self.follow);
        write
            .send(Message::Text(msg_json))
            .await
            .map_err(|e| ClientError::FeedConnection(e.to_string()))?;

        info!("Post stream connection established");
        self.is_connected.store(true, Ordering::SeqCst);
        event_sender
            .send(FeedMessage::Status(ConnectionStatus::Connected))
            .await
            .map_err(|e| ClientError::ChannelSend(e.to_string()))?;

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        self.stop = Some(stop_tx);

        let is_connected = self.is_connected.clone();
        let heartbeat_interval = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut ping_interval = interval(Duration::from_secs(heartbeat_interval));
            ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick is immediate
            ping_interval.tick().await;

            let status = loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let trimmed = text.trim();
                                if trimmed.eq_ignore_ascii_case("ping") {
                                    if let Err(e) = write.send(Message::Text("pong".to_string())).await {
                                        break ConnectionStatus::Error(e.to_string());
                                    }
                                    let _ = event_sender.send(FeedMessage::Heartbeat).await;
                                    continue;
                                }
                                if trimmed.eq_ignore_ascii_case("pong") {
                                    let _ = event_sender.send(FeedMessage::Heartbeat).await;
                                    continue;
                                }
                                // keep-alive newlines
                                if trimmed.is_empty() {
                                    continue;
                                }

                                let message = match parse_message(&text) {
                                    Ok(message) => message,
                                    Err(e) => {
                                        warn!("Failed to parse message: {} - {}", e, text);
                                        FeedMessage::Raw(text)
                                    }
                                };
                                if let Err(e) = event_sender.send(message).await {
                                    error!("Failed to send event: {}", e);
                                    break ConnectionStatus::Disconnected(Some("receiver dropped".to_string()));
                                }
                            }
                            Some(Ok(Message::Ping(_))) => {
                                // tungstenite queues the pong itself
                                debug!("Received Ping");
                            }
                            Some(Ok(Message::Pong(_))) => {
                                let _ = event_sender.send(FeedMessage::Heartbeat).await;
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("Post stream closed: {:?}", frame);
                                break ConnectionStatus::Disconnected(frame.map(|f| f.reason.to_string()));
                            }
                            Some(Err(e)) => {
                                error!("Post stream error: {}", e);
                                break ConnectionStatus::Error(e.to_string());
                            }
                            None => {
                                info!("Post stream ended");
                                break ConnectionStatus::Disconnected(None);
                            }
                            _ => {}
                        }
                    }
                    _ = ping_interval.tick() => {
                        if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                            break ConnectionStatus::Error(e.to_string());
                        }
                    }
                    _ = stop_rx.recv() => {
                        let _ = write.send(Message::Close(None)).await;
                        is_connected.store(false, Ordering::SeqCst);
                        return;
                    }
                }
            };

            is_connected.store(false, Ordering::SeqCst);
            let _ = event_sender.send(FeedMessage::Status(status)).await;
        });

        Ok(())
    }
}

#[async_trait]
impl EventFeed for PostStreamClient {
    async fn connect(&mut self, sender: mpsc::Sender<FeedMessage>) -> Result<()> {
        self.connect_and_subscribe(sender).await
    }

    #[instrument(skip(self))]
    async fn disconnect(&mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            // reader may already be gone
            let _ = stop.send(()).await;
        }
        self.is_connected.store(false, Ordering::SeqCst);
        info!("Disconnected from post stream");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    fn feed_name(&self) -> &'static str {
        "PostStream"
    }
}

/// Parse an incoming stream payload
pub fn parse_message(text: &str) -> Result<FeedMessage> {
    let value: Value = serde_json::from_str(text)?;

    if let Some(notice) = value.get("disconnect") {
        let notice: DisconnectNotice = serde_json::from_value(notice.clone())?;
        return Ok(FeedMessage::Status(ConnectionStatus::Disconnected(
            notice.reason,
        )));
    }

    if let Some(err) = value.get("error").or_else(|| value.get("errors")) {
        return Ok(FeedMessage::Status(ConnectionStatus::Error(err.to_string())));
    }

    if value.get("user").is_some() || value.get("text").is_some() {
        let status: StatusPayload = serde_json::from_value(value)?;
        return Ok(FeedMessage::Post(convert_status(status)));
    }

    Ok(FeedMessage::Raw(text.to_string()))
}

/// Convert a status payload into a feed event
///
/// Extended text wins over the truncated `text` field.
fn convert_status(status: StatusPayload) -> FeedEvent {
    let text = status
        .extended_tweet
        .and_then(|ext| ext.full_text)
        .or(status.text);

    FeedEvent {
        account: status.user.and_then(|u| u.screen_name),
        text,
        is_repost: status.retweeted_status.is_some(),
        reply_to_status_id: status.in_reply_to_status_id.and_then(id_string),
        reply_to_account: status.in_reply_to_screen_name,
        reply_to_user_id: status.in_reply_to_user_id.and_then(id_string),
    }
}

fn id_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
