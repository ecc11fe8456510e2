//! Channel type definitions for feed-to-engine communication

use tokio::sync::mpsc;

use super::types::FeedMessage;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new feed message channel with the default buffer size
pub fn create_feed_channel() -> (mpsc::Sender<FeedMessage>, mpsc::Receiver<FeedMessage>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}
