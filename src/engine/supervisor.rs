//! Feed supervisor: keeps the feed connected and drives the state machine

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use super::position::PositionManager;
use super::types::PositionState;
use crate::common::channels::create_feed_channel;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::EventFeed;
use crate::common::types::{ConnectionStatus, FeedMessage};

/// Runs feed sessions back to back until shutdown
///
/// The caller owns the [`PositionState`]; it is lent to every session so an
/// open position survives reconnects with its original entry time.
pub struct Supervisor<F> {
    feed: F,
    manager: PositionManager,
    reconnect_delay: Duration,
    max_reconnect_attempts: u32,
}

impl<F> Supervisor<F>
where
    F: EventFeed,
{
    pub fn new(feed: F, manager: PositionManager) -> Self {
        Self {
            feed,
            manager,
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 0,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Give up after this many consecutive failed sessions (0 = never)
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Run until `shutdown` turns true
    ///
    /// Only returns an error when `max_reconnect_attempts` is exhausted.
    #[instrument(skip_all, fields(feed = self.feed.feed_name()))]
    pub async fn run(
        &mut self,
        state: &mut PositionState,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            // A due exit must not wait on the feed coming back
            if self.manager.exit_due(state) {
                self.manager.poll_exit(state).await;
            }

            info!("Setting up {} stream...", self.feed.feed_name());
            let (sender, receiver) = create_feed_channel();

            let error = match self.feed.connect(sender).await {
                Ok(()) => {
                    failures = 0;
                    match self.stream(state, receiver, &mut shutdown).await {
                        Ok(()) => break,
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            failures += 1;
            if error.is_feed_failure() {
                warn!("Feed session ended: {}", error);
            } else {
                error!("Feed session failed unexpectedly: {}", error);
            }
            if let Err(e) = self.feed.disconnect().await {
                debug!("Error while disconnecting feed: {}", e);
            }

            if self.max_reconnect_attempts > 0 && failures >= self.max_reconnect_attempts {
                error!("Giving up after {} consecutive feed failures", failures);
                return Err(error);
            }

            info!(
                "Reconnecting in {:?} (attempt {}, phase {})",
                self.reconnect_delay, failures, state.phase
            );
            if !self.backoff(state, &mut shutdown).await {
                break;
            }
        }

        if let Err(e) = self.feed.disconnect().await {
            debug!("Error while disconnecting feed: {}", e);
        }
        info!("Supervisor stopped in phase {}", state.phase);
        Ok(())
    }

    /// Wait out the reconnect delay, still selling when the exit comes due
    ///
    /// Returns `false` when shutdown was requested.
    async fn backoff(
        &self,
        state: &mut PositionState,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let delay = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(delay);
        let mut timer = self.manager.exit_timer();

        loop {
            tokio::select! {
                _ = &mut delay => return true,
                _ = timer.tick(), if state.is_exit_pending() => {
                    self.manager.poll_exit(state).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    /// One connected session: posts, exit polls and shutdown in one loop
    ///
    /// `Ok` means shutdown was requested; any feed loss is an `Err`.
    async fn stream(
        &self,
        state: &mut PositionState,
        mut receiver: mpsc::Receiver<FeedMessage>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let mut timer = self.manager.exit_timer();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
                _ = timer.tick(), if state.is_exit_pending() => {
                    self.manager.poll_exit(state).await;
                }
                message = receiver.recv() => match message {
                    Some(FeedMessage::Post(event)) => {
                        self.manager.handle_event(state, &event).await;
                    }
                    Some(FeedMessage::Status(ConnectionStatus::Connected)) => {
                        info!("{} stream connected", self.feed.feed_name());
                    }
                    Some(FeedMessage::Status(ConnectionStatus::Disconnected(reason))) => {
                        return Err(ClientError::FeedCommunication(
                            reason.unwrap_or_else(|| "stream closed".to_string()),
                        ));
                    }
                    Some(FeedMessage::Status(ConnectionStatus::Error(e))) => {
                        return Err(ClientError::FeedCommunication(e));
                    }
                    Some(FeedMessage::Heartbeat) => debug!("Feed heartbeat"),
                    Some(FeedMessage::Raw(message)) => debug!("Unhandled feed message: {}", message),
                    None => {
                        return Err(ClientError::FeedCommunication(
                            "feed channel closed".to_string(),
                        ));
                    }
                },
            }
        }
    }
}
