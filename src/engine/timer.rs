//! Timed exit trigger

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Holding period measured from the entry time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldingPeriod(chrono::Duration);

impl HoldingPeriod {
    pub fn new(duration: chrono::Duration) -> Self {
        Self(duration)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.0
    }

    /// `None` when `entry_time + holding` is past the last representable instant
    pub fn deadline(&self, entry_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        entry_time.checked_add_signed(self.0)
    }

    /// True at and after `entry_time + holding`
    pub fn has_elapsed(&self, entry_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - entry_time >= self.0
    }
}

/// Fixed-period poll for the exit check
///
/// Missed ticks are skipped, so a slow exchange call never causes a burst
/// of back-to-back checks.
#[derive(Debug)]
pub struct ExitTimer {
    ticker: Interval,
}

impl ExitTimer {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { ticker }
    }

    pub async fn tick(&mut self) {
        self.ticker.tick().await;
    }
}
