//! Trading engine: post qualification, funds checks and the two-phase position
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Supervisor (reconnect loop)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EventFeed ── FeedMessage ──┐        ExitTimer tick         │
//! │                             ▼              │                │
//! │  EntryPending: EventQualifier ── no ──▶ ignore               │
//! │       │ yes                                │                │
//! │       ▼                                    ▼                │
//! │  take_snapshot → FundsValidator → BUY   ExitPending:        │
//! │       │ filled                          holding elapsed?    │
//! │       ▼                                    │ yes            │
//! │  ExitPending ◀─────────────────────        ▼                │
//! │                                   take_snapshot →           │
//! │                                   FundsValidator → SELL     │
//! │                                            │                │
//! │                                            ▼                │
//! │                                       EntryPending          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`EventQualifier`]: decides whether a post triggers a buy
//! - [`FundsValidator`]: checks a trade against a [`BalanceSnapshot`](crate::common::types::BalanceSnapshot)
//! - [`PositionManager`]: the entry/exit state machine
//! - [`Supervisor`]: keeps the feed connected and owns the loop
//! - [`Clock`]: time source for entry timestamps

pub mod clock;
pub mod position;
pub mod qualifier;
pub mod sizer;
pub mod snapshot;
pub mod supervisor;
pub mod timer;
pub mod types;

pub use clock::{Clock, SystemClock, TokioClock};
pub use position::{EntryOutcome, ExitOutcome, PositionManager};
pub use qualifier::{EventQualifier, Rejection};
pub use sizer::FundsValidator;
pub use snapshot::take_snapshot;
pub use supervisor::Supervisor;
pub use timer::{ExitTimer, HoldingPeriod};
pub use types::{
    FeasibilityDecision, InsufficientFundsReason, Phase, PositionState, TradeAmount, TradeRequest,
};
