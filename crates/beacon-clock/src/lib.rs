//! This crate is responsible for the chain time of the beacon node.
//!
//! The [`ChainClock`] converts wall-clock time into slots and epochs and is the single source
//! every other component asks "what time is it". It broadcasts one [`ClockEvent::Slot`] per slot
//! boundary crossed (and one [`ClockEvent::Epoch`] per epoch transition), in order and without
//! gaps, even when the process stalled for several slots.
//!
//! ```no_run
//! # async fn run() -> Result<(), beacon_clock::ClockError> {
//! use beacon_clock::ChainClock;
//! use tokio_util::sync::CancellationToken;
//!
//! let shutdown = CancellationToken::new();
//! let clock = ChainClock::builder()
//!     .with_genesis_time(1_606_824_023)
//!     .with_seconds_per_slot(12)
//!     .with_slots_per_epoch(32)
//!     .with_shutdown(shutdown.clone())
//!     .build()?;
//!
//! let target = clock.current_slot() + 2;
//! clock.wait_for_slot(target).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

mod builder;
mod clock;
mod emitter;
pub mod slot;
mod time_source;


pub use builder::ChainClockBuilder;
pub use clock::{ChainClock, ClockEvents};
pub use emitter::Subscription;
pub use time_source::{ManualTimeSource, SystemTimeSource, TimeSource};

/// Smallest unit of protocol time, negative before genesis.
pub type Slot = i64;

/// Group of `slots_per_epoch` consecutive slots.
pub type Epoch = i64;

/// Tolerance for peer clock skew when judging whether a gossip message is current.
pub const MAXIMUM_GOSSIP_CLOCK_DISPARITY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEvent {
    Slot(Slot),
    Epoch(Epoch),
}

impl ClockEvent {
    pub fn kind(&self) -> ClockEventKind {
        match self {
            ClockEvent::Slot(_) => ClockEventKind::Slot,
            ClockEvent::Epoch(_) => ClockEventKind::Epoch,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockEventKind {
    Slot,
    Epoch,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("The clock was shut down before the expected slot was reached")]
    Aborted,

    #[error("Unable to build the clock: {0}")]
    InvalidConfiguration(&'static str),

    #[error("Unable to spawn the clock: no tokio runtime available")]
    NoRuntime,
}
