use std::{sync::Arc, time::Duration};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    clock::{ChainClock, ChainTime},
    ClockError, SystemTimeSource, TimeSource, MAXIMUM_GOSSIP_CLOCK_DISPARITY,
};

pub struct ChainClockBuilder {
    genesis_time: Option<u64>,
    slot_duration: Option<Duration>,
    slots_per_epoch: u64,
    maximum_gossip_clock_disparity: Duration,
    time_source: Option<Arc<dyn TimeSource>>,
    /// CancellationToken used to trigger shutdown of the clock
    shutdown: Option<CancellationToken>,
}

impl Default for ChainClockBuilder {
    fn default() -> Self {
        Self {
            genesis_time: None,
            slot_duration: None,
            slots_per_epoch: Self::SLOTS_PER_EPOCH,
            maximum_gossip_clock_disparity: MAXIMUM_GOSSIP_CLOCK_DISPARITY,
            time_source: None,
            shutdown: None,
        }
    }
}

impl ChainClockBuilder {
    pub const SLOTS_PER_EPOCH: u64 = 32;

    /// Build the clock and arm its tick task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<ChainClock, ClockError> {
        let genesis_time = self
            .genesis_time
            .ok_or(ClockError::InvalidConfiguration("no genesis time provided"))?;
        let genesis_ms = i64::try_from(genesis_time)
            .ok()
            .and_then(|seconds| seconds.checked_mul(1000))
            .ok_or(ClockError::InvalidConfiguration("genesis time out of range"))?;

        let slot_ms = self
            .slot_duration
            .ok_or(ClockError::InvalidConfiguration("no slot duration provided"))
            .map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))?;
        if slot_ms == 0 {
            return Err(ClockError::InvalidConfiguration(
                "slot duration must be at least one millisecond",
            ));
        }

        if self.slots_per_epoch == 0 || i64::try_from(self.slots_per_epoch).is_err() {
            return Err(ClockError::InvalidConfiguration(
                "slots per epoch must be greater than zero",
            ));
        }

        let shutdown = self
            .shutdown
            .ok_or(ClockError::InvalidConfiguration("no shutdown token provided"))?;

        let runtime = Handle::try_current().map_err(|_| ClockError::NoRuntime)?;

        let time = ChainTime {
            genesis_time,
            genesis_ms,
            slot_ms,
            slots_per_epoch: self.slots_per_epoch,
            gossip_disparity_ms: i64::try_from(self.maximum_gossip_clock_disparity.as_millis())
                .unwrap_or(i64::MAX),
        };

        Ok(ChainClock::start(
            time,
            self.time_source
                .unwrap_or_else(|| Arc::new(SystemTimeSource)),
            shutdown.child_token(),
            &runtime,
        ))
    }
}

impl ChainClockBuilder {
    /// Genesis time, in seconds since the UNIX epoch.
    pub fn with_genesis_time(mut self, genesis_time: u64) -> Self {
        self.genesis_time = Some(genesis_time);

        self
    }

    pub fn with_seconds_per_slot(mut self, seconds_per_slot: u64) -> Self {
        self.slot_duration = Some(Duration::from_secs(seconds_per_slot));

        self
    }

    /// Sub-second slot durations are accepted, which is mostly useful for local networks and tests.
    pub fn with_slot_duration(mut self, slot_duration: Duration) -> Self {
        self.slot_duration = Some(slot_duration);

        self
    }

    pub fn with_slots_per_epoch(mut self, slots_per_epoch: u64) -> Self {
        self.slots_per_epoch = slots_per_epoch;

        self
    }

    pub fn with_maximum_gossip_clock_disparity(mut self, disparity: Duration) -> Self {
        self.maximum_gossip_clock_disparity = disparity;

        self
    }

    pub fn with_time_source<T: TimeSource>(mut self, time_source: T) -> Self {
        self.time_source = Some(Arc::new(time_source));

        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);

        self
    }
}
