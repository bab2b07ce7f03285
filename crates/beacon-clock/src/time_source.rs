use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};

/// Source of wall-clock time for the [`ChainClock`](crate::ChainClock).
pub trait TimeSource: Send + Sync + 'static {
    /// Milliseconds elapsed since the UNIX epoch.
    fn now_ms(&self) -> i64;
}

/// Time source backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Time source that only moves when told to.
///
/// Clones share the same instant, which lets a test keep a handle while the clock owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualTimeSource {
    now_ms: Arc<AtomicI64>,
}

impl ManualTimeSource {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn from_datetime(now: DateTime<Utc>) -> Self {
        Self::new(now.timestamp_millis())
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ms
            .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn rewind(&self, duration: Duration) {
        self.now_ms
            .fetch_sub(duration.as_millis() as i64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn manual_source_is_shared_between_clones() {
        let source = ManualTimeSource::new(1_000);
        let handle = source.clone();

        handle.advance(Duration::from_millis(500));
        assert_eq!(source.now_ms(), 1_500);

        handle.rewind(Duration::from_secs(1));
        assert_eq!(source.now_ms(), 500);

        handle.set_ms(-42);
        assert_eq!(source.now_ms(), -42);
    }

    #[test]
    fn manual_source_from_datetime() {
        let genesis = Utc.timestamp_opt(1_606_824_023, 0).unwrap();

        assert_eq!(
            ManualTimeSource::from_datetime(genesis).now_ms(),
            1_606_824_023_000
        );
    }

    #[test]
    fn system_source_is_after_genesis_of_mainnet() {
        assert!(SystemTimeSource.now_ms() > 1_606_824_023_000);
    }
}
