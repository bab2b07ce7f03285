use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    task::{Context, Poll},
    time::Duration,
};

use beacon_metrics::{
    CLOCK_CATCH_UP_SLOTS, CLOCK_CURRENT_EPOCH, CLOCK_CURRENT_SLOT, CLOCK_EPOCH_EVENTS_TOTAL,
    CLOCK_PENDING_WAITS, CLOCK_SLOT_EVENTS_TOTAL,
};
use futures::{FutureExt, Stream};
use tokio::{
    runtime::Handle,
    sync::{mpsc, Notify},
    task::AbortHandle,
    time::sleep,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, info, warn};

use crate::{
    builder::ChainClockBuilder,
    emitter::{Emitter, Subscription},
    slot, ClockError, ClockEvent, ClockEventKind, Epoch, Slot, TimeSource,
};

/// Immutable chain time parameters, fixed for the lifetime of the clock.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChainTime {
    pub(crate) genesis_time: u64,
    pub(crate) genesis_ms: i64,
    pub(crate) slot_ms: i64,
    pub(crate) slots_per_epoch: u64,
    pub(crate) gossip_disparity_ms: i64,
}

impl ChainTime {
    fn slot_at(&self, now_ms: i64) -> Slot {
        slot::slot_at(now_ms, self.genesis_ms, self.slot_ms)
    }

    fn epoch_at(&self, slot: Slot) -> Epoch {
        slot::compute_epoch_at_slot(slot, self.slots_per_epoch)
    }

    fn slot_start_ms(&self, slot: Slot) -> i64 {
        slot::slot_start_ms(slot, self.genesis_ms, self.slot_ms)
    }
}

/// Single authority on protocol time for the node.
///
/// Every observation of the clock, either the internal tick or a call to
/// [`current_slot`](Self::current_slot), catches the clock up with the wall clock: one slot event
/// is emitted for each slot boundary crossed since the previous observation, followed by an epoch
/// event whenever the epoch changes.
///
/// Cloning the clock is cheap and every clone observes the same state. The tick task stops when
/// the shutdown token is cancelled or the last clone is dropped.
#[derive(Clone)]
pub struct ChainClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    time: ChainTime,
    time_source: Arc<dyn TimeSource>,
    shutdown: CancellationToken,
    state: Mutex<ClockState>,
    slot_events: Emitter<Slot>,
    epoch_events: Emitter<Epoch>,
    ticker: Mutex<Option<AbortHandle>>,
}

struct ClockState {
    /// Last slot for which a slot event was queued
    cached_slot: Slot,
    /// Events queued by the catch-up and not yet handed to listeners
    pending: VecDeque<ClockEvent>,
    /// Whether a thread is currently handing events to listeners
    dispatching: bool,
}

impl ChainClock {
    pub fn builder() -> ChainClockBuilder {
        ChainClockBuilder::default()
    }

    pub(crate) fn start(
        time: ChainTime,
        time_source: Arc<dyn TimeSource>,
        shutdown: CancellationToken,
        runtime: &Handle,
    ) -> Self {
        let cached_slot = time.slot_at(time_source.now_ms());

        let inner = Arc::new(ClockInner {
            time,
            time_source,
            shutdown: shutdown.clone(),
            state: Mutex::new(ClockState {
                cached_slot,
                pending: VecDeque::new(),
                dispatching: false,
            }),
            slot_events: Emitter::new(),
            epoch_events: Emitter::new(),
            ticker: Mutex::new(None),
        });

        let ticker = runtime.spawn(tick(Arc::downgrade(&inner), shutdown));
        *inner.ticker.lock().unwrap_or_else(PoisonError::into_inner) = Some(ticker.abort_handle());

        CLOCK_CURRENT_SLOT.set(cached_slot);
        CLOCK_CURRENT_EPOCH.set(time.epoch_at(cached_slot));
        info!(
            "Chain clock started at slot {} (genesis: {}, slot duration: {}ms)",
            cached_slot, time.genesis_time, time.slot_ms
        );

        Self { inner }
    }

    /// Genesis time, in seconds since the UNIX epoch.
    pub fn genesis_time(&self) -> u64 {
        self.inner.time.genesis_time
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::from_millis(self.inner.time.slot_ms as u64)
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.inner.time.slots_per_epoch
    }

    /// Current slot according to the wall clock.
    ///
    /// Emits the events of every boundary crossed since the last observation before returning.
    pub fn current_slot(&self) -> Slot {
        self.inner.observe(self.inner.now_ms())
    }

    pub fn current_epoch(&self) -> Epoch {
        self.inner.time.epoch_at(self.current_slot())
    }

    /// Current slot, or the next one if its boundary is closer than the gossip clock disparity.
    pub fn current_slot_with_gossip_disparity(&self) -> Slot {
        let now_ms = self.inner.now_ms();
        let current_slot = self.inner.observe(now_ms);
        let next_slot_ms = self.inner.time.slot_start_ms(current_slot + 1);

        if next_slot_ms - now_ms < self.inner.time.gossip_disparity_ms {
            current_slot + 1
        } else {
            current_slot
        }
    }

    /// Slot the clock would report if it were `tolerance` ahead.
    pub fn slot_with_future_tolerance(&self, tolerance: Duration) -> Slot {
        self.inner
            .time
            .slot_at(self.inner.now_ms().saturating_add(millis(tolerance)))
    }

    /// Slot the clock would report if it were `tolerance` behind.
    pub fn slot_with_past_tolerance(&self, tolerance: Duration) -> Slot {
        self.inner
            .time
            .slot_at(self.inner.now_ms().saturating_sub(millis(tolerance)))
    }

    /// Whether `slot` is the current slot, allowing for the given clock skew in each direction.
    ///
    /// When `future_tolerance` is `None` the past tolerance is used for both directions. A zero
    /// tolerance disables the check in that direction.
    pub fn is_current_slot_given_tolerance(
        &self,
        slot: Slot,
        past_tolerance: Duration,
        future_tolerance: Option<Duration>,
    ) -> bool {
        let future_tolerance = future_tolerance.unwrap_or(past_tolerance);
        let now_ms = self.inner.now_ms();

        let current_slot = self.inner.observe(now_ms);
        let past_slot = self
            .inner
            .time
            .slot_at(now_ms.saturating_sub(millis(past_tolerance)));
        let future_slot = self
            .inner
            .time
            .slot_at(now_ms.saturating_add(millis(future_tolerance)));

        slot == current_slot
            || (!past_tolerance.is_zero() && slot == past_slot)
            || (!future_tolerance.is_zero() && slot == future_slot)
    }

    pub fn is_current_slot_given_gossip_disparity(&self, slot: Slot) -> bool {
        let disparity = Duration::from_millis(self.inner.time.gossip_disparity_ms as u64);

        self.is_current_slot_given_tolerance(slot, disparity, Some(disparity))
    }

    /// Signed number of seconds between the start of `slot` and `to_sec` (defaults to now).
    ///
    /// A negative value means that `slot` has not started yet at `to_sec`.
    pub fn sec_from_slot(&self, slot: Slot, to_sec: Option<f64>) -> f64 {
        let to_sec = to_sec.unwrap_or_else(|| self.inner.now_ms() as f64 / 1000.0);

        to_sec - self.inner.time.slot_start_ms(slot) as f64 / 1000.0
    }

    /// Slot derived from the wall clock, without emitting any pending event.
    pub fn peek_slot(&self) -> Slot {
        self.inner.time.slot_at(self.inner.now_ms())
    }

    /// Last slot for which the clock emitted a slot event.
    pub fn cached_slot(&self) -> Slot {
        self.inner.state().cached_slot
    }

    pub fn duration_until_next_slot(&self) -> Duration {
        self.inner.duration_until_next_slot()
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Suspend until the clock reaches `slot`.
    ///
    /// Returns immediately when `slot` is not positive or already reached, and fails with
    /// [`ClockError::Aborted`] if the clock is shut down first. The listener registered for the
    /// wait is released on every outcome, including when the returned future is dropped.
    pub async fn wait_for_slot(&self, slot: Slot) -> Result<(), ClockError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ClockError::Aborted);
        }

        if slot <= 0 {
            return Ok(());
        }

        let reached = Arc::new(Notify::new());
        let subscription = self.on_slot({
            let reached = reached.clone();
            move |current_slot| {
                if current_slot >= slot {
                    reached.notify_one();
                }
            }
        });

        if self.current_slot() >= slot {
            return Ok(());
        }

        let _pending = PendingWait::new();
        let result = tokio::select! {
            biased;

            _ = reached.notified() => Ok(()),
            _ = self.inner.shutdown.cancelled() => Err(ClockError::Aborted),
        };

        subscription.unsubscribe();

        result
    }

    pub fn on_slot<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Slot) + Send + Sync + 'static,
    {
        self.inner.slot_events.subscribe(listener)
    }

    pub fn on_epoch<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Epoch) + Send + Sync + 'static,
    {
        self.inner.epoch_events.subscribe(listener)
    }

    /// Stream of every slot and epoch event emitted from now on, in emission order.
    ///
    /// The stream ends once the clock is shut down.
    pub fn events(&self) -> ClockEvents {
        let (sender, receiver) = mpsc::unbounded_channel();

        let slots = self.on_slot({
            let sender = sender.clone();
            move |slot| {
                _ = sender.send(ClockEvent::Slot(slot));
            }
        });
        let epochs = self.on_epoch(move |epoch| {
            _ = sender.send(ClockEvent::Epoch(epoch));
        });

        ClockEvents {
            receiver: UnboundedReceiverStream::new(receiver),
            shutdown: Box::pin(self.inner.shutdown.clone().cancelled_owned()),
            _subscriptions: [slots, epochs],
        }
    }

    pub fn listener_count(&self, kind: ClockEventKind) -> usize {
        match kind {
            ClockEventKind::Slot => self.inner.slot_events.len(),
            ClockEventKind::Epoch => self.inner.epoch_events.len(),
        }
    }
}

impl std::fmt::Debug for ChainClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClock")
            .field("time", &self.inner.time)
            .field("cached_slot", &self.cached_slot())
            .finish()
    }
}

impl ClockInner {
    fn now_ms(&self) -> i64 {
        self.time_source.now_ms()
    }

    fn state(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn duration_until_next_slot(&self) -> Duration {
        let ms = slot::ms_until_next_slot(self.now_ms(), self.time.genesis_ms, self.time.slot_ms);

        Duration::from_millis(ms as u64)
    }

    /// Catch up with the slot derived from `now_ms` and return the current slot.
    ///
    /// The returned slot never goes below the last emitted slot, even if the wall clock moved
    /// backwards.
    fn observe(&self, now_ms: i64) -> Slot {
        let slot = self.time.slot_at(now_ms);

        slot.max(self.advance(Some(slot)))
    }

    /// Move `cached_slot` up to `target` (or the wall clock slot), queue one event per boundary
    /// crossed and hand them to the listeners. Returns the resulting `cached_slot`.
    fn advance(&self, target: Option<Slot>) -> Slot {
        let mut state = self.state();
        let target = target.unwrap_or_else(|| self.time.slot_at(self.now_ms()));
        let from = state.cached_slot;

        while state.cached_slot < target && !self.shutdown.is_cancelled() {
            let previous_slot = state.cached_slot;
            state.cached_slot += 1;

            let slot = state.cached_slot;
            state.pending.push_back(ClockEvent::Slot(slot));

            let epoch = self.time.epoch_at(slot);
            if self.time.epoch_at(previous_slot) < epoch {
                state.pending.push_back(ClockEvent::Epoch(epoch));
            }
        }

        let cached_slot = state.cached_slot;
        let crossed = cached_slot - from;
        if crossed > 0 {
            CLOCK_CATCH_UP_SLOTS.observe(crossed as f64);
            CLOCK_CURRENT_SLOT.set(cached_slot);
            CLOCK_CURRENT_EPOCH.set(self.time.epoch_at(cached_slot));

            if crossed > 1 {
                warn!("Clock caught up {crossed} slots, from slot {from} to slot {cached_slot}");
            }
        }

        // Another call, possibly a listener up the stack, is already delivering events in order.
        if state.dispatching || state.pending.is_empty() {
            return cached_slot;
        }

        state.dispatching = true;
        drop(state);

        self.dispatch();

        cached_slot
    }

    fn dispatch(&self) {
        let _guard = DispatchGuard(self);

        loop {
            let event = {
                let mut state = self.state();
                if self.shutdown.is_cancelled() {
                    state.pending.clear();
                }

                match state.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        state.dispatching = false;
                        return;
                    }
                }
            };

            match event {
                ClockEvent::Slot(slot) => {
                    debug!(slot, "Slot started");
                    CLOCK_SLOT_EVENTS_TOTAL.inc();
                    self.slot_events.emit(slot);
                }
                ClockEvent::Epoch(epoch) => {
                    info!(epoch, "Epoch started");
                    CLOCK_EPOCH_EVENTS_TOTAL.inc();
                    self.epoch_events.emit(epoch);
                }
            }
        }
    }
}

impl Drop for ClockInner {
    fn drop(&mut self) {
        if let Some(ticker) = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            ticker.abort();
        }

        self.shutdown.cancel();
    }
}

/// Release the dispatching flag if a listener panics while events are being handed out.
struct DispatchGuard<'a>(&'a ClockInner);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.state().dispatching = false;
        }
    }
}

struct PendingWait;

impl PendingWait {
    fn new() -> Self {
        CLOCK_PENDING_WAITS.inc();

        Self
    }
}

impl Drop for PendingWait {
    fn drop(&mut self) {
        CLOCK_PENDING_WAITS.dec();
    }
}

/// Sleep until the next slot boundary, catch up, repeat until shutdown.
async fn tick(clock: Weak<ClockInner>, shutdown: CancellationToken) {
    loop {
        let Some(delay) = clock
            .upgrade()
            .map(|inner| inner.duration_until_next_slot())
        else {
            break;
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(delay) => {}
        }

        match clock.upgrade() {
            Some(inner) => {
                inner.advance(None);
            }
            None => break,
        }
    }

    info!("Shutting down chain clock...");
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Ordered stream of [`ClockEvent`]s, see [`ChainClock::events`].
///
/// Dropping the stream unregisters its listeners.
pub struct ClockEvents {
    receiver: UnboundedReceiverStream<ClockEvent>,
    shutdown: Pin<Box<WaitForCancellationFutureOwned>>,
    _subscriptions: [Subscription; 2],
}

impl Stream for ClockEvents {
    type Item = ClockEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.receiver).poll_next(cx) {
            Poll::Pending => match this.shutdown.poll_unpin(cx) {
                Poll::Ready(()) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            ready => ready,
        }
    }
}
