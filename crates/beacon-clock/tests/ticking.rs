use std::time::Duration;

use beacon_clock::{ChainClock, ClockError, ClockEvent};
use chrono::Utc;
use futures::StreamExt;
use rstest::rstest;
use test_log::test;
use tokio::spawn;
use tokio_util::sync::CancellationToken;

const SLOT_DURATION: Duration = Duration::from_millis(100);

fn start_clock(shutdown: &CancellationToken) -> ChainClock {
    let genesis_time = Utc::now().timestamp() as u64 - 10;

    ChainClock::builder()
        .with_genesis_time(genesis_time)
        .with_slot_duration(SLOT_DURATION)
        .with_slots_per_epoch(4)
        .with_shutdown(shutdown.clone())
        .build()
        .expect("Unable to build the clock")
}

#[rstest]
#[test(tokio::test)]
#[timeout(Duration::from_secs(5))]
async fn tick_emits_consecutive_slots() {
    let shutdown = CancellationToken::new();
    let clock = start_clock(&shutdown);
    let mut events = clock.events();

    let mut slots = Vec::new();
    while slots.len() < 5 {
        if let Some(ClockEvent::Slot(slot)) = events.next().await {
            slots.push(slot);
        }
    }

    for pair in slots.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
}

#[rstest]
#[test(tokio::test)]
#[timeout(Duration::from_secs(5))]
async fn tick_emits_epoch_after_its_first_slot() {
    let shutdown = CancellationToken::new();
    let clock = start_clock(&shutdown);
    let mut events = clock.events();

    let mut previous = None;
    while let Some(event) = events.next().await {
        if let ClockEvent::Epoch(epoch) = event {
            assert_eq!(previous, Some(ClockEvent::Slot(epoch * 4)));
            break;
        }
        previous = Some(event);
    }
}

#[rstest]
#[test(tokio::test)]
#[timeout(Duration::from_secs(5))]
async fn wait_for_slot_is_driven_by_the_tick() {
    let shutdown = CancellationToken::new();
    let clock = start_clock(&shutdown);
    let target = clock.peek_slot() + 3;

    clock
        .wait_for_slot(target)
        .await
        .expect("The clock didn't reach the slot");

    assert!(clock.cached_slot() >= target);
}

#[rstest]
#[test(tokio::test)]
#[timeout(Duration::from_secs(5))]
async fn shutdown_stops_the_clock() {
    let shutdown = CancellationToken::new();
    let clock = start_clock(&shutdown);
    let mut events = clock.events();

    let waiter = spawn({
        let clock = clock.clone();
        async move { clock.wait_for_slot(clock.peek_slot() + 1_000).await }
    });

    tokio::time::sleep(SLOT_DURATION * 2).await;
    shutdown.cancel();

    assert_eq!(waiter.await.unwrap(), Err(ClockError::Aborted));
    while events.next().await.is_some() {}

    let frozen = clock.cached_slot();
    tokio::time::sleep(SLOT_DURATION * 3).await;

    assert_eq!(clock.cached_slot(), frozen);
    assert!(clock.current_slot() > frozen);
}
