use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, IntCounter, IntGauge,
};

use lazy_static::lazy_static;

use crate::BEACON_METRIC_REGISTRY;

lazy_static! {
    pub static ref CLOCK_CURRENT_SLOT: IntGauge = register_int_gauge_with_registry!(
        "clock_current_slot",
        "Last slot for which the clock emitted a slot event.",
        BEACON_METRIC_REGISTRY
    )
    .unwrap();
    pub static ref CLOCK_CURRENT_EPOCH: IntGauge = register_int_gauge_with_registry!(
        "clock_current_epoch",
        "Epoch of the last slot emitted by the clock.",
        BEACON_METRIC_REGISTRY
    )
    .unwrap();
    pub static ref CLOCK_SLOT_EVENTS_TOTAL: IntCounter = register_int_counter_with_registry!(
        "clock_slot_events_total",
        "Number of slot events emitted.",
        BEACON_METRIC_REGISTRY
    )
    .unwrap();
    pub static ref CLOCK_EPOCH_EVENTS_TOTAL: IntCounter = register_int_counter_with_registry!(
        "clock_epoch_events_total",
        "Number of epoch events emitted.",
        BEACON_METRIC_REGISTRY
    )
    .unwrap();
    pub static ref CLOCK_CATCH_UP_SLOTS: Histogram = register_histogram_with_registry!(
        "clock_catch_up_slots",
        "Number of slots crossed by a single catch-up.",
        vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0],
        BEACON_METRIC_REGISTRY
    )
    .unwrap();
    pub static ref CLOCK_PENDING_WAITS: IntGauge = register_int_gauge_with_registry!(
        "clock_pending_waits",
        "Number of tasks suspended until a slot is reached.",
        BEACON_METRIC_REGISTRY
    )
    .unwrap();
}
