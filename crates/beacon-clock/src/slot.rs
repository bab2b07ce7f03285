//! Pure slot arithmetic.
//!
//! Every function works on milliseconds since the UNIX epoch and uses Euclidean division, so
//! instants before genesis map to negative slots and the time to the next boundary stays
//! positive.

use crate::{Epoch, Slot};

/// Slot containing `now_ms` for a chain starting at `genesis_ms`.
///
/// `slot_ms` must be greater than zero.
pub fn slot_at(now_ms: i64, genesis_ms: i64, slot_ms: i64) -> Slot {
    (now_ms - genesis_ms).div_euclid(slot_ms)
}

/// Milliseconds from `now_ms` until the start of the next slot, in `1..=slot_ms`.
pub fn ms_until_next_slot(now_ms: i64, genesis_ms: i64, slot_ms: i64) -> i64 {
    slot_ms - (now_ms - genesis_ms).rem_euclid(slot_ms)
}

/// Nominal start of `slot` in milliseconds since the UNIX epoch.
pub fn slot_start_ms(slot: Slot, genesis_ms: i64, slot_ms: i64) -> i64 {
    genesis_ms.saturating_add(slot.saturating_mul(slot_ms))
}

/// Epoch containing `slot`.
///
/// `slots_per_epoch` must be greater than zero.
pub fn compute_epoch_at_slot(slot: Slot, slots_per_epoch: u64) -> Epoch {
    slot.div_euclid(slots_per_epoch as i64)
}

/// First slot of `epoch`.
pub fn compute_start_slot_at_epoch(epoch: Epoch, slots_per_epoch: u64) -> Slot {
    epoch.saturating_mul(slots_per_epoch as i64)
}
