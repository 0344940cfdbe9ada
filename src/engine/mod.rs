//! The availability engine: who holds which table on which date and slot,
//! and whether one more booking fits under the fixed table cap.

mod availability;
mod error;

pub use availability::{holds_slot, occupied_count, slot_availability};
pub use error::BookingError;

use tracing::warn;

use crate::model::Availability;
use crate::observability::{AVAILABILITY_CHECKS_TOTAL, AVAILABILITY_FAIL_CLOSED_TOTAL};
use crate::store::BookingStore;

/// Occupancy for one (date, slot) via a targeted store query.
///
/// The store filters by date and slot label; status counting happens here,
/// with the same predicate the cached-scan path uses.
pub async fn slot_occupancy(
    store: &dyn BookingStore,
    day: &str,
    slot: &str,
) -> Result<u32, BookingError> {
    let matching = store.reservations_for_slot(day, slot).await?;
    Ok(occupied_count(&matching, day, slot))
}

/// Store-backed availability check, used when opening the booking summary.
///
/// Fails closed: if the read fails, the slot is reported unavailable. A
/// read failure must never be mistaken for an open table.
pub async fn check_slot_availability(
    store: &dyn BookingStore,
    day: &str,
    slot: &str,
) -> Availability {
    metrics::counter!(AVAILABILITY_CHECKS_TOTAL).increment(1);
    match store.reservations_for_slot(day, slot).await {
        Ok(matching) => slot_availability(&matching, day, slot),
        Err(e) => {
            warn!("availability read failed for {day} {slot}: {e}");
            metrics::counter!(AVAILABILITY_FAIL_CLOSED_TOTAL).increment(1);
            Availability::unavailable()
        }
    }
}
