use crate::limits::TABLE_COUNT;
use crate::model::{Availability, Reservation};

// ── Occupancy ────────────────────────────────────────────────────

/// The one occupancy predicate. A reservation holds a table on (date, slot)
/// iff its date matches by string equality, its slot label matches, and it
/// has not been rejected. Pending-payment bookings count: the table is held
/// from the moment the customer submits.
///
/// Every retrieval mode — full cached scan or targeted store query — goes
/// through this same test.
pub fn holds_slot(r: &Reservation, day: &str, slot: &str) -> bool {
    r.status.holds_table() && r.time == slot && r.date == day
}

pub fn occupied_count(reservations: &[Reservation], day: &str, slot: &str) -> u32 {
    reservations.iter().filter(|r| holds_slot(r, day, slot)).count() as u32
}

/// Compute availability for one (date, slot) pair from a reservation set.
///
/// Zero matches → fully available. `TABLE_COUNT` or more → unavailable with
/// zero spots, never negative.
pub fn slot_availability(reservations: &[Reservation], day: &str, slot: &str) -> Availability {
    let occupied = occupied_count(reservations, day, slot);
    Availability {
        available: occupied < TABLE_COUNT,
        spots_left: TABLE_COUNT.saturating_sub(occupied),
        total: TABLE_COUNT,
    }
}
