use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Monetary amounts are plain integers — no currency subunits.
pub type Money = i64;

/// Sentinel game name meaning the party decides at the venue.
pub const DECIDE_AT_VENUE: &str = "A decidir en el local";

/// Where a reservation sits in the admin workflow.
///
/// A slot is held from the moment a customer submits, not only once an
/// admin confirms — only `Rejected` frees the table again. Older documents
/// carry the bare `pending` status; it deserializes into `PendingPayment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    #[serde(rename = "pending_payment", alias = "pending")]
    PendingPayment,
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "rejected")]
    Rejected,
}

impl ReservationStatus {
    /// Whether a reservation with this status holds one of the tables.
    pub fn holds_table(&self) -> bool {
        !matches!(self, ReservationStatus::Rejected)
    }
}

/// A booking request for one table.
///
/// `price_per_person` and `total` are snapshotted at creation; a later
/// change to the venue price never touches an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    pub phone: String,
    /// Plain calendar date, `YYYY-MM-DD`. Never an instant.
    pub date: String,
    /// Label of the booked slot. Labels, not slot ids, are the foreign key.
    pub time: String,
    pub people: u8,
    pub game: String,
    #[serde(rename = "pricePerPerson")]
    pub price_per_person: Money,
    pub total: Money,
    pub status: ReservationStatus,
    /// RFC 3339 creation timestamp, assigned by the store.
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Customer-submitted reservation data. The store assigns id, creation
/// timestamp, and the initial `pending_payment` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub people: u8,
    pub game: String,
    pub price_per_person: Money,
    pub total: Money,
}

/// Partial admin edit. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationUpdate {
    pub date: Option<String>,
    pub time: Option<String>,
    pub user_name: Option<String>,
    pub phone: Option<String>,
    pub game: Option<String>,
    pub people: Option<u8>,
    pub status: Option<ReservationStatus>,
}

impl ReservationUpdate {
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A bookable time window shared by all dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Ulid,
    /// Display string, also stored on `Reservation.time`.
    pub label: String,
    /// Inactive slots are hidden from customers; reservations referencing
    /// them stay valid.
    pub active: bool,
    /// Sort rank. New slots get `max(existing) + 1`.
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Ulid,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// One signed-up player on a free-play table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub phone: String,
}

/// A table open for walk-in sign-up, independent of the dated flow.
///
/// A user id appears at most once in `players`, and `players.len()` never
/// exceeds `capacity` — both enforced at sign-up time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreePlayTable {
    pub id: Ulid,
    pub number: u32,
    pub game: String,
    pub capacity: u32,
    pub date: Option<String>,
    #[serde(rename = "timeRange")]
    pub time_range: Option<String>,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreePlayTableDraft {
    pub number: u32,
    pub game: String,
    pub capacity: u32,
    pub date: Option<String>,
    pub time_range: Option<String>,
}

/// Partial admin edit of a free-play table. Players are managed through
/// join/leave, never replaced wholesale here. The double-`Option` date and
/// time-range fields distinguish "leave alone" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreePlayTableUpdate {
    pub number: Option<u32>,
    pub game: Option<String>,
    pub capacity: Option<u32>,
    pub date: Option<Option<String>>,
    pub time_range: Option<Option<String>>,
}

/// The customer identity attached to reservations and sign-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

// ── Query result types ───────────────────────────────────────────

/// Answer to "does one more booking fit on this date and slot?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    pub spots_left: u32,
    pub total: u32,
}

impl Availability {
    /// The fail-closed answer: a read failure never reads as "available".
    pub fn unavailable() -> Self {
        Self {
            available: false,
            spots_left: 0,
            total: crate::limits::TABLE_COUNT,
        }
    }
}

/// One slot paired with its computed availability, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub availability: Availability,
}
