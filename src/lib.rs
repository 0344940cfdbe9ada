//! Reservation core for a game-table venue.
//!
//! Customers pick a date, a time slot, a party size, and a game, and submit
//! a booking that an admin later confirms or rejects. Durable state lives
//! in a document store reached through the [`store::BookingStore`]
//! capability trait; the crate keeps subscription-refreshed mirrors and
//! computes table availability against a fixed per-slot cap.

pub mod admin;
pub mod booking;
pub mod date;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod store;
pub mod sync;

pub use admin::{AdminPanel, ReservationFilter, StatusQuery};
pub use booking::{BookingFlow, BookingSummary, GameChoice};
pub use engine::{BookingError, check_slot_availability, slot_availability, slot_occupancy};
pub use model::{
    Availability, FreePlayTable, Money, NewsItem, Player, Reservation, ReservationStatus,
    SlotAvailability, TimeSlot, UserProfile,
};
pub use store::{BookingStore, MemoryStore};
pub use sync::{ViewEvent, ViewSession};
