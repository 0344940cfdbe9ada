//! The document-store collaborator. All durable state is owned by the
//! store; the rest of the crate holds only subscription-refreshed mirrors.

mod memory;

pub use memory::MemoryStore;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::engine::BookingError;
use crate::model::*;

/// Per-collection capability surface: read, write, delete, subscribe.
///
/// Subscriptions are snapshot broadcasts — every mutation delivers the
/// collection's full current state to all receivers. Dropping a receiver
/// cancels the subscription. No call is retried; a failure surfaces once.
#[async_trait]
pub trait BookingStore: Send + Sync {
    // ── Reservations ─────────────────────────────────────────

    /// All reservations, newest-created-first, dates normalized.
    async fn reservations(&self) -> Result<Vec<Reservation>, BookingError>;

    /// One user's reservations, newest-created-first.
    async fn reservations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Reservation>, BookingError>;

    /// Single-record read; `None` when the document is absent.
    async fn reservation(&self, id: Ulid) -> Result<Option<Reservation>, BookingError>;

    /// Targeted query: reservations whose date and slot label match.
    /// Status filtering is the caller's job — the engine applies the same
    /// occupancy predicate here as on a cached snapshot.
    async fn reservations_for_slot(
        &self,
        date: &str,
        slot: &str,
    ) -> Result<Vec<Reservation>, BookingError>;

    async fn add_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, BookingError>;

    async fn update_reservation(
        &self,
        id: Ulid,
        updates: ReservationUpdate,
    ) -> Result<(), BookingError>;

    async fn delete_reservation(&self, id: Ulid) -> Result<(), BookingError>;

    fn subscribe_reservations(&self) -> broadcast::Receiver<Vec<Reservation>>;

    // ── Time slots ───────────────────────────────────────────

    /// The slot catalog, sorted by rank.
    async fn time_slots(&self) -> Result<Vec<TimeSlot>, BookingError>;

    /// Create a slot with rank `max(existing) + 1`.
    async fn add_time_slot(&self, label: String, active: bool) -> Result<TimeSlot, BookingError>;

    /// Flip the active flag; returns the new state.
    async fn toggle_time_slot(&self, id: Ulid) -> Result<bool, BookingError>;

    async fn delete_time_slot(&self, id: Ulid) -> Result<(), BookingError>;

    fn subscribe_time_slots(&self) -> broadcast::Receiver<Vec<TimeSlot>>;

    // ── News ─────────────────────────────────────────────────

    /// Active news items, newest first.
    async fn news(&self) -> Result<Vec<NewsItem>, BookingError>;

    async fn add_news(
        &self,
        title: String,
        description: String,
        image: Option<String>,
    ) -> Result<NewsItem, BookingError>;

    async fn delete_news(&self, id: Ulid) -> Result<(), BookingError>;

    fn subscribe_news(&self) -> broadcast::Receiver<Vec<NewsItem>>;

    // ── Free-play tables ─────────────────────────────────────

    async fn free_play_tables(&self) -> Result<Vec<FreePlayTable>, BookingError>;

    async fn free_play_table(&self, id: Ulid) -> Result<Option<FreePlayTable>, BookingError>;

    async fn add_free_play_table(
        &self,
        draft: FreePlayTableDraft,
    ) -> Result<FreePlayTable, BookingError>;

    async fn update_free_play_table(
        &self,
        id: Ulid,
        updates: FreePlayTableUpdate,
    ) -> Result<(), BookingError>;

    async fn delete_free_play_table(&self, id: Ulid) -> Result<(), BookingError>;

    /// Sign a player up. Fails with `AlreadyJoined` or `TableFull` after
    /// re-reading the table's current state, never from a cached view.
    async fn join_free_play_table(&self, id: Ulid, player: Player) -> Result<(), BookingError>;

    async fn leave_free_play_table(&self, id: Ulid, user_id: &str) -> Result<(), BookingError>;

    fn subscribe_free_play_tables(&self) -> broadcast::Receiver<Vec<FreePlayTable>>;

    // ── Settings singletons ──────────────────────────────────

    async fn price(&self) -> Result<Money, BookingError>;

    async fn set_price(&self, value: Money) -> Result<(), BookingError>;

    async fn payment_alias(&self) -> Result<String, BookingError>;

    async fn set_payment_alias(&self, alias: String) -> Result<(), BookingError>;

    async fn blocked_dates(&self) -> Result<BTreeSet<String>, BookingError>;

    /// Block the date if open, unblock it if blocked; returns the new set.
    async fn toggle_blocked_date(&self, d: &str) -> Result<BTreeSet<String>, BookingError>;

    async fn special_dates(&self) -> Result<HashMap<String, String>, BookingError>;

    async fn set_special_date(&self, d: &str, label: &str) -> Result<(), BookingError>;

    async fn clear_special_date(&self, d: &str) -> Result<(), BookingError>;

    fn subscribe_price(&self) -> broadcast::Receiver<Money>;

    fn subscribe_blocked_dates(&self) -> broadcast::Receiver<BTreeSet<String>>;

    fn subscribe_special_dates(&self) -> broadcast::Receiver<HashMap<String, String>>;
}
