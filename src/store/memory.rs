use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::{RwLock, broadcast};
use tracing::info;
use ulid::Ulid;

use crate::date;
use crate::engine::BookingError;
use crate::limits::*;
use crate::model::*;
use crate::notify::SnapshotChannel;
use crate::observability::{STORE_READS_TOTAL, STORE_WRITES_TOTAL};

use super::BookingStore;

#[derive(Debug, Default)]
struct Settings {
    price: Option<Money>,
    payment_alias: Option<String>,
    blocked_dates: BTreeSet<String>,
    special_dates: HashMap<String, String>,
}

/// Seed fixture shape accepted by [`MemoryStore::seed_from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Seed {
    reservations: Vec<Reservation>,
    time_slots: Vec<TimeSlot>,
    news: Vec<NewsItem>,
    free_play_tables: Vec<FreePlayTable>,
    price: Option<Money>,
    payment_alias: Option<String>,
    blocked_dates: BTreeSet<String>,
    special_dates: HashMap<String, String>,
}

/// In-process document store standing in for the remote collaborator.
///
/// Collections live in DashMaps; the settings singletons share one RwLock.
/// Every mutation publishes the owning collection's full snapshot. The
/// `offline` switch makes every call fail the way an unreachable remote
/// would, so downstream fail-closed paths can be exercised.
pub struct MemoryStore {
    reservations: DashMap<Ulid, Reservation>,
    time_slots: DashMap<Ulid, TimeSlot>,
    news: DashMap<Ulid, NewsItem>,
    free_play: DashMap<Ulid, FreePlayTable>,
    settings: RwLock<Settings>,
    offline: AtomicBool,

    reservations_tx: SnapshotChannel<Vec<Reservation>>,
    slots_tx: SnapshotChannel<Vec<TimeSlot>>,
    news_tx: SnapshotChannel<Vec<NewsItem>>,
    free_play_tx: SnapshotChannel<Vec<FreePlayTable>>,
    price_tx: SnapshotChannel<Money>,
    blocked_tx: SnapshotChannel<BTreeSet<String>>,
    special_tx: SnapshotChannel<HashMap<String, String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            reservations: DashMap::new(),
            time_slots: DashMap::new(),
            news: DashMap::new(),
            free_play: DashMap::new(),
            settings: RwLock::new(Settings::default()),
            offline: AtomicBool::new(false),
            reservations_tx: SnapshotChannel::new(),
            slots_tx: SnapshotChannel::new(),
            news_tx: SnapshotChannel::new(),
            free_play_tx: SnapshotChannel::new(),
            price_tx: SnapshotChannel::new(),
            blocked_tx: SnapshotChannel::new(),
            special_tx: SnapshotChannel::new(),
        }
    }

    /// Simulate the collaborator being unreachable. While set, every call
    /// returns a store error; subscriptions stay attached but go quiet.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Load a JSON fixture. Intended for seeding before any view attaches;
    /// nothing is published.
    pub fn seed_from_json(&self, json: &str) -> Result<(), BookingError> {
        let seed: Seed =
            serde_json::from_str(json).map_err(|e| BookingError::Store(e.to_string()))?;
        for r in seed.reservations {
            self.reservations.insert(r.id, r);
        }
        for s in seed.time_slots {
            self.time_slots.insert(s.id, s);
        }
        for n in seed.news {
            self.news.insert(n.id, n);
        }
        for t in seed.free_play_tables {
            self.free_play.insert(t.id, t);
        }
        let mut settings = self
            .settings
            .try_write()
            .map_err(|_| BookingError::Store("settings busy during seed".into()))?;
        if seed.price.is_some() {
            settings.price = seed.price;
        }
        if seed.payment_alias.is_some() {
            settings.payment_alias = seed.payment_alias;
        }
        settings.blocked_dates.extend(seed.blocked_dates);
        settings.special_dates.extend(seed.special_dates);
        Ok(())
    }

    fn guard(&self) -> Result<(), BookingError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BookingError::Store("store unreachable".into()));
        }
        Ok(())
    }

    // ── Snapshot assembly ────────────────────────────────────

    fn reservation_snapshot(&self) -> Vec<Reservation> {
        let mut list: Vec<Reservation> = self
            .reservations
            .iter()
            .map(|e| {
                let mut r = e.value().clone();
                r.date = date::normalize(&r.date);
                r
            })
            .collect();
        // newest-created-first; id breaks creation-instant ties
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list
    }

    fn slot_snapshot(&self) -> Vec<TimeSlot> {
        let mut list: Vec<TimeSlot> = self.time_slots.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| a.order.cmp(&b.order).then(a.label.cmp(&b.label)));
        list
    }

    fn news_snapshot(&self) -> Vec<NewsItem> {
        let mut list: Vec<NewsItem> = self
            .news
            .iter()
            .filter(|e| e.value().is_active)
            .map(|e| e.value().clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list
    }

    fn free_play_snapshot(&self) -> Vec<FreePlayTable> {
        let mut list: Vec<FreePlayTable> =
            self.free_play.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| a.number.cmp(&b.number).then(a.id.cmp(&b.id)));
        list
    }

    fn publish_reservations(&self) {
        self.reservations_tx.publish(self.reservation_snapshot());
    }
}

fn validate_draft(draft: &ReservationDraft) -> Result<(), BookingError> {
    if !(MIN_PEOPLE..=MAX_PEOPLE).contains(&draft.people) {
        return Err(BookingError::Validation("party size out of range"));
    }
    if draft.user_name.is_empty() || draft.user_name.len() > MAX_NAME_LEN {
        return Err(BookingError::Validation("bad customer name"));
    }
    if draft.game.is_empty() || draft.game.len() > MAX_GAME_LEN {
        return Err(BookingError::Validation("bad game name"));
    }
    if draft.phone.is_empty() || draft.phone.len() > MAX_PHONE_LEN {
        return Err(BookingError::Validation("bad phone number"));
    }
    if draft.time.is_empty() || draft.time.len() > MAX_LABEL_LEN {
        return Err(BookingError::Validation("bad slot label"));
    }
    Ok(())
}

#[async_trait]
impl BookingStore for MemoryStore {
    // ── Reservations ─────────────────────────────────────────

    async fn reservations(&self) -> Result<Vec<Reservation>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "reservations").increment(1);
        Ok(self.reservation_snapshot())
    }

    async fn reservations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "reservations").increment(1);
        let mut list = self.reservation_snapshot();
        list.retain(|r| r.user_id == user_id);
        Ok(list)
    }

    async fn reservation(&self, id: Ulid) -> Result<Option<Reservation>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "reservations").increment(1);
        Ok(self.reservations.get(&id).map(|e| {
            let mut r = e.value().clone();
            r.date = date::normalize(&r.date);
            r
        }))
    }

    async fn reservations_for_slot(
        &self,
        date: &str,
        slot: &str,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "reservations").increment(1);
        let target = date::normalize(date);
        let mut list = self.reservation_snapshot();
        list.retain(|r| r.date == target && r.time == slot);
        Ok(list)
    }

    async fn add_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, BookingError> {
        self.guard()?;
        validate_draft(&draft)?;
        let day = date::normalize(&draft.date);
        if !date::is_valid(&day) {
            return Err(BookingError::InvalidDate(draft.date));
        }

        let reservation = Reservation {
            id: Ulid::new(),
            user_id: draft.user_id,
            user_name: draft.user_name,
            user_email: draft.user_email,
            phone: draft.phone,
            date: day,
            time: draft.time,
            people: draft.people,
            game: draft.game,
            price_per_person: draft.price_per_person,
            total: draft.total,
            status: ReservationStatus::PendingPayment,
            created_at: Utc::now().to_rfc3339(),
        };
        info!(
            "reservation {} created for {} {}",
            reservation.id, reservation.date, reservation.time
        );
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "reservations").increment(1);
        self.reservations.insert(reservation.id, reservation.clone());
        self.publish_reservations();
        Ok(reservation)
    }

    async fn update_reservation(
        &self,
        id: Ulid,
        updates: ReservationUpdate,
    ) -> Result<(), BookingError> {
        self.guard()?;
        // validate everything up front; a failed edit leaves the record
        // exactly as it was
        let day = match updates.date {
            Some(raw) => {
                let day = date::normalize(&raw);
                if !date::is_valid(&day) {
                    return Err(BookingError::InvalidDate(raw));
                }
                Some(day)
            }
            None => None,
        };
        if let Some(people) = updates.people
            && !(MIN_PEOPLE..=MAX_PEOPLE).contains(&people)
        {
            return Err(BookingError::Validation("party size out of range"));
        }

        let mut entry = self
            .reservations
            .get_mut(&id)
            .ok_or(BookingError::NotFound(id))?;
        if let Some(day) = day {
            entry.date = day;
        }
        if let Some(people) = updates.people {
            entry.people = people;
        }
        if let Some(time) = updates.time {
            entry.time = time;
        }
        if let Some(name) = updates.user_name {
            entry.user_name = name;
        }
        if let Some(phone) = updates.phone {
            entry.phone = phone;
        }
        if let Some(game) = updates.game {
            entry.game = game;
        }
        if let Some(status) = updates.status {
            entry.status = status;
        }
        drop(entry);

        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "reservations").increment(1);
        self.publish_reservations();
        Ok(())
    }

    async fn delete_reservation(&self, id: Ulid) -> Result<(), BookingError> {
        self.guard()?;
        // deleting an already-gone document is a success, as in any
        // last-write-wins document store
        if self.reservations.remove(&id).is_some() {
            info!("reservation {id} deleted");
            metrics::counter!(STORE_WRITES_TOTAL, "collection" => "reservations").increment(1);
            self.publish_reservations();
        }
        Ok(())
    }

    fn subscribe_reservations(&self) -> broadcast::Receiver<Vec<Reservation>> {
        self.reservations_tx.subscribe()
    }

    // ── Time slots ───────────────────────────────────────────

    async fn time_slots(&self) -> Result<Vec<TimeSlot>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "time_slots").increment(1);
        Ok(self.slot_snapshot())
    }

    async fn add_time_slot(&self, label: String, active: bool) -> Result<TimeSlot, BookingError> {
        self.guard()?;
        if label.trim().is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(BookingError::Validation("bad slot label"));
        }
        let next_order = self
            .time_slots
            .iter()
            .map(|e| e.value().order)
            .max()
            .unwrap_or(0)
            + 1;
        let slot = TimeSlot {
            id: Ulid::new(),
            label,
            active,
            order: next_order,
        };
        info!("time slot {} \"{}\" added at rank {}", slot.id, slot.label, slot.order);
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "time_slots").increment(1);
        self.time_slots.insert(slot.id, slot.clone());
        self.slots_tx.publish(self.slot_snapshot());
        Ok(slot)
    }

    async fn toggle_time_slot(&self, id: Ulid) -> Result<bool, BookingError> {
        self.guard()?;
        let now_active = {
            let mut entry = self
                .time_slots
                .get_mut(&id)
                .ok_or(BookingError::NotFound(id))?;
            entry.active = !entry.active;
            entry.active
        };
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "time_slots").increment(1);
        self.slots_tx.publish(self.slot_snapshot());
        Ok(now_active)
    }

    async fn delete_time_slot(&self, id: Ulid) -> Result<(), BookingError> {
        self.guard()?;
        // reservations referencing the label stay valid and keep counting
        if self.time_slots.remove(&id).is_some() {
            metrics::counter!(STORE_WRITES_TOTAL, "collection" => "time_slots").increment(1);
            self.slots_tx.publish(self.slot_snapshot());
        }
        Ok(())
    }

    fn subscribe_time_slots(&self) -> broadcast::Receiver<Vec<TimeSlot>> {
        self.slots_tx.subscribe()
    }

    // ── News ─────────────────────────────────────────────────

    async fn news(&self) -> Result<Vec<NewsItem>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "news").increment(1);
        Ok(self.news_snapshot())
    }

    async fn add_news(
        &self,
        title: String,
        description: String,
        image: Option<String>,
    ) -> Result<NewsItem, BookingError> {
        self.guard()?;
        if title.trim().is_empty() || title.len() > MAX_NEWS_TITLE_LEN {
            return Err(BookingError::Validation("bad news title"));
        }
        if description.trim().is_empty() || description.len() > MAX_NEWS_BODY_LEN {
            return Err(BookingError::Validation("bad news description"));
        }
        let item = NewsItem {
            id: Ulid::new(),
            title,
            description,
            image,
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        };
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "news").increment(1);
        self.news.insert(item.id, item.clone());
        self.news_tx.publish(self.news_snapshot());
        Ok(item)
    }

    async fn delete_news(&self, id: Ulid) -> Result<(), BookingError> {
        self.guard()?;
        if self.news.remove(&id).is_some() {
            metrics::counter!(STORE_WRITES_TOTAL, "collection" => "news").increment(1);
            self.news_tx.publish(self.news_snapshot());
        }
        Ok(())
    }

    fn subscribe_news(&self) -> broadcast::Receiver<Vec<NewsItem>> {
        self.news_tx.subscribe()
    }

    // ── Free-play tables ─────────────────────────────────────

    async fn free_play_tables(&self) -> Result<Vec<FreePlayTable>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "free_play").increment(1);
        Ok(self.free_play_snapshot())
    }

    async fn free_play_table(&self, id: Ulid) -> Result<Option<FreePlayTable>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "free_play").increment(1);
        Ok(self.free_play.get(&id).map(|e| e.value().clone()))
    }

    async fn add_free_play_table(
        &self,
        draft: FreePlayTableDraft,
    ) -> Result<FreePlayTable, BookingError> {
        self.guard()?;
        if draft.number == 0 {
            return Err(BookingError::Validation("bad table number"));
        }
        if draft.game.trim().is_empty() || draft.game.len() > MAX_GAME_LEN {
            return Err(BookingError::Validation("bad game name"));
        }
        if draft.capacity == 0 {
            return Err(BookingError::Validation("bad capacity"));
        }
        let day = match draft.date {
            Some(raw) => {
                let day = date::normalize(&raw);
                if !date::is_valid(&day) {
                    return Err(BookingError::InvalidDate(raw));
                }
                Some(day)
            }
            None => None,
        };
        let table = FreePlayTable {
            id: Ulid::new(),
            number: draft.number,
            game: draft.game,
            capacity: draft.capacity,
            date: day,
            time_range: draft.time_range,
            players: Vec::new(),
        };
        info!("free-play table {} (#{}) added", table.id, table.number);
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "free_play").increment(1);
        self.free_play.insert(table.id, table.clone());
        self.free_play_tx.publish(self.free_play_snapshot());
        Ok(table)
    }

    async fn update_free_play_table(
        &self,
        id: Ulid,
        updates: FreePlayTableUpdate,
    ) -> Result<(), BookingError> {
        self.guard()?;
        if let Some(number) = updates.number
            && number == 0
        {
            return Err(BookingError::Validation("bad table number"));
        }
        if let Some(game) = &updates.game
            && (game.trim().is_empty() || game.len() > MAX_GAME_LEN)
        {
            return Err(BookingError::Validation("bad game name"));
        }
        let day = match updates.date {
            Some(Some(raw)) => {
                let day = date::normalize(&raw);
                if !date::is_valid(&day) {
                    return Err(BookingError::InvalidDate(raw));
                }
                Some(Some(day))
            }
            Some(None) => Some(None),
            None => None,
        };
        {
            let mut entry = self
                .free_play
                .get_mut(&id)
                .ok_or(BookingError::NotFound(id))?;
            if let Some(capacity) = updates.capacity {
                if capacity == 0 {
                    return Err(BookingError::Validation("bad capacity"));
                }
                if (capacity as usize) < entry.players.len() {
                    return Err(BookingError::Validation("capacity below current sign-ups"));
                }
                entry.capacity = capacity;
            }
            if let Some(number) = updates.number {
                entry.number = number;
            }
            if let Some(game) = updates.game {
                entry.game = game;
            }
            if let Some(day) = day {
                entry.date = day;
            }
            if let Some(tr) = updates.time_range {
                entry.time_range = tr;
            }
        }
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "free_play").increment(1);
        self.free_play_tx.publish(self.free_play_snapshot());
        Ok(())
    }

    async fn delete_free_play_table(&self, id: Ulid) -> Result<(), BookingError> {
        self.guard()?;
        if self.free_play.remove(&id).is_some() {
            metrics::counter!(STORE_WRITES_TOTAL, "collection" => "free_play").increment(1);
            self.free_play_tx.publish(self.free_play_snapshot());
        }
        Ok(())
    }

    async fn join_free_play_table(&self, id: Ulid, player: Player) -> Result<(), BookingError> {
        self.guard()?;
        {
            // re-read current state right before mutating; a stale view of
            // the table must not let a 5th player onto a 4-seat table
            let mut entry = self
                .free_play
                .get_mut(&id)
                .ok_or(BookingError::NotFound(id))?;
            if entry.players.iter().any(|p| p.user_id == player.user_id) {
                return Err(BookingError::AlreadyJoined);
            }
            if entry.players.len() >= entry.capacity as usize {
                return Err(BookingError::TableFull(entry.capacity));
            }
            entry.players.push(player);
        }
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "free_play").increment(1);
        self.free_play_tx.publish(self.free_play_snapshot());
        Ok(())
    }

    async fn leave_free_play_table(&self, id: Ulid, user_id: &str) -> Result<(), BookingError> {
        self.guard()?;
        {
            let mut entry = self
                .free_play
                .get_mut(&id)
                .ok_or(BookingError::NotFound(id))?;
            entry.players.retain(|p| p.user_id != user_id);
        }
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "free_play").increment(1);
        self.free_play_tx.publish(self.free_play_snapshot());
        Ok(())
    }

    fn subscribe_free_play_tables(&self) -> broadcast::Receiver<Vec<FreePlayTable>> {
        self.free_play_tx.subscribe()
    }

    // ── Settings singletons ──────────────────────────────────

    async fn price(&self) -> Result<Money, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "settings").increment(1);
        Ok(self.settings.read().await.price.unwrap_or(DEFAULT_PRICE))
    }

    async fn set_price(&self, value: Money) -> Result<(), BookingError> {
        self.guard()?;
        if value <= 0 {
            return Err(BookingError::Validation("price must be positive"));
        }
        self.settings.write().await.price = Some(value);
        info!("price set to {value}");
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "settings").increment(1);
        self.price_tx.publish(value);
        Ok(())
    }

    async fn payment_alias(&self) -> Result<String, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "settings").increment(1);
        Ok(self
            .settings
            .read()
            .await
            .payment_alias
            .clone()
            .unwrap_or_else(|| DEFAULT_PAYMENT_ALIAS.to_string()))
    }

    async fn set_payment_alias(&self, alias: String) -> Result<(), BookingError> {
        self.guard()?;
        let alias = alias.trim().to_string();
        if alias.is_empty() || alias.len() > MAX_ALIAS_LEN {
            return Err(BookingError::Validation("bad payment alias"));
        }
        self.settings.write().await.payment_alias = Some(alias);
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "settings").increment(1);
        Ok(())
    }

    async fn blocked_dates(&self) -> Result<BTreeSet<String>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "settings").increment(1);
        Ok(self.settings.read().await.blocked_dates.clone())
    }

    async fn toggle_blocked_date(&self, d: &str) -> Result<BTreeSet<String>, BookingError> {
        self.guard()?;
        let day = date::normalize(d);
        if !date::is_valid(&day) {
            return Err(BookingError::InvalidDate(d.to_string()));
        }
        let snapshot = {
            let mut settings = self.settings.write().await;
            if !settings.blocked_dates.remove(&day) {
                settings.blocked_dates.insert(day.clone());
            }
            settings.blocked_dates.clone()
        };
        info!("blocked dates toggled at {day}, now {} entries", snapshot.len());
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "settings").increment(1);
        self.blocked_tx.publish(snapshot.clone());
        Ok(snapshot)
    }

    async fn special_dates(&self) -> Result<HashMap<String, String>, BookingError> {
        self.guard()?;
        metrics::counter!(STORE_READS_TOTAL, "collection" => "settings").increment(1);
        Ok(self.settings.read().await.special_dates.clone())
    }

    async fn set_special_date(&self, d: &str, label: &str) -> Result<(), BookingError> {
        self.guard()?;
        let day = date::normalize(d);
        if !date::is_valid(&day) {
            return Err(BookingError::InvalidDate(d.to_string()));
        }
        let label = label.trim();
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(BookingError::Validation("bad special-date label"));
        }
        let snapshot = {
            let mut settings = self.settings.write().await;
            settings.special_dates.insert(day, label.to_string());
            settings.special_dates.clone()
        };
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "settings").increment(1);
        self.special_tx.publish(snapshot);
        Ok(())
    }

    async fn clear_special_date(&self, d: &str) -> Result<(), BookingError> {
        self.guard()?;
        let day = date::normalize(d);
        let snapshot = {
            let mut settings = self.settings.write().await;
            settings.special_dates.remove(&day);
            settings.special_dates.clone()
        };
        metrics::counter!(STORE_WRITES_TOTAL, "collection" => "settings").increment(1);
        self.special_tx.publish(snapshot);
        Ok(())
    }

    fn subscribe_price(&self) -> broadcast::Receiver<Money> {
        self.price_tx.subscribe()
    }

    fn subscribe_blocked_dates(&self) -> broadcast::Receiver<BTreeSet<String>> {
        self.blocked_tx.subscribe()
    }

    fn subscribe_special_dates(&self) -> broadcast::Receiver<HashMap<String, String>> {
        self.special_tx.subscribe()
    }
}
