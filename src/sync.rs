//! Subscription-driven mirrors of the store, one session per open view.
//!
//! A [`ViewSession`] owns a local copy of everything a booking view needs
//! (reservations, the slot catalog, calendar overrides, the current price)
//! and keeps it current by replacing the whole mirror on every snapshot
//! delivery. Instead of touching a UI it emits [`ViewEvent`]s; the
//! presentation layer decides what a redraw means.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::date;
use crate::engine::{BookingError, slot_availability};
use crate::limits::{MAX_PEOPLE, MIN_PEOPLE};
use crate::model::*;
use crate::observability::{SESSIONS_ACTIVE, VIEW_EVENTS_TOTAL};
use crate::store::BookingStore;

/// Redraw triggers emitted by a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The slot list for the selected date needs redrawing.
    SlotsChanged {
        date: String,
        slots: Vec<SlotAvailability>,
    },
    /// Blocked or special dates changed; the calendar needs redrawing.
    CalendarChanged,
    /// The venue price changed.
    PriceChanged { price: Money },
    /// An open booking summary's total changed (live, mid-flow).
    SummaryTotal { total: Money },
    NewsChanged(Vec<NewsItem>),
    FreePlayChanged(Vec<FreePlayTable>),
}

#[derive(Debug)]
struct ViewState {
    reservations: Vec<Reservation>,
    time_slots: Vec<TimeSlot>,
    blocked_dates: BTreeSet<String>,
    special_dates: HashMap<String, String>,
    price: Money,
    selected_date: Option<String>,
    people: u8,
    summary_open: bool,
}

/// Active slots paired with availability computed from the cached mirror.
fn availability_by_slot(state: &ViewState, day: &str) -> Vec<SlotAvailability> {
    state
        .time_slots
        .iter()
        .filter(|s| s.active)
        .map(|s| SlotAvailability {
            slot: s.clone(),
            availability: slot_availability(&state.reservations, day, &s.label),
        })
        .collect()
}

fn emit(events: &mpsc::UnboundedSender<ViewEvent>, event: ViewEvent) {
    metrics::counter!(VIEW_EVENTS_TOTAL).increment(1);
    // the view may already be gone; deliveries after teardown are dropped
    let _ = events.send(event);
}

/// One open view's mirror of the store, torn down with the view.
///
/// Created at view initialization, never a global: `close()` (or drop)
/// cancels every subscription so no callback ever fires against a dead UI.
pub struct ViewSession {
    store: Arc<dyn BookingStore>,
    state: Arc<RwLock<ViewState>>,
    events: mpsc::UnboundedSender<ViewEvent>,
    tasks: Vec<JoinHandle<()>>,
    closed: bool,
}

impl ViewSession {
    /// Populate the mirror with one eager read per collection, then attach
    /// the continuous subscriptions.
    ///
    /// The reservations read happens before anything else so availability
    /// is never computed against an unpopulated cache.
    pub async fn start(
        store: Arc<dyn BookingStore>,
        events: mpsc::UnboundedSender<ViewEvent>,
    ) -> Result<Self, BookingError> {
        let state = Arc::new(RwLock::new(ViewState {
            reservations: store.reservations().await?,
            time_slots: store.time_slots().await?,
            blocked_dates: store.blocked_dates().await?,
            special_dates: store.special_dates().await?,
            price: store.price().await?,
            selected_date: None,
            people: MIN_PEOPLE,
            summary_open: false,
        }));

        let mut tasks = Vec::new();

        // reservations: replace the cache; recompute slots only while a
        // date is selected — with nothing selected there is nothing to draw
        {
            let mut rx = store.subscribe_reservations();
            let state = state.clone();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(snapshot) => {
                            let mut st = state.write().await;
                            st.reservations = snapshot;
                            if let Some(day) = st.selected_date.clone() {
                                let slots = availability_by_slot(&st, &day);
                                drop(st);
                                emit(&events, ViewEvent::SlotsChanged { date: day, slots });
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            debug!("reservations subscription lagged by {n}, catching up");
                        }
                        Err(_) => break,
                    }
                }
            }));
        }

        // slot catalog: re-sort by rank on every delivery, before anything
        // downstream sees the list
        {
            let mut rx = store.subscribe_time_slots();
            let state = state.clone();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(mut snapshot) => {
                            snapshot.sort_by(|a, b| {
                                a.order.cmp(&b.order).then(a.label.cmp(&b.label))
                            });
                            let mut st = state.write().await;
                            st.time_slots = snapshot;
                            if let Some(day) = st.selected_date.clone() {
                                let slots = availability_by_slot(&st, &day);
                                drop(st);
                                emit(&events, ViewEvent::SlotsChanged { date: day, slots });
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }));
        }

        // blocked dates
        {
            let mut rx = store.subscribe_blocked_dates();
            let state = state.clone();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(snapshot) => {
                            state.write().await.blocked_dates = snapshot;
                            emit(&events, ViewEvent::CalendarChanged);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }));
        }

        // special dates
        {
            let mut rx = store.subscribe_special_dates();
            let state = state.clone();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(snapshot) => {
                            state.write().await.special_dates = snapshot;
                            emit(&events, ViewEvent::CalendarChanged);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }));
        }

        // price: reflected live into an open booking summary, before any
        // reservation is persisted
        {
            let mut rx = store.subscribe_price();
            let state = state.clone();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(price) => {
                            let mut st = state.write().await;
                            st.price = price;
                            let open_total =
                                st.summary_open.then(|| price * st.people as Money);
                            drop(st);
                            emit(&events, ViewEvent::PriceChanged { price });
                            if let Some(total) = open_total {
                                emit(&events, ViewEvent::SummaryTotal { total });
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }));
        }

        // news and free-play snapshots go straight to the view
        {
            let mut rx = store.subscribe_news();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(snapshot) => emit(&events, ViewEvent::NewsChanged(snapshot)),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }));
        }
        {
            let mut rx = store.subscribe_free_play_tables();
            let events = events.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(snapshot) => emit(&events, ViewEvent::FreePlayChanged(snapshot)),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }));
        }

        metrics::gauge!(SESSIONS_ACTIVE).increment(1.0);
        info!("view session started with {} subscriptions", tasks.len());

        Ok(Self {
            store,
            state,
            events,
            tasks,
            closed: false,
        })
    }

    pub fn store(&self) -> Arc<dyn BookingStore> {
        self.store.clone()
    }

    // ── Selection ────────────────────────────────────────────

    /// Select a calendar date and get the slot list for it. Blocked dates
    /// are never selectable.
    pub async fn select_date(&self, day: &str) -> Result<Vec<SlotAvailability>, BookingError> {
        if !date::is_valid(day) {
            return Err(BookingError::InvalidDate(day.to_string()));
        }
        let mut st = self.state.write().await;
        if st.blocked_dates.contains(day) {
            return Err(BookingError::DateBlocked(day.to_string()));
        }
        st.selected_date = Some(day.to_string());
        let slots = availability_by_slot(&st, day);
        drop(st);
        emit(
            &self.events,
            ViewEvent::SlotsChanged {
                date: day.to_string(),
                slots: slots.clone(),
            },
        );
        Ok(slots)
    }

    pub async fn clear_selected_date(&self) {
        self.state.write().await.selected_date = None;
    }

    pub async fn selected_date(&self) -> Option<String> {
        self.state.read().await.selected_date.clone()
    }

    /// Set the party size, clamped to the venue bounds; returns the value
    /// actually stored.
    pub async fn set_people(&self, people: u8) -> u8 {
        let clamped = people.clamp(MIN_PEOPLE, MAX_PEOPLE);
        self.state.write().await.people = clamped;
        clamped
    }

    pub async fn people(&self) -> u8 {
        self.state.read().await.people
    }

    /// Mark the booking summary open. While open, price changes re-emit
    /// the total live.
    pub async fn open_summary(&self) {
        let total = {
            let mut st = self.state.write().await;
            st.summary_open = true;
            st.price * st.people as Money
        };
        emit(&self.events, ViewEvent::SummaryTotal { total });
    }

    pub async fn close_summary(&self) {
        self.state.write().await.summary_open = false;
    }

    // ── Mirror reads ─────────────────────────────────────────

    pub async fn price(&self) -> Money {
        self.state.read().await.price
    }

    /// Current summary total: price × party size.
    pub async fn summary_total(&self) -> Money {
        let st = self.state.read().await;
        st.price * st.people as Money
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.read().await.reservations.clone()
    }

    pub async fn time_slots(&self) -> Vec<TimeSlot> {
        self.state.read().await.time_slots.clone()
    }

    pub async fn blocked_dates(&self) -> BTreeSet<String> {
        self.state.read().await.blocked_dates.clone()
    }

    pub async fn special_dates(&self) -> HashMap<String, String> {
        self.state.read().await.special_dates.clone()
    }

    /// Availability per active slot for an arbitrary date, computed from
    /// the cached mirror: the many-slots-at-once path, no store query per
    /// slot.
    pub async fn availability_for(&self, day: &str) -> Vec<SlotAvailability> {
        let st = self.state.read().await;
        availability_by_slot(&st, day)
    }

    /// Whether the user has any confirmed reservation; drives the
    /// notifications badge.
    pub async fn has_confirmed_reservation(&self, user_id: &str) -> bool {
        self.state
            .read()
            .await
            .reservations
            .iter()
            .any(|r| r.user_id == user_id && r.status == ReservationStatus::Confirmed)
    }

    // ── Teardown ─────────────────────────────────────────────

    /// Cancel every subscription. No view event is emitted afterwards.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        metrics::gauge!(SESSIONS_ACTIVE).decrement(1.0);
        info!("view session closed");
    }
}

impl Drop for ViewSession {
    fn drop(&mut self) {
        self.close();
    }
}
