use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use tablebook::admin::AdminPanel;
use tablebook::booking::{BookingFlow, GameChoice};
use tablebook::model::*;
use tablebook::store::{BookingStore, MemoryStore};
use tablebook::sync::{ViewEvent, ViewSession};

const DAY: &str = "2024-06-01";
const SLOT: &str = "17:00-19:00";

// ── Test infrastructure ──────────────────────────────────────

async fn start_session(
    store: &Arc<MemoryStore>,
) -> (ViewSession, mpsc::UnboundedReceiver<ViewEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = ViewSession::start(store.clone() as Arc<dyn BookingStore>, tx)
        .await
        .unwrap();
    (session, rx)
}

fn user(n: usize) -> UserProfile {
    UserProfile {
        user_id: format!("user-{n}"),
        name: format!("User {n}"),
        email: format!("user{n}@example.com"),
    }
}

async fn recv_event(
    rx: &mut mpsc::UnboundedReceiver<ViewEvent>,
    timeout: Duration,
) -> Option<ViewEvent> {
    tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
}

/// Drain events until the next slot redraw.
async fn wait_for_slots(
    rx: &mut mpsc::UnboundedReceiver<ViewEvent>,
) -> Vec<SlotAvailability> {
    loop {
        match recv_event(rx, Duration::from_secs(2)).await {
            Some(ViewEvent::SlotsChanged { slots, .. }) => return slots,
            Some(_) => continue,
            None => panic!("no slot redraw arrived"),
        }
    }
}

async fn ready_flow(store: &Arc<MemoryStore>, n: usize) -> BookingFlow {
    let (session, _rx) = start_session(store).await;
    let mut flow = BookingFlow::new(session, user(n));
    flow.select_date(DAY).await.unwrap();
    flow.select_slot(SLOT).await.unwrap();
    flow.set_game(GameChoice::Named("Catan".into()));
    flow.set_phone("+54 11 5555-1234");
    flow
}

// ── Live propagation ─────────────────────────────────────────

#[tokio::test]
async fn another_clients_booking_redraws_the_slot_list() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot(SLOT.into(), true).await.unwrap();

    let (session, mut rx) = start_session(&store).await;
    let initial = session.select_date(DAY).await.unwrap();
    assert_eq!(initial[0].availability.spots_left, 4);

    // another customer books the same slot from a different client
    let other = ready_flow(&store, 2).await;
    other.confirm().await.unwrap();

    // skip past the redraw echoed by select_date itself
    let entry = loop {
        let slots = wait_for_slots(&mut rx).await;
        let entry = slots.iter().find(|s| s.slot.label == SLOT).unwrap().clone();
        if entry.availability.spots_left < 4 {
            break entry;
        }
    };
    assert_eq!(entry.availability.spots_left, 3);
    assert!(entry.availability.available);
}

#[tokio::test]
async fn no_recompute_without_a_selected_date() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot(SLOT.into(), true).await.unwrap();

    let (_session, mut rx) = start_session(&store).await;
    // nothing selected — a delivery must not trigger a slot redraw
    let other = ready_flow(&store, 2).await;
    other.confirm().await.unwrap();

    assert!(recv_event(&mut rx, Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn slot_catalog_deliveries_arrive_sorted_by_rank() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot("20:00-22:00".into(), true).await.unwrap();

    let (session, mut rx) = start_session(&store).await;
    session.select_date(DAY).await.unwrap();
    let _ = wait_for_slots(&mut rx).await;

    store.add_time_slot("14:00-16:00".into(), true).await.unwrap();
    store.add_time_slot(SLOT.into(), true).await.unwrap();

    let mut slots = wait_for_slots(&mut rx).await;
    // catch the delivery containing all three
    while slots.len() < 3 {
        slots = wait_for_slots(&mut rx).await;
    }
    let ranks: Vec<i64> = slots.iter().map(|s| s.slot.order).collect();
    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    assert_eq!(ranks, sorted);

    let cached = session.time_slots().await;
    assert!(cached.windows(2).all(|w| w[0].order <= w[1].order));
}

// ── Price mid-flow ───────────────────────────────────────────

#[tokio::test]
async fn price_change_updates_an_open_summary_live() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot(SLOT.into(), true).await.unwrap();

    let (session, mut rx) = start_session(&store).await;
    let mut flow = BookingFlow::new(session, user(1));
    flow.select_date(DAY).await.unwrap();
    flow.select_slot(SLOT).await.unwrap();
    flow.set_people(3).await;
    flow.set_game(GameChoice::DecideAtVenue);
    flow.set_phone("1155551234");

    let summary = flow.open_summary().await.unwrap();
    assert_eq!(summary.total, 15000);
    assert_eq!(summary.payment_alias, "ALIAS.DE.EJEMPLO");

    // the opening itself announces the current total; drain it first
    loop {
        match recv_event(&mut rx, Duration::from_secs(2)).await {
            Some(ViewEvent::SummaryTotal { total }) => {
                assert_eq!(total, 15000);
                break;
            }
            Some(_) => continue,
            None => panic!("no summary total after opening"),
        }
    }

    // an admin changes the price while the summary is on screen
    store.set_price(6000).await.unwrap();

    let mut saw_total = None;
    for _ in 0..4 {
        match recv_event(&mut rx, Duration::from_secs(2)).await {
            Some(ViewEvent::SummaryTotal { total }) => {
                saw_total = Some(total);
                break;
            }
            Some(_) => continue,
            None => break,
        }
    }
    assert_eq!(saw_total, Some(18000));

    // confirming now snapshots the new price for good
    let reservation = flow.confirm().await.unwrap();
    assert_eq!(reservation.price_per_person, 6000);
    assert_eq!(reservation.total, 18000);

    store.set_price(9999).await.unwrap();
    let all = store.reservations().await.unwrap();
    assert_eq!(all[0].total, 18000);
    assert_eq!(all[0].price_per_person, 6000);
}

// ── Calendar overrides ───────────────────────────────────────

#[tokio::test]
async fn blocked_dates_propagate_and_refuse_selection() {
    let store = Arc::new(MemoryStore::new());
    let (session, mut rx) = start_session(&store).await;

    store.toggle_blocked_date(DAY).await.unwrap();

    match recv_event(&mut rx, Duration::from_secs(2)).await {
        Some(ViewEvent::CalendarChanged) => {}
        other => panic!("expected calendar redraw, got {other:?}"),
    }

    let result = session.select_date(DAY).await;
    assert!(result.is_err());
    assert!(session.selected_date().await.is_none());
}

// ── Teardown ─────────────────────────────────────────────────

#[tokio::test]
async fn closed_session_delivers_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot(SLOT.into(), true).await.unwrap();

    let (mut session, mut rx) = start_session(&store).await;
    session.select_date(DAY).await.unwrap();
    let _ = wait_for_slots(&mut rx).await;

    session.close();

    let other = ready_flow(&store, 2).await;
    other.confirm().await.unwrap();

    assert!(recv_event(&mut rx, Duration::from_millis(300)).await.is_none());
}

// ── Admin flow ───────────────────────────────────────────────

#[tokio::test]
async fn admin_confirmation_lights_the_notifications_badge() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot(SLOT.into(), true).await.unwrap();

    let flow = ready_flow(&store, 1).await;
    let reservation = flow.confirm().await.unwrap();
    assert!(!flow.session().has_confirmed_reservation("user-1").await);

    let admin = AdminPanel::new(store.clone() as Arc<dyn BookingStore>);
    admin.confirm_reservation(reservation.id).await.unwrap();

    // the status change reaches the customer's mirror via subscription
    let mut confirmed = false;
    for _ in 0..40 {
        if flow.session().has_confirmed_reservation("user-1").await {
            confirmed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(confirmed);
}

// ── The unguarded confirm path ───────────────────────────────

#[tokio::test]
async fn simultaneous_confirms_can_exceed_the_cap() {
    let store = Arc::new(MemoryStore::new());
    store.add_time_slot(SLOT.into(), true).await.unwrap();
    for n in 0..3 {
        ready_flow(&store, 10 + n).await.confirm().await.unwrap();
    }

    // both customers open their summary while one spot is left
    let flow_a = ready_flow(&store, 1).await;
    let flow_b = ready_flow(&store, 2).await;
    flow_a.open_summary().await.unwrap();
    flow_b.open_summary().await.unwrap();

    // neither confirm re-reads occupancy, so both writes land
    flow_a.confirm().await.unwrap();
    flow_b.confirm().await.unwrap();

    let all = store.reservations().await.unwrap();
    assert_eq!(tablebook::engine::occupied_count(&all, DAY, SLOT), 5);
    let availability = tablebook::engine::slot_availability(&all, DAY, SLOT);
    assert!(!availability.available);
    assert_eq!(availability.spots_left, 0);
}
