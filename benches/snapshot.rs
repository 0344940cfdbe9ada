use std::sync::Arc;
use std::time::{Duration, Instant};

use tablebook::engine;
use tablebook::model::*;
use tablebook::store::{BookingStore, MemoryStore};

const DAYS: u32 = 30;
const SLOTS: [&str; 4] = ["14:00-16:00", "17:00-19:00", "20:00-22:00", "22:30-00:30"];

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn draft(day: &str, slot: &str, n: usize) -> ReservationDraft {
    ReservationDraft {
        user_id: format!("user-{n}"),
        user_name: format!("User {n}"),
        user_email: format!("user{n}@example.com"),
        phone: "1155551234".into(),
        date: day.into(),
        time: slot.into(),
        people: 2,
        game: "Catan".into(),
        price_per_person: 5000,
        total: 10000,
    }
}

#[tokio::main]
async fn main() {
    let store = Arc::new(MemoryStore::new());
    for slot in SLOTS {
        store.add_time_slot(slot.into(), true).await.unwrap();
    }

    println!("seeding {} days x {} slots...", DAYS, SLOTS.len());
    let mut writes = Vec::new();
    let mut n = 0usize;
    for day in 1..=DAYS {
        let date = format!("2024-06-{day:02}");
        for slot in SLOTS {
            for _ in 0..3 {
                n += 1;
                let start = Instant::now();
                store.add_reservation(draft(&date, slot, n)).await.unwrap();
                writes.push(start.elapsed());
            }
        }
    }
    print_latency("add_reservation (no subscribers)", &mut writes);

    // writes again, now with a live snapshot subscriber fanning out
    let mut rx = store.subscribe_reservations();
    let drain = tokio::spawn(async move { while rx.recv().await.is_ok() {} });
    let mut writes = Vec::new();
    for i in 0..200 {
        n += 1;
        let start = Instant::now();
        store
            .add_reservation(draft("2024-07-01", SLOTS[i % SLOTS.len()], n))
            .await
            .unwrap();
        writes.push(start.elapsed());
    }
    print_latency("add_reservation (1 subscriber)", &mut writes);
    drain.abort();

    // the cached-scan path: one full-snapshot read, many slot computations
    let snapshot = store.reservations().await.unwrap();
    println!("snapshot size: {} reservations", snapshot.len());
    let mut scans = Vec::new();
    for i in 0..10_000 {
        let date = format!("2024-06-{:02}", (i % DAYS as usize) + 1);
        let slot = SLOTS[i % SLOTS.len()];
        let start = Instant::now();
        let a = engine::slot_availability(&snapshot, &date, slot);
        scans.push(start.elapsed());
        assert_eq!(a.total, 4);
    }
    print_latency("slot_availability (cached scan)", &mut scans);

    // the targeted-query path used when opening the booking summary
    let mut checks = Vec::new();
    for i in 0..2_000 {
        let date = format!("2024-06-{:02}", (i % DAYS as usize) + 1);
        let slot = SLOTS[i % SLOTS.len()];
        let start = Instant::now();
        let a = engine::check_slot_availability(store.as_ref(), &date, slot).await;
        checks.push(start.elapsed());
        assert_eq!(a.total, 4);
    }
    print_latency("check_slot_availability (targeted)", &mut checks);
}
