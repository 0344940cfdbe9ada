use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: store reads. Labels: collection.
pub const STORE_READS_TOTAL: &str = "tablebook_store_reads_total";

/// Counter: store writes (create/update/delete). Labels: collection.
pub const STORE_WRITES_TOTAL: &str = "tablebook_store_writes_total";

/// Counter: availability checks against the store.
pub const AVAILABILITY_CHECKS_TOTAL: &str = "tablebook_availability_checks_total";

/// Counter: availability checks answered fail-closed after a read error.
pub const AVAILABILITY_FAIL_CLOSED_TOTAL: &str = "tablebook_availability_fail_closed_total";

/// Counter: reservations created by the booking flow.
pub const RESERVATIONS_CREATED_TOTAL: &str = "tablebook_reservations_created_total";

// ── USE metrics (data motion) ───────────────────────────────────

/// Counter: snapshot broadcasts published across all collections.
pub const SNAPSHOTS_PUBLISHED_TOTAL: &str = "tablebook_snapshots_published_total";

/// Counter: view events emitted by live sessions.
pub const VIEW_EVENTS_TOTAL: &str = "tablebook_view_events_total";

/// Gauge: live view sessions.
pub const SESSIONS_ACTIVE: &str = "tablebook_sessions_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install the fmt tracing subscriber. Call once from the embedding app.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
