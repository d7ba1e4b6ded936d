//! Metrics collection and exposition.
//!
//! # Metrics
//! - `push_router_requests_total` (counter): requests by method, status
//! - `push_router_request_duration_seconds` (histogram): latency by method
//! - `push_router_connected_clients` (gauge): open push streams
//! - `push_router_emits_total` (counter): `emit` calls that reached members
//! - `push_router_frames_total` (counter): frames by outcome
//!   (delivered, dropped, failed)
//! - `push_router_reaped_clients_total` (counter)
//! - `push_router_lifecycle_events_total` (counter): by kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and serves its own scrape endpoint

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::push::{Delivery, LifecycleKind};

/// Install the Prometheus recorder with an HTTP listener on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "push_router_requests_total",
        "method" => method.to_owned(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "push_router_request_duration_seconds",
        "method" => method.to_owned()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_connected_clients(count: usize) {
    metrics::gauge!("push_router_connected_clients").set(count as f64);
}

pub fn record_emit(delivery: &Delivery) {
    metrics::counter!("push_router_emits_total").increment(1);
    for (outcome, count) in [
        ("delivered", delivery.delivered),
        ("dropped", delivery.dropped),
        ("failed", delivery.failed),
    ] {
        if count > 0 {
            metrics::counter!("push_router_frames_total", "outcome" => outcome)
                .increment(count as u64);
        }
    }
    if delivery.reaped > 0 {
        metrics::counter!("push_router_reaped_clients_total").increment(delivery.reaped as u64);
    }
}

pub fn record_lifecycle(kind: LifecycleKind) {
    metrics::counter!("push_router_lifecycle_events_total", "kind" => kind.as_str()).increment(1);
}
