//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mediator_requests_dispatched_total` (counter)
//! - `mediator_responses_total` (counter): terminal deliveries by outcome
//! - `mediator_authorisation_retries_total` (counter)
//! - `mediator_timeouts_total` (counter): watchdog fired while still tracked
//! - `mediator_dropped_events_total` (counter): events with no live handler, by event
//! - `mediator_in_flight_requests` (gauge)

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("mediator_requests_dispatched_total", "Requests accepted for dispatch");
    describe_counter!("mediator_responses_total", "Terminal events delivered to handlers");
    describe_counter!("mediator_authorisation_retries_total", "Authorisation retry cycles started");
    describe_counter!("mediator_timeouts_total", "Requests failed by the timeout watchdog");
    describe_counter!("mediator_dropped_events_total", "Events with no live handler");
    describe_gauge!("mediator_in_flight_requests", "Requests awaiting a terminal event");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatched() {
    counter!("mediator_requests_dispatched_total").increment(1);
}

pub fn record_outcome(outcome: &'static str) {
    counter!("mediator_responses_total", "outcome" => outcome).increment(1);
}

pub fn record_authorisation_retry() {
    counter!("mediator_authorisation_retries_total").increment(1);
}

pub fn record_timeout() {
    counter!("mediator_timeouts_total").increment(1);
}

pub fn record_dropped(event: &'static str) {
    counter!("mediator_dropped_events_total", "event" => event).increment(1);
}

pub fn record_in_flight(count: usize) {
    gauge!("mediator_in_flight_requests").set(count as f64);
}
