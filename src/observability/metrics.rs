//! Metrics collection and exposition.
//!
//! # Metrics
//! - `node_transitions_total` (counter): transitions by kind, outcome
//! - `node_transition_duration_seconds` (histogram): time from registration
//!   to commit or abort, by kind
//! - `node_subsystem_failures_total` (counter): failed start/stop calls by
//!   subsystem
//! - `node_state` (gauge): 0=stopped, 1=starting, 2=started, 3=stopping

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::Subsystem;
use crate::lifecycle::state::{NodeState, TransitionKind};

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %e, address = %addr, "Failed to install Prometheus exporter");
        return;
    }

    describe_counter!("node_transitions_total", "Lifecycle transitions by kind and outcome");
    describe_histogram!("node_transition_duration_seconds", "Lifecycle transition duration in seconds");
    describe_counter!("node_subsystem_failures_total", "Subsystem start/stop failures");
    describe_gauge!("node_state", "Current node state");

    tracing::info!(address = %addr, "Prometheus metrics exporter started");
}

/// Outcome label for a settled transition.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Committed,
    Aborted,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Committed => "committed",
            Outcome::Aborted => "aborted",
        }
    }
}

pub fn record_transition(kind: TransitionKind, outcome: Outcome, started: Instant) {
    counter!("node_transitions_total", "kind" => kind.as_str(), "outcome" => outcome.as_str()).increment(1);
    histogram!("node_transition_duration_seconds", "kind" => kind.as_str()).record(started.elapsed().as_secs_f64());
}

pub fn record_subsystem_failure(subsystem: Subsystem) {
    counter!("node_subsystem_failures_total", "subsystem" => subsystem.as_str()).increment(1);
}

pub fn record_state(state: NodeState) {
    let value = match state {
        NodeState::Stopped => 0.0,
        NodeState::Starting => 1.0,
        NodeState::Started => 2.0,
        NodeState::Stopping => 3.0,
    };
    gauge!("node_state").set(value);
}
