//! Metrics aggregator.
//!
//! Counters fed by the packet lifecycle and by synthetic access denials.
//! The average response time is the exact arithmetic mean of every sample
//! since the last reset, recomputed from the full history on each sample.

use serde::{Deserialize, Serialize};

use crate::packet::PacketKind;

/// Read-only view of the aggregated metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Packets spawned (automatic or injected).
    pub total_packets: u64,
    /// Connection gauge set at the end of the last tick.
    pub active_connections: usize,
    /// Packets of kind [`PacketKind::Auth`].
    pub auth_requests: u64,
    /// Denied accesses, from spawns and from failing components.
    pub denied_access: u64,
    /// Mean simulated response time in milliseconds, 0 without samples.
    pub avg_response_time: f64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "packets={} connections={} auth={} denied={} avg_response={:.2}ms",
            self.total_packets,
            self.active_connections,
            self.auth_requests,
            self.denied_access,
            self.avg_response_time
        )
    }
}

/// Aggregates simulation metrics.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    total_packets: u64,
    active_connections: usize,
    auth_requests: u64,
    denied_access: u64,
    /// Every response-time sample since the last reset.
    response_times: Vec<f64>,
    avg_response_time: f64,
}

impl Metrics {
    /// Create an aggregator with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a spawned packet.
    pub fn record_packet(&mut self, kind: PacketKind) {
        self.total_packets += 1;
        if kind == PacketKind::Auth {
            self.auth_requests += 1;
        }
    }

    /// Count a denied access.
    pub fn record_denied_access(&mut self) {
        self.denied_access += 1;
    }

    /// Add a response-time sample and recompute the mean over all samples.
    pub fn record_response_time(&mut self, millis: f64) {
        self.response_times.push(millis);
        let sum: f64 = self.response_times.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.response_times.len() as f64;
        self.avg_response_time = sum / count;
    }

    /// Set the connection gauge (last write wins).
    pub fn set_active_connections(&mut self, count: usize) {
        self.active_connections = count;
    }

    /// Zero every counter and drop the sample history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Every response-time sample since the last reset, in recording order.
    pub fn response_times(&self) -> &[f64] {
        &self.response_times
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_packets: self.total_packets,
            active_connections: self.active_connections,
            auth_requests: self.auth_requests,
            denied_access: self.denied_access,
            avg_response_time: self.avg_response_time,
        }
    }
}
