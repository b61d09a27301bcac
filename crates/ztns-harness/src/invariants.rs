//! Invariants checked after every operation.
//!
//! Each invariant inspects a borrowed [`SystemSnapshot`] of the simulator
//! and reports a [`Violation`] instead of panicking, so property tests can
//! print the failing operation alongside it.

use std::{collections::HashSet, fmt};

use ztns_core::{
    ConnectionState, Environment, Metrics, Packet, SimulationConfig, Simulator, Topology,
};

/// Tolerance for floating-point comparisons.
const EPSILON: f64 = 1e-9;

/// Borrowed view of everything the invariants look at.
#[derive(Debug, Clone, Copy)]
pub struct SystemSnapshot<'a> {
    /// Components and connections.
    pub topology: &'a Topology,
    /// In-flight packets.
    pub packets: &'a [Packet],
    /// Metrics including the sample history.
    pub metrics: &'a Metrics,
    /// Engine tunables.
    pub config: &'a SimulationConfig,
}

impl<'a> SystemSnapshot<'a> {
    /// Borrow the parts of a simulator.
    pub fn of<E: Environment>(sim: &'a Simulator<E>) -> Self {
        Self {
            topology: sim.topology(),
            packets: sim.packets(),
            metrics: sim.metrics_detail(),
            config: sim.config(),
        }
    }
}

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the invariant.
    pub invariant: &'static str,
    /// What was observed.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A named property of the simulator state.
pub trait Invariant: Send + Sync {
    /// Stable name used in violation reports.
    fn name(&self) -> &'static str;

    /// Check the property.
    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation>;

    /// Build a violation for this invariant.
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}

/// Component ids are unique.
pub struct UniqueComponentIds;

impl Invariant for UniqueComponentIds {
    fn name(&self) -> &'static str {
        "unique_component_ids"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        let mut seen = HashSet::new();
        for component in snapshot.topology.components() {
            if !seen.insert(component.id()) {
                return Err(self.violation(format!("id {} appears twice", component.id())));
            }
        }
        Ok(())
    }
}

/// No self-loops and at most one connection per unordered pair.
pub struct NoDuplicateConnections;

impl Invariant for NoDuplicateConnections {
    fn name(&self) -> &'static str {
        "no_duplicate_connections"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        let mut seen = HashSet::new();
        for connection in snapshot.topology.connections() {
            let (a, b) = (connection.source(), connection.target());
            if a == b {
                return Err(self.violation(format!("self-loop on {a}")));
            }
            let pair = if a < b { (a, b) } else { (b, a) };
            if !seen.insert(pair) {
                return Err(self.violation(format!("{a} and {b} connected twice")));
            }
        }
        Ok(())
    }
}

/// In-flight packets sit in `[0, 1)`; completed packets are removed.
pub struct PacketProgressInRange;

impl Invariant for PacketProgressInRange {
    fn name(&self) -> &'static str {
        "packet_progress_in_range"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        for packet in snapshot.packets {
            let progress = packet.progress();
            if !(0.0..1.0).contains(&progress) {
                return Err(
                    self.violation(format!("packet {} at progress {progress}", packet.id()))
                );
            }
        }
        Ok(())
    }
}

/// Packet ids are unique and follow spawn order.
pub struct PacketIdsIncreasing;

impl Invariant for PacketIdsIncreasing {
    fn name(&self) -> &'static str {
        "packet_ids_increasing"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        for pair in snapshot.packets.windows(2) {
            if pair[0].id() >= pair[1].id() {
                return Err(self.violation(format!(
                    "packet {} listed before packet {}",
                    pair[0].id(),
                    pair[1].id()
                )));
            }
        }
        Ok(())
    }
}

/// The average is the mean of every sample, and 0 without samples.
pub struct AverageIsMean;

impl Invariant for AverageIsMean {
    fn name(&self) -> &'static str {
        "average_is_mean"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        let samples = snapshot.metrics.response_times();
        #[allow(clippy::cast_precision_loss)]
        let expected = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };

        let actual = snapshot.metrics.snapshot().avg_response_time;
        if (actual - expected).abs() > EPSILON {
            return Err(self.violation(format!("average {actual} but mean is {expected}")));
        }
        Ok(())
    }
}

/// Every response-time sample lies in `[0, max_response_time_ms)`.
pub struct ResponseTimesInRange;

impl Invariant for ResponseTimesInRange {
    fn name(&self) -> &'static str {
        "response_times_in_range"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        let max = snapshot.config.max_response_time_ms;
        for sample in snapshot.metrics.response_times() {
            if !(0.0..max).contains(sample) {
                return Err(self.violation(format!("sample {sample}ms outside [0, {max})")));
            }
        }
        Ok(())
    }
}

/// Auth requests are a subset of all packets.
pub struct AuthWithinTotal;

impl Invariant for AuthWithinTotal {
    fn name(&self) -> &'static str {
        "auth_within_total"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        let metrics = snapshot.metrics.snapshot();
        if metrics.auth_requests > metrics.total_packets {
            return Err(self.violation(format!(
                "{} auth requests out of {} packets",
                metrics.auth_requests, metrics.total_packets
            )));
        }
        Ok(())
    }
}

/// Connections with a missing endpoint never carry traffic.
pub struct DanglingConnectionsInactive;

impl Invariant for DanglingConnectionsInactive {
    fn name(&self) -> &'static str {
        "dangling_connections_inactive"
    }

    fn check(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Violation> {
        let topology = snapshot.topology;
        for connection in topology.connections() {
            if topology.is_dangling(connection) && connection.state() == ConnectionState::Active {
                return Err(self.violation(format!(
                    "dangling connection {} -> {} is active",
                    connection.source(),
                    connection.target()
                )));
            }
        }
        Ok(())
    }
}

/// Ordered set of invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no invariants.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Every invariant the simulator must uphold.
    pub fn standard() -> Self {
        Self::new()
            .with(UniqueComponentIds)
            .with(NoDuplicateConnections)
            .with(PacketProgressInRange)
            .with(PacketIdsIncreasing)
            .with(AverageIsMean)
            .with(ResponseTimesInRange)
            .with(AuthWithinTotal)
            .with(DanglingConnectionsInactive)
    }

    /// Add an invariant.
    #[must_use]
    pub fn with(mut self, invariant: impl Invariant + 'static) -> Self {
        self.invariants.push(Box::new(invariant));
        self
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// True if no invariant is registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Check every invariant, collecting all violations.
    pub fn check_all(&self, snapshot: &SystemSnapshot<'_>) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> =
            self.invariants.iter().filter_map(|i| i.check(snapshot).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check every invariant against a simulator.
    pub fn check_simulator<E: Environment>(
        &self,
        sim: &Simulator<E>,
    ) -> Result<(), Vec<Violation>> {
        self.check_all(&SystemSnapshot::of(sim))
    }
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ztns_core::{ComponentKind, PacketKind};

    use super::*;
    use crate::sim_env::SimEnv;

    #[test]
    fn fresh_simulator_satisfies_everything() {
        let sim = Simulator::with_defaults(SimEnv::new());
        assert_eq!(InvariantRegistry::standard().check_simulator(&sim), Ok(()));
    }

    #[test]
    fn running_simulator_satisfies_everything() {
        let env = SimEnv::with_seed(9);
        let mut sim = Simulator::with_defaults(env.clone());
        let a = sim.topology_mut().add_component(ComponentKind::Client, 0.0, 0.0).id().clone();
        let b = sim.topology_mut().add_component(ComponentKind::Resource, 80.0, 0.0).id().clone();
        sim.topology_mut().add_connection(&a, &b).unwrap();
        sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();
        sim.start();

        let registry = InvariantRegistry::standard();
        for _ in 0..200 {
            env.advance(std::time::Duration::from_millis(16));
            sim.tick();
            assert_eq!(registry.check_simulator(&sim), Ok(()));
        }
    }

    #[test]
    fn violation_display_names_the_invariant() {
        let violation = AuthWithinTotal.violation("2 auth requests out of 1 packets".to_string());
        assert_eq!(violation.to_string(), "auth_within_total: 2 auth requests out of 1 packets");
    }

    #[test]
    fn standard_registry_is_populated() {
        assert_eq!(InvariantRegistry::standard().len(), 8);
        assert!(InvariantRegistry::new().is_empty());
    }
}
