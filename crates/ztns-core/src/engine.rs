//! Simulation clock.
//!
//! The `Simulator` owns the topology, the in-flight packets and the metrics,
//! and advances them one tick at a time.
//!
//! ## Tick
//!
//! While running, every tick performs, in order:
//!
//! 1. Component states from in-flight packets (with the synthetic failure
//!    draw for targeted components)
//! 2. Connection states (directional match against packets)
//! 3. Packet advance, completion and response-time samples
//! 4. Wall-clock spawn of a new packet (with the synthetic denial draw)
//! 5. Connection gauge
//!
//! ## Design
//!
//! - Sans-IO: time and randomness come from the injected `Environment`
//! - Action-based: `tick` returns what happened, the host decides how to log
//!   or render it
//! - Single owner: consumers read through accessors and never hold
//!   references across ticks

use crate::{
    config::SimulationConfig,
    env::Environment,
    metrics::{Metrics, MetricsSnapshot},
    packet::{Packet, PacketId, PacketKind},
    snapshot::TopologySnapshot,
    topology::{ComponentId, ComponentState, ConnectionState, Point, Topology},
};

/// Run state of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    /// Ticks are no-ops.
    #[default]
    Paused,
    /// Ticks advance the simulation.
    Running,
}

/// What happened during a tick, for the host to log or render.
#[derive(Debug, Clone, PartialEq)]
pub enum SimAction {
    /// A packet was created.
    PacketSpawned {
        /// New packet.
        packet_id: PacketId,
        /// Source component.
        source: ComponentId,
        /// Target component.
        target: ComponentId,
        /// Traffic kind.
        kind: PacketKind,
    },

    /// A packet reached its target and was removed.
    PacketDelivered {
        /// Delivered packet.
        packet_id: PacketId,
        /// Simulated response time recorded for it, in ms.
        response_time_ms: f64,
    },

    /// A packet whose endpoints no longer exist was discarded.
    PacketDropped {
        /// Discarded packet.
        packet_id: PacketId,
    },

    /// A denied access was recorded.
    AccessDenied {
        /// Component whose synthetic failure fired, `None` for a denial drawn
        /// at spawn time.
        component: Option<ComponentId>,
    },
}

/// Packet position for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketPosition {
    /// Packet identifier.
    pub packet_id: PacketId,
    /// Traffic kind.
    pub kind: PacketKind,
    /// Interpolated position.
    pub position: Point,
}

/// Simulation engine.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for time/randomness
pub struct Simulator<E: Environment> {
    /// Environment for time/randomness.
    env: E,
    /// Engine tunables.
    config: SimulationConfig,
    /// Components and connections.
    topology: Topology,
    /// Aggregated metrics.
    metrics: Metrics,
    /// In-flight packets, in spawn order.
    packets: Vec<Packet>,
    /// Run state.
    state: ClockState,
    /// Time of the last spawn; `None` until the first start.
    last_spawn: Option<E::Instant>,
    /// Next packet identifier.
    next_packet_id: PacketId,
}

impl<E: Environment> Simulator<E> {
    /// Create a paused simulator from its parts.
    ///
    /// The config is expected to be valid (see
    /// [`SimulationConfig::validate`]).
    pub fn new(env: E, topology: Topology, metrics: Metrics, config: SimulationConfig) -> Self {
        Self {
            env,
            config,
            topology,
            metrics,
            packets: Vec::new(),
            state: ClockState::Paused,
            last_spawn: None,
            next_packet_id: 0,
        }
    }

    /// Create a paused simulator with an empty topology and default tunables.
    pub fn with_defaults(env: E) -> Self {
        Self::new(env, Topology::new(), Metrics::new(), SimulationConfig::default())
    }

    /// Current run state.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// True while ticks advance the simulation.
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Engine tunables.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Components and connections.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable topology, for placement and wiring between ticks.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// In-flight packets, in spawn order.
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Positions of in-flight packets; packets with a missing endpoint are
    /// skipped.
    pub fn packet_positions(&self) -> Vec<PacketPosition> {
        self.packets
            .iter()
            .filter_map(|p| {
                p.position(&self.topology).map(|position| PacketPosition {
                    packet_id: p.id(),
                    kind: p.kind(),
                    position,
                })
            })
            .collect()
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Full metrics aggregator, including the sample history.
    pub fn metrics_detail(&self) -> &Metrics {
        &self.metrics
    }

    /// Paused → Running.
    ///
    /// Arms the spawn timer on the first start after creation or reset, so
    /// the first automatic packet appears one interval later. Starting a
    /// running simulator does nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        if self.last_spawn.is_none() {
            self.last_spawn = Some(self.env.now());
        }
        self.state = ClockState::Running;

        tracing::info!(
            "Simulation started ({} components, {} connections)",
            self.topology.component_count(),
            self.topology.connection_count()
        );
    }

    /// Running → Paused, keeping packets and metrics.
    pub fn pause(&mut self) {
        if !self.is_running() {
            return;
        }

        self.state = ClockState::Paused;
        tracing::info!("Simulation paused with {} packets in flight", self.packets.len());
    }

    /// Force paused, drop every packet and zero the metrics.
    ///
    /// The topology is kept.
    pub fn reset(&mut self) {
        self.state = ClockState::Paused;
        self.packets.clear();
        self.metrics.reset();
        self.last_spawn = None;

        tracing::info!("Simulation reset");
    }

    /// Advance the simulation by one tick.
    ///
    /// A no-op while paused.
    pub fn tick(&mut self) -> Vec<SimAction> {
        if !self.is_running() {
            return Vec::new();
        }

        let mut actions = Vec::new();

        self.update_component_states(&mut actions);
        self.update_connection_states();
        self.advance_packets(&mut actions);
        self.spawn_if_due(&mut actions);
        self.metrics.set_active_connections(self.topology.connection_count());

        actions
    }

    /// Inject a packet on demand, counted like an automatic spawn.
    ///
    /// Returns `None` if either endpoint does not exist.
    pub fn spawn_packet(
        &mut self,
        source: &ComponentId,
        target: &ComponentId,
        kind: PacketKind,
    ) -> Option<PacketId> {
        if !self.topology.contains(source) || !self.topology.contains(target) {
            tracing::debug!("Not spawning {kind} packet {source} -> {target}: unknown endpoint");
            return None;
        }

        Some(self.push_packet(source.clone(), target.clone(), kind))
    }

    /// Capture the topology structure.
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot::capture(&self.topology)
    }

    /// Replace the topology wholesale.
    ///
    /// Pauses the clock and drops in-flight packets; metrics are kept.
    /// Nothing is re-derived: every component and connection restores
    /// inactive.
    pub fn restore(&mut self, topology: Topology) {
        self.state = ClockState::Paused;
        self.packets.clear();
        self.topology = topology;

        tracing::info!(
            "Topology restored ({} components, {} connections)",
            self.topology.component_count(),
            self.topology.connection_count()
        );
    }

    /// Tear down the engine, handing back the topology and metrics.
    pub fn dispose(self) -> (Topology, Metrics) {
        (self.topology, self.metrics)
    }

    /// Step 1: derive component states from in-flight packets.
    fn update_component_states(&mut self, actions: &mut Vec<SimAction>) {
        let running = self.is_running();

        for component in self.topology.components_mut() {
            let id = component.id();
            let involved = self.packets.iter().any(|p| p.involves(id));
            let targeted = self.packets.iter().any(|p| p.target() == id);

            let state = if involved {
                if targeted && self.env.chance(self.config.failure_probability) {
                    self.metrics.record_denied_access();
                    actions.push(SimAction::AccessDenied { component: Some(id.clone()) });
                    ComponentState::Error
                } else {
                    ComponentState::Processing
                }
            } else if running {
                ComponentState::Active
            } else {
                ComponentState::Inactive
            };

            component.set_state(state);
        }
    }

    /// Step 2: derive connection states. Dangling connections stay inactive.
    fn update_connection_states(&mut self) {
        let topology = &self.topology;
        let states: Vec<ConnectionState> = topology
            .connections()
            .iter()
            .map(|c| {
                let carrying = self.packets.iter().any(|p| p.travels(c.source(), c.target()));
                if carrying && !topology.is_dangling(c) {
                    ConnectionState::Active
                } else {
                    ConnectionState::Inactive
                }
            })
            .collect();

        for (connection, state) in self.topology.connections_mut().zip(states) {
            connection.set_state(state);
        }
    }

    /// Step 3: move every packet; record completions, drop dangling packets.
    fn advance_packets(&mut self, actions: &mut Vec<SimAction>) {
        let step = self.config.packet_step;
        let mut in_flight = Vec::with_capacity(self.packets.len());

        for mut packet in std::mem::take(&mut self.packets) {
            if !self.topology.contains(packet.source()) || !self.topology.contains(packet.target())
            {
                tracing::debug!("Dropping packet {}: endpoint removed", packet.id());
                actions.push(SimAction::PacketDropped { packet_id: packet.id() });
                continue;
            }

            if packet.advance(step) {
                let response_time_ms = self.env.random_unit() * self.config.max_response_time_ms;
                self.metrics.record_response_time(response_time_ms);

                tracing::debug!(
                    "Delivered {} packet {} ({:.2}ms)",
                    packet.kind(),
                    packet.id(),
                    response_time_ms
                );
                actions.push(SimAction::PacketDelivered { packet_id: packet.id(), response_time_ms });
            } else {
                in_flight.push(packet);
            }
        }

        self.packets = in_flight;
    }

    /// Step 4: spawn one packet on a live connection once the interval has
    /// elapsed.
    fn spawn_if_due(&mut self, actions: &mut Vec<SimAction>) {
        let now = self.env.now();
        let due = match self.last_spawn {
            Some(last) => now - last > self.config.spawn_interval,
            None => true,
        };
        if !due {
            return;
        }

        // Dangling connections cannot carry traffic.
        let live: Vec<_> = self
            .topology
            .connections()
            .iter()
            .filter(|c| !self.topology.is_dangling(c))
            .collect();
        let picked = self
            .env
            .random_index(live.len())
            .map(|i| (live[i].source().clone(), live[i].target().clone()));

        if let Some((source, target)) = picked {
            let kind = self
                .env
                .random_index(PacketKind::SPAWNABLE.len())
                .map_or(PacketKind::default(), |i| PacketKind::SPAWNABLE[i]);

            let packet_id = self.push_packet(source.clone(), target.clone(), kind);
            actions.push(SimAction::PacketSpawned { packet_id, source, target, kind });
        }

        if self.env.chance(self.config.denial_probability) {
            self.metrics.record_denied_access();
            actions.push(SimAction::AccessDenied { component: None });
        }

        self.last_spawn = Some(now);
    }

    fn push_packet(&mut self, source: ComponentId, target: ComponentId, kind: PacketKind) -> PacketId {
        let packet_id = self.next_packet_id;
        self.next_packet_id += 1;

        tracing::debug!("Spawned {kind} packet {packet_id}: {source} -> {target}");

        self.metrics.record_packet(kind);
        self.packets.push(Packet::new(packet_id, source, target, kind));
        packet_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        future::Future,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;
    use crate::topology::ComponentKind;

    /// Virtual clock plus a constant random draw.
    #[derive(Clone)]
    struct TestEnv {
        now: Arc<Mutex<Duration>>,
        draw: Arc<Mutex<f64>>,
    }

    impl TestEnv {
        fn new(draw: f64) -> Self {
            Self { now: Arc::new(Mutex::new(Duration::ZERO)), draw: Arc::new(Mutex::new(draw)) }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }

        fn set_draw(&self, draw: f64) {
            *self.draw.lock().unwrap() = draw;
        }
    }

    impl Environment for TestEnv {
        type Instant = Duration;

        fn now(&self) -> Self::Instant {
            *self.now.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }

        fn random_unit(&self) -> f64 {
            *self.draw.lock().unwrap()
        }
    }

    fn client_to_idp(env: TestEnv) -> (Simulator<TestEnv>, ComponentId, ComponentId) {
        let mut sim = Simulator::with_defaults(env);
        let a = sim.topology_mut().add_component(ComponentKind::Client, 0.0, 0.0).id().clone();
        let b = sim
            .topology_mut()
            .add_component(ComponentKind::IdentityProvider, 100.0, 0.0)
            .id()
            .clone();
        sim.topology_mut().add_connection(&a, &b).unwrap();
        (sim, a, b)
    }

    #[test]
    fn starts_paused_and_ticks_are_noops() {
        let (mut sim, a, b) = client_to_idp(TestEnv::new(0.5));
        sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();

        assert_eq!(sim.state(), ClockState::Paused);
        assert!(sim.tick().is_empty());
        assert!(sim.packets()[0].progress().abs() < f64::EPSILON);
    }

    #[test]
    fn idle_components_are_active_while_running() {
        let (mut sim, _, _) = client_to_idp(TestEnv::new(0.5));
        sim.start();
        sim.tick();

        for component in sim.topology().components() {
            assert_eq!(component.state(), ComponentState::Active);
        }
        assert_eq!(sim.metrics().active_connections, 1);
    }

    #[test]
    fn packet_endpoints_are_processing_and_connection_active() {
        let (mut sim, a, b) = client_to_idp(TestEnv::new(0.5));
        sim.start();
        sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();
        sim.tick();

        assert_eq!(sim.topology().component(&a).unwrap().state(), ComponentState::Processing);
        assert_eq!(sim.topology().component(&b).unwrap().state(), ComponentState::Processing);
        assert_eq!(sim.topology().connections()[0].state(), ConnectionState::Active);
    }

    #[test]
    fn reverse_packet_does_not_activate_connection() {
        let (mut sim, a, b) = client_to_idp(TestEnv::new(0.5));
        sim.start();
        sim.spawn_packet(&b, &a, PacketKind::Response).unwrap();
        sim.tick();

        assert_eq!(sim.topology().connections()[0].state(), ConnectionState::Inactive);
    }

    #[test]
    fn failure_draw_marks_target_as_error() {
        let env = TestEnv::new(0.01);
        let (mut sim, a, b) = client_to_idp(env);
        sim.start();
        sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();

        let actions = sim.tick();

        // Only the target is checked; the source just processes.
        assert_eq!(sim.topology().component(&a).unwrap().state(), ComponentState::Processing);
        assert_eq!(sim.topology().component(&b).unwrap().state(), ComponentState::Error);
        assert_eq!(sim.metrics().denied_access, 1);
        assert!(actions.contains(&SimAction::AccessDenied { component: Some(b) }));
    }

    #[test]
    fn auth_packet_delivered_after_fifty_ticks() {
        let (mut sim, a, b) = client_to_idp(TestEnv::new(0.5));
        sim.start();
        let packet_id = sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();

        for _ in 0..49 {
            sim.tick();
        }
        assert_eq!(sim.packets().len(), 1);

        let actions = sim.tick();
        assert!(sim.packets().is_empty());
        assert!(actions.contains(&SimAction::PacketDelivered { packet_id, response_time_ms: 50.0 }));

        let metrics = sim.metrics();
        assert_eq!(metrics.total_packets, 1);
        assert_eq!(metrics.auth_requests, 1);
        assert_eq!(sim.metrics_detail().response_times(), &[50.0]);
    }

    #[test]
    fn spawns_once_interval_has_elapsed() {
        let env = TestEnv::new(0.5);
        let (mut sim, a, b) = client_to_idp(env.clone());
        sim.start();

        env.advance(Duration::from_millis(2000));
        assert!(sim.tick().is_empty(), "interval must be exceeded, not just reached");

        env.advance(Duration::from_millis(1));
        let actions = sim.tick();

        // Draw 0.5 picks the middle kind (auth) and fires no denial.
        assert_eq!(
            actions,
            vec![SimAction::PacketSpawned { packet_id: 0, source: a, target: b, kind: PacketKind::Auth }]
        );
        assert_eq!(sim.metrics().total_packets, 1);

        // Timer re-armed.
        assert!(sim.tick().is_empty());
    }

    #[test]
    fn spawn_denial_is_independent_of_spawn() {
        let env = TestEnv::new(0.05);
        let mut sim = Simulator::with_defaults(env.clone());
        sim.start();

        env.advance(Duration::from_secs(3));
        let actions = sim.tick();

        assert_eq!(actions, vec![SimAction::AccessDenied { component: None }]);
        assert_eq!(sim.metrics().total_packets, 0);
        assert_eq!(sim.metrics().denied_access, 1);
    }

    #[test]
    fn automatic_spawn_skips_dangling_connections() {
        let env = TestEnv::new(0.3);
        let (mut sim, a, b) = client_to_idp(env.clone());
        let c = sim.topology_mut().add_component(ComponentKind::Resource, 0.0, 100.0).id().clone();
        sim.topology_mut().add_connection(&a, &c).unwrap();
        sim.topology_mut().remove_component(&b);
        sim.start();

        // Draw 0.3 over both connections would pick the dangling a -> b.
        env.advance(Duration::from_millis(2001));
        let actions = sim.tick();

        assert_eq!(
            actions,
            vec![SimAction::PacketSpawned {
                packet_id: 0,
                source: a,
                target: c,
                kind: PacketKind::Request
            }]
        );
        assert!(sim.tick().is_empty());
        assert_eq!(sim.packets().len(), 1);
    }

    #[test]
    fn only_dangling_connections_spawn_nothing() {
        let env = TestEnv::new(0.5);
        let (mut sim, _, b) = client_to_idp(env.clone());
        sim.topology_mut().remove_component(&b);
        sim.start();

        env.advance(Duration::from_millis(2001));
        assert!(sim.tick().is_empty());
        assert_eq!(sim.metrics().total_packets, 0);
        assert_eq!(sim.metrics().auth_requests, 0);
    }

    #[test]
    fn pause_keeps_state_and_reset_clears_it() {
        let env = TestEnv::new(0.5);
        let (mut sim, a, b) = client_to_idp(env.clone());
        sim.start();
        sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();
        sim.tick();

        sim.pause();
        assert_eq!(sim.state(), ClockState::Paused);
        assert_eq!(sim.packets().len(), 1);
        assert_eq!(sim.metrics().total_packets, 1);

        sim.reset();
        assert!(sim.packets().is_empty());
        assert_eq!(sim.metrics(), MetricsSnapshot::default());
        assert_eq!(sim.topology().component_count(), 2);
        assert_eq!(sim.topology().connection_count(), 1);
    }

    #[test]
    fn removed_endpoint_drops_packet_without_sample() {
        let env = TestEnv::new(0.5);
        let (mut sim, a, b) = client_to_idp(env.clone());
        sim.start();
        let packet_id = sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();

        sim.topology_mut().remove_component(&b);
        assert!(sim.packet_positions().is_empty());

        env.set_draw(0.01);
        let actions = sim.tick();

        assert!(actions.contains(&SimAction::PacketDropped { packet_id }));
        assert!(sim.packets().is_empty());
        assert!(sim.metrics_detail().response_times().is_empty());
        assert_eq!(sim.topology().connections()[0].state(), ConnectionState::Inactive);
    }

    #[test]
    fn restore_pauses_and_clears_packets() {
        let (mut sim, a, b) = client_to_idp(TestEnv::new(0.5));
        sim.start();
        sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();

        let restored = sim.snapshot().into_topology().unwrap();
        sim.restore(restored);

        assert_eq!(sim.state(), ClockState::Paused);
        assert!(sim.packets().is_empty());
        assert_eq!(sim.metrics().total_packets, 1);
        assert!(
            sim.topology().components().iter().all(|c| c.state() == ComponentState::Inactive)
        );
    }

    #[test]
    fn spawn_on_unknown_endpoint_is_refused() {
        let (mut sim, a, _) = client_to_idp(TestEnv::new(0.5));
        assert!(sim.spawn_packet(&a, &ComponentId::new("ghost"), PacketKind::Auth).is_none());
        assert_eq!(sim.metrics().total_packets, 0);
    }

    #[test]
    fn dispose_hands_back_parts() {
        let (mut sim, a, b) = client_to_idp(TestEnv::new(0.5));
        sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();

        let (topology, metrics) = sim.dispose();
        assert_eq!(topology.component_count(), 2);
        assert_eq!(metrics.snapshot().auth_requests, 1);
    }
}
