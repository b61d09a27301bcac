//! Simulation world driven by operations.
//!
//! Wraps a [`Simulator`] over a seeded [`SimEnv`] and applies
//! [`Operation`]s to it, recording every action the engine reports. The
//! observable state is what determinism and invariant checks compare.

use std::time::Duration;

use ztns_core::{
    ClockState, ComponentId, ComponentState, ConnectionState, MetricsSnapshot, PacketId,
    SimAction, Simulator, TopologySnapshot,
};

use super::operation::{Operation, OperationError, OperationResult};
use crate::sim_env::SimEnv;

/// Upper bound on ticks per [`Operation::Tick`].
const MAX_TICKS_PER_OP: u8 = 64;

/// Observable state for comparison between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableState {
    /// Clock run state.
    pub clock: ClockState,
    /// Components in insertion order.
    pub components: Vec<(ComponentId, ComponentState)>,
    /// Connections in insertion order.
    pub connections: Vec<(ComponentId, ComponentId, ConnectionState)>,
    /// In-flight packets with their progress.
    pub packets: Vec<(PacketId, f64)>,
    /// Metrics at this point.
    pub metrics: MetricsSnapshot,
    /// Number of actions reported so far.
    pub action_count: usize,
}

/// Simulator plus the environment driving it.
pub struct SimWorld {
    env: SimEnv,
    sim: Simulator<SimEnv>,
    actions: Vec<SimAction>,
}

impl SimWorld {
    /// Empty world seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        let sim = Simulator::with_defaults(env.clone());
        Self { env, sim, actions: Vec::new() }
    }

    /// Simulator under test.
    pub fn simulator(&self) -> &Simulator<SimEnv> {
        &self.sim
    }

    /// Environment driving the simulator.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Every action reported since creation.
    pub fn actions(&self) -> &[SimAction] {
        &self.actions
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::AddComponent { kind, x, y } => {
                let kind = Operation::component_kind(*kind);
                self.sim.topology_mut().add_component(kind, f64::from(*x), f64::from(*y));
                OperationResult::Ok
            },
            Operation::AddConnection { source, target } => self.apply_add_connection(*source, *target),
            Operation::RemoveComponent { index } => match self.component_id(*index) {
                Some(id) => {
                    self.sim.topology_mut().remove_component(&id);
                    OperationResult::Ok
                },
                None => OperationResult::Error(OperationError::EmptyTopology),
            },
            Operation::SpawnPacket { source, target, kind } => {
                self.apply_spawn_packet(*source, *target, *kind)
            },
            Operation::Start => {
                self.sim.start();
                OperationResult::Ok
            },
            Operation::Pause => {
                self.sim.pause();
                OperationResult::Ok
            },
            Operation::Reset => {
                self.sim.reset();
                OperationResult::Ok
            },
            Operation::Tick { count } => {
                for _ in 0..(*count % MAX_TICKS_PER_OP) {
                    let actions = self.sim.tick();
                    self.actions.extend(actions);
                }
                OperationResult::Ok
            },
            Operation::AdvanceTime { millis } => {
                self.env.advance(Duration::from_millis(u64::from(*millis)));
                OperationResult::Ok
            },
            Operation::SnapshotRoundtrip => self.apply_snapshot_roundtrip(),
        }
    }

    /// Capture the observable state.
    pub fn observable_state(&self) -> ObservableState {
        let topology = self.sim.topology();

        ObservableState {
            clock: self.sim.state(),
            components: topology.components().iter().map(|c| (c.id().clone(), c.state())).collect(),
            connections: topology
                .connections()
                .iter()
                .map(|c| (c.source().clone(), c.target().clone(), c.state()))
                .collect(),
            packets: self.sim.packets().iter().map(|p| (p.id(), p.progress())).collect(),
            metrics: self.sim.metrics(),
            action_count: self.actions.len(),
        }
    }

    fn component_id(&self, index: u8) -> Option<ComponentId> {
        let components = self.sim.topology().components();
        if components.is_empty() {
            return None;
        }
        Some(components[usize::from(index) % components.len()].id().clone())
    }

    fn apply_add_connection(&mut self, source: u8, target: u8) -> OperationResult {
        let (Some(source), Some(target)) = (self.component_id(source), self.component_id(target))
        else {
            return OperationResult::Error(OperationError::EmptyTopology);
        };

        match self.sim.topology_mut().add_connection(&source, &target) {
            Some(_) => OperationResult::Ok,
            None => OperationResult::Error(OperationError::ConnectionRejected),
        }
    }

    fn apply_spawn_packet(&mut self, source: u8, target: u8, kind: u8) -> OperationResult {
        let (Some(source), Some(target)) = (self.component_id(source), self.component_id(target))
        else {
            return OperationResult::Error(OperationError::EmptyTopology);
        };

        match self.sim.spawn_packet(&source, &target, Operation::packet_kind(kind)) {
            Some(_) => OperationResult::Ok,
            None => OperationResult::Error(OperationError::UnknownEndpoint),
        }
    }

    fn apply_snapshot_roundtrip(&mut self) -> OperationResult {
        let restored = self
            .sim
            .snapshot()
            .encode()
            .and_then(|bytes| TopologySnapshot::decode(&bytes))
            .and_then(TopologySnapshot::into_topology);

        match restored {
            Ok(topology) => {
                self.sim.restore(topology);
                OperationResult::Ok
            },
            Err(e) => OperationResult::Error(OperationError::SnapshotFailed(e.to_string())),
        }
    }
}
