//! Operations for model-based testing.
//!
//! Operations represent everything a user of the simulator can do. They are
//! generated from arbitrary bytes (proptest or libFuzzer) and applied to a
//! [`SimWorld`](super::SimWorld). Indices are taken modulo the current
//! component or connection count, so every generated operation lands on
//! something real once the topology is non-empty.

use arbitrary::Arbitrary;
use ztns_core::{ComponentKind, PacketKind};

/// Operations that can be applied to the world.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Place a component.
    AddComponent {
        /// Kind selector (taken modulo the number of kinds).
        kind: u8,
        /// Canvas x.
        x: u16,
        /// Canvas y.
        y: u16,
    },

    /// Connect two existing components.
    AddConnection {
        /// Source component index.
        source: u8,
        /// Target component index.
        target: u8,
    },

    /// Remove a component, leaving its connections dangling.
    RemoveComponent {
        /// Component index.
        index: u8,
    },

    /// Inject a packet between two existing components.
    SpawnPacket {
        /// Source component index.
        source: u8,
        /// Target component index.
        target: u8,
        /// Kind selector (taken modulo the number of kinds).
        kind: u8,
    },

    /// Start the clock.
    Start,

    /// Pause the clock.
    Pause,

    /// Reset packets and metrics.
    Reset,

    /// Run several ticks.
    Tick {
        /// Number of ticks (taken modulo 64).
        count: u8,
    },

    /// Advance virtual time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// Snapshot the topology through CBOR and restore it.
    SnapshotRoundtrip,
}

impl Operation {
    /// Component kind selected by a raw byte.
    pub fn component_kind(selector: u8) -> ComponentKind {
        ComponentKind::ALL[usize::from(selector) % ComponentKind::ALL.len()]
    }

    /// Packet kind selected by a raw byte.
    pub fn packet_kind(selector: u8) -> PacketKind {
        PacketKind::SPAWNABLE[usize::from(selector) % PacketKind::SPAWNABLE.len()]
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation changed the world.
    Ok,

    /// Operation was refused.
    Error(OperationError),
}

/// Reasons an operation is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The topology has no components to index into.
    EmptyTopology,

    /// Self-loop or duplicate connection.
    ConnectionRejected,

    /// Packet endpoint unknown to the topology.
    UnknownEndpoint,

    /// Snapshot failed to encode, decode or rebuild.
    SnapshotFailed(String),
}

impl OperationResult {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationResult::Ok)
    }

    /// Check if the operation was refused.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}
