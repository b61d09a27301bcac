//! Snapshot codec.
//!
//! Flattens a [`Topology`] into a structural record (ordered `(id, component)`
//! pairs plus connection records) and back, and encodes that record as CBOR.
//! Derived state is never part of a snapshot, so a restored topology is
//! entirely inactive.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    classifier::ConnectionCategory,
    config::ComponentConfig,
    error::SnapshotError,
    topology::{Component, ComponentId, ComponentKind, Connection, Point, Topology},
};

/// Format version written by [`TopologySnapshot::capture`].
pub const SNAPSHOT_VERSION: u8 = 1;

/// Persisted form of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Component kind.
    pub kind: ComponentKind,
    /// Canvas position.
    pub position: Point,
    /// Kind-specific settings.
    pub config: ComponentConfig,
}

/// Persisted form of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Source endpoint.
    pub source: ComponentId,
    /// Target endpoint.
    pub target: ComponentId,
    /// Category assigned when the connection was created.
    pub category: ConnectionCategory,
}

/// Structural snapshot of a topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Format version.
    pub version: u8,
    /// Components in insertion order.
    pub components: Vec<(ComponentId, ComponentRecord)>,
    /// Connections in insertion order.
    pub connections: Vec<ConnectionRecord>,
}

impl TopologySnapshot {
    /// Capture the structure of a topology.
    pub fn capture(topology: &Topology) -> Self {
        let components = topology
            .components()
            .iter()
            .map(|c| {
                let record = ComponentRecord {
                    kind: c.kind(),
                    position: c.position(),
                    config: c.config().clone(),
                };
                (c.id().clone(), record)
            })
            .collect();

        let connections = topology
            .connections()
            .iter()
            .map(|c| ConnectionRecord {
                source: c.source().clone(),
                target: c.target().clone(),
                category: c.category(),
            })
            .collect();

        Self { version: SNAPSHOT_VERSION, components, connections }
    }

    /// Rebuild a topology.
    ///
    /// Categories are taken as stored, not re-classified. Connections whose
    /// endpoints are missing are kept (they are inert). Rejects anything the
    /// store itself refuses to build: duplicate component ids, configs that
    /// belong to another kind or fail validation, self-connections and
    /// undirected duplicate connections.
    pub fn into_topology(self) -> Result<Topology, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }

        let mut seen = HashSet::with_capacity(self.components.len());
        let mut components = Vec::with_capacity(self.components.len());
        for (id, record) in self.components {
            if !seen.insert(id.clone()) {
                return Err(SnapshotError::DuplicateComponent { id });
            }
            if record.config.kind() != record.kind {
                return Err(SnapshotError::ConfigKindMismatch {
                    id,
                    expected: record.kind,
                    actual: record.config.kind(),
                });
            }
            if let Err(source) = record.config.validate() {
                return Err(SnapshotError::InvalidConfig { id, source });
            }
            components.push(Component::new(id, record.kind, record.position, record.config));
        }

        let mut connections: Vec<Connection> = Vec::with_capacity(self.connections.len());
        for record in self.connections {
            if record.source == record.target {
                return Err(SnapshotError::SelfConnection { id: record.source });
            }
            if connections.iter().any(|c| c.joins(&record.source, &record.target)) {
                return Err(SnapshotError::DuplicateConnection {
                    source_id: record.source,
                    target_id: record.target,
                });
            }
            connections.push(Connection::new(record.source, record.target, record.category));
        }

        Ok(Topology::from_parts(components, connections))
    }

    /// Encode as CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| SnapshotError::Encode { reason: e.to_string() })?;
        Ok(bytes)
    }

    /// Decode from CBOR.
    ///
    /// Only checks the format version; structural validation happens in
    /// [`TopologySnapshot::into_topology`].
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = ciborium::de::from_reader(bytes)
            .map_err(|e| SnapshotError::Decode { reason: e.to_string() })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}
