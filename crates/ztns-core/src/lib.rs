//! Zero Trust Network simulator core
//!
//! This crate contains the simulation engine of the Zero Trust Network
//! simulator: the topology of components and connections, the packet
//! lifecycle, the per-tick state derivation and the metrics it feeds. It is
//! completely decoupled from rendering, input handling and I/O.
//!
//! # Architecture
//!
//! ```text
//!      ┌──────────────────────────────┐
//!      │ ztns-core                    │
//!      │ - Topology store             │
//!      │ - Simulation clock           │
//!      │ - Metrics aggregation        │
//!      │ - Snapshot codec             │
//!      └──────────────────────────────┘
//!         ↓                        ↓
//! ┌────────────────────┐  ┌────────────────────┐
//! │ ztns-harness       │  │ ztns-server        │
//! │ - Virtual clock    │  │ - System clock     │
//! │ - Seeded RNG       │  │ - OS entropy       │
//! │ - Scripted draws   │  │ - Frame-paced loop │
//! └────────────────────┘  └────────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in Core: Never call `std::time::Instant::now()` or an RNG
//!   directly
//! - Environment Trait: All time and randomness go through `Environment`
//! - Deterministic: Given the same inputs and environment state, produce the
//!   same outputs
//!
//! # Modules
//!
//! - [`topology`]: Components, connections and the store holding them
//! - [`classifier`]: Connection category from endpoint kinds
//! - [`packet`]: Packet identity and progress
//! - [`metrics`]: Counters and response-time average
//! - [`engine`]: Simulation clock and tick
//! - [`snapshot`]: Structural snapshot and CBOR codec
//! - [`config`]: Engine tunables and per-component settings
//! - [`env`]: Environment abstraction (time, RNG)
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod classifier;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod metrics;
pub mod packet;
pub mod snapshot;
pub mod topology;

pub use classifier::{ConnectionCategory, classify};
pub use config::{ComponentConfig, SimulationConfig};
pub use engine::{ClockState, PacketPosition, SimAction, Simulator};
pub use env::Environment;
pub use error::{ConfigError, SnapshotError, TopologyError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use packet::{Packet, PacketId, PacketKind};
pub use snapshot::{ComponentRecord, ConnectionRecord, SNAPSHOT_VERSION, TopologySnapshot};
pub use topology::{
    Component, ComponentId, ComponentKind, ComponentState, Connection, ConnectionState, Point,
    Topology,
};
