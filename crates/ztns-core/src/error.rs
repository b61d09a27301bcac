//! Error types.
//!
//! The tick itself never fails: duplicate connections, dangling packets and
//! synthetic failures are modelled as data. These errors cover the fallible
//! surfaces around it (parameter validation, config updates, snapshots).

use thiserror::Error;

use crate::topology::{ComponentId, ComponentKind};

/// Invalid simulation parameter or component setting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A numeric parameter is outside its allowed range.
    #[error("{field} out of range: {value} not in {min}..={max}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A list field contains the same option twice.
    #[error("{field}: duplicate option {value:?}")]
    DuplicateOption {
        /// Name of the offending field.
        field: &'static str,
        /// Value that appeared twice.
        value: String,
    },
}

/// Errors from topology mutations that can be rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    /// No component with this id.
    #[error("component not found: {id}")]
    ComponentNotFound {
        /// The id that was not found.
        id: ComponentId,
    },

    /// The supplied config belongs to another component kind.
    #[error("config kind mismatch for {id}: component is {expected}, config is {actual}")]
    ConfigKindMismatch {
        /// Component being configured.
        id: ComponentId,
        /// Kind of the component.
        expected: ComponentKind,
        /// Kind the config was written for.
        actual: ComponentKind,
    },

    /// The supplied config failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Errors from encoding or decoding a topology snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// CBOR serialization failed.
    #[error("snapshot encode failed: {reason}")]
    Encode {
        /// Description of the failure.
        reason: String,
    },

    /// CBOR deserialization failed.
    #[error("snapshot decode failed: {reason}")]
    Decode {
        /// Description of the failure.
        reason: String,
    },

    /// Snapshot written by an incompatible format version.
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u8),

    /// Two component records share an id.
    #[error("duplicate component id in snapshot: {id}")]
    DuplicateComponent {
        /// The repeated id.
        id: ComponentId,
    },

    /// Two connection records join the same pair of components.
    #[error("duplicate connection in snapshot: {source_id} <-> {target_id}")]
    DuplicateConnection {
        /// Source endpoint of the repeated connection.
        source_id: ComponentId,
        /// Target endpoint of the repeated connection.
        target_id: ComponentId,
    },

    /// A connection record joins a component to itself.
    #[error("self-connection in snapshot on {id}")]
    SelfConnection {
        /// Component on both ends.
        id: ComponentId,
    },

    /// A component record carries a config that fails validation.
    #[error("component {id} has an invalid config: {source}")]
    InvalidConfig {
        /// Component whose config is rejected.
        id: ComponentId,
        /// Validation failure.
        source: ConfigError,
    },

    /// A component record carries a config for another kind.
    #[error("component {id} is {expected} but carries a {actual} config")]
    ConfigKindMismatch {
        /// Component whose record is inconsistent.
        id: ComponentId,
        /// Kind of the component.
        expected: ComponentKind,
        /// Kind the config was written for.
        actual: ComponentKind,
    },
}
