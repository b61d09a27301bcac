//! Topology Store
//!
//! Holds the components (nodes) and connections (edges) of a simulated
//! network.
//!
//! ## Responsibilities
//!
//! - Component Lifecycle: Generate unique ids, store position and config
//! - Connection Creation: Classify the edge, reject undirected duplicates
//! - Lookup: By id, by undirected endpoint pair, by position (hit testing)
//!
//! ## Ordering
//!
//! Components and connections are kept in insertion order. Every scan that
//! picks "the first match" walks that order, so rendering snapshots and
//! random picks by index are reproducible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{ConnectionCategory, classify},
    config::ComponentConfig,
    error::TopologyError,
};

/// Stable identifier of a component within a topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a network component. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// Issues identities and authenticates clients.
    IdentityProvider,
    /// Evaluates access policies.
    PolicyEngine,
    /// Protected resource.
    Resource,
    /// End-user device requesting access.
    Client,
    /// Enforcement point in front of resources.
    Proxy,
}

impl ComponentKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::IdentityProvider, Self::PolicyEngine, Self::Resource, Self::Client, Self::Proxy];

    /// Kebab-case name, also used as the id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdentityProvider => "identity-provider",
            Self::PolicyEngine => "policy-engine",
            Self::Resource => "resource",
            Self::Client => "client",
            Self::Proxy => "proxy",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived component state, recomputed every tick and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentState {
    /// Not taking part in a running simulation.
    #[default]
    Inactive,
    /// Simulation running, no traffic through this component.
    Active,
    /// Source or target of at least one in-flight packet.
    Processing,
    /// Synthetic failure fired for a packet targeting this component.
    Error,
}

/// Derived connection state, recomputed every tick and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No packet travelling along this connection.
    #[default]
    Inactive,
    /// A packet is travelling from source to target.
    Active,
}

/// Canvas coordinates. Opaque to the engine apart from interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation from `self` towards `other` at `t` in `[0, 1]`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self { x: self.x + (other.x - self.x) * t, y: self.y + (other.y - self.y) * t }
    }

    /// Euclidean distance.
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A node in the simulated network.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: ComponentId,
    kind: ComponentKind,
    position: Point,
    config: ComponentConfig,
    state: ComponentState,
}

impl Component {
    pub(crate) fn new(
        id: ComponentId,
        kind: ComponentKind,
        position: Point,
        config: ComponentConfig,
    ) -> Self {
        Self { id, kind, position, config, state: ComponentState::Inactive }
    }

    /// Unique identifier.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Component kind.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Canvas position.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Kind-specific settings. Never interpreted by the engine.
    pub fn config(&self) -> &ComponentConfig {
        &self.config
    }

    /// State derived on the last tick.
    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ComponentState) {
        self.state = state;
    }
}

/// A directed edge between two components.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    source: ComponentId,
    target: ComponentId,
    category: ConnectionCategory,
    state: ConnectionState,
}

impl Connection {
    pub(crate) fn new(
        source: ComponentId,
        target: ComponentId,
        category: ConnectionCategory,
    ) -> Self {
        Self { source, target, category, state: ConnectionState::Inactive }
    }

    /// Source endpoint.
    pub fn source(&self) -> &ComponentId {
        &self.source
    }

    /// Target endpoint.
    pub fn target(&self) -> &ComponentId {
        &self.target
    }

    /// Category assigned at creation.
    pub fn category(&self) -> ConnectionCategory {
        self.category
    }

    /// State derived on the last tick.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True if this connection joins `a` and `b` in either direction.
    pub fn joins(&self, a: &ComponentId, b: &ComponentId) -> bool {
        (&self.source == a && &self.target == b) || (&self.source == b && &self.target == a)
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }
}

/// Store of components and connections.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Components in insertion order.
    components: Vec<Component>,
    /// Position of each component in `components`.
    index: HashMap<ComponentId, usize>,
    /// Connections in insertion order.
    connections: Vec<Connection>,
    /// Next sequence number tried when generating an id.
    next_sequence: u64,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from already-validated parts (snapshot restore).
    pub(crate) fn from_parts(components: Vec<Component>, connections: Vec<Connection>) -> Self {
        let mut topology = Self {
            components,
            index: HashMap::new(),
            connections,
            next_sequence: 0,
        };
        topology.rebuild_index();
        topology.next_sequence = topology.components.len() as u64;
        topology
    }

    /// Add a component with the default config for its kind.
    ///
    /// The new component starts `Inactive`. Never fails.
    pub fn add_component(&mut self, kind: ComponentKind, x: f64, y: f64) -> &Component {
        let id = self.generate_id(kind);
        let component =
            Component::new(id.clone(), kind, Point::new(x, y), ComponentConfig::default_for(kind));

        tracing::debug!("Added component {id}");

        self.index.insert(id, self.components.len());
        self.components.push(component);
        &self.components[self.components.len() - 1]
    }

    /// Remove a component.
    ///
    /// Connections touching it are kept but become inert: they never turn
    /// active and packets on them have no position.
    pub fn remove_component(&mut self, id: &ComponentId) -> Option<Component> {
        let position = self.index.remove(id)?;
        let component = self.components.remove(position);
        self.rebuild_index();

        tracing::debug!("Removed component {id}");

        Some(component)
    }

    /// Connect two components.
    ///
    /// The category comes from [`classify`]. Returns `None` without touching
    /// the store when a connection already joins the two components in either
    /// direction, when either endpoint is unknown, or when both endpoints are
    /// the same component.
    pub fn add_connection(
        &mut self,
        source: &ComponentId,
        target: &ComponentId,
    ) -> Option<&Connection> {
        if source == target {
            tracing::debug!("Ignoring self-connection on {source}");
            return None;
        }

        let category = match (self.component(source), self.component(target)) {
            (Some(s), Some(t)) => classify(s.kind(), t.kind()),
            _ => {
                tracing::debug!("Ignoring connection {source} -> {target}: unknown endpoint");
                return None;
            },
        };

        if self.connection_between(source, target).is_some() {
            tracing::debug!("Ignoring duplicate connection {source} -> {target}");
            return None;
        }

        tracing::debug!("Connected {source} -> {target} ({category})");

        self.connections.push(Connection::new(source.clone(), target.clone(), category));
        self.connections.last()
    }

    /// Look up a component.
    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.index.get(id).map(|&i| &self.components[i])
    }

    /// True if a component with this id exists.
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.index.contains_key(id)
    }

    /// All components in insertion order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// All connections in insertion order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of connections, including inert ones.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// True if the store holds neither components nor connections.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.connections.is_empty()
    }

    /// The connection joining `a` and `b`, in either direction.
    pub fn connection_between(&self, a: &ComponentId, b: &ComponentId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.joins(a, b))
    }

    /// True if either endpoint of the connection no longer exists.
    pub fn is_dangling(&self, connection: &Connection) -> bool {
        !self.contains(connection.source()) || !self.contains(connection.target())
    }

    /// Hit test: the component whose centre is closest to `point`, within
    /// `radius`.
    ///
    /// Ties go to the component inserted first.
    pub fn component_at(&self, point: Point, radius: f64) -> Option<&Component> {
        let mut best: Option<(&Component, f64)> = None;

        for component in &self.components {
            let distance = component.position().distance(point);
            if distance > radius {
                continue;
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {},
                _ => best = Some((component, distance)),
            }
        }

        best.map(|(component, _)| component)
    }

    /// Move a component.
    pub fn move_component(&mut self, id: &ComponentId, x: f64, y: f64) -> Result<(), TopologyError> {
        let component = self.component_mut(id)?;
        component.position = Point::new(x, y);
        Ok(())
    }

    /// Replace a component's config.
    ///
    /// The config must be written for the component's kind and pass
    /// validation.
    pub fn update_config(
        &mut self,
        id: &ComponentId,
        config: ComponentConfig,
    ) -> Result<(), TopologyError> {
        let component = self.component_mut(id)?;

        if config.kind() != component.kind {
            return Err(TopologyError::ConfigKindMismatch {
                id: id.clone(),
                expected: component.kind,
                actual: config.kind(),
            });
        }
        config.validate()?;

        component.config = config;
        Ok(())
    }

    pub(crate) fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.components.iter_mut()
    }

    pub(crate) fn connections_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    fn component_mut(&mut self, id: &ComponentId) -> Result<&mut Component, TopologyError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.components[i]),
            None => Err(TopologyError::ComponentNotFound { id: id.clone() }),
        }
    }

    /// Next free `"<kind>-<n>"` id.
    fn generate_id(&mut self, kind: ComponentKind) -> ComponentId {
        loop {
            let id = ComponentId(format!("{kind}-{}", self.next_sequence));
            self.next_sequence += 1;
            if !self.index.contains_key(&id) {
                return id;
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index =
            self.components.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
    }
}
