//! Packet model.
//!
//! A packet is a token of synthetic traffic travelling along a connection.
//! Its progress grows by a fixed step per tick; the engine removes it on the
//! tick it reaches the target.

use crate::topology::{ComponentId, Point, Topology};

/// Tolerance, relative to the step, absorbing float rounding when
/// `steps * step` lands just below 1.
const COMPLETION_TOLERANCE: f64 = 1e-9;

/// Engine-assigned packet identifier, unique within one simulator.
pub type PacketId = u64;

/// Kind of simulated traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PacketKind {
    /// Access request.
    #[default]
    Request,
    /// Response to a request.
    Response,
    /// Authentication exchange.
    Auth,
}

impl PacketKind {
    /// Kinds drawn by the automatic spawner, in draw order.
    pub const SPAWNABLE: [Self; 3] = [Self::Request, Self::Auth, Self::Response];
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Auth => "auth",
        };
        f.write_str(name)
    }
}

/// A packet in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    id: PacketId,
    source: ComponentId,
    target: ComponentId,
    kind: PacketKind,
    /// Number of `advance` calls so far.
    steps: u32,
    /// Progress in `[0, 1]`, derived from `steps`.
    progress: f64,
}

impl Packet {
    /// Create a packet at the source (progress 0).
    pub fn new(id: PacketId, source: ComponentId, target: ComponentId, kind: PacketKind) -> Self {
        Self { id, source, target, kind, steps: 0, progress: 0.0 }
    }

    /// Create a [`PacketKind::Request`] packet.
    pub fn request(id: PacketId, source: ComponentId, target: ComponentId) -> Self {
        Self::new(id, source, target, PacketKind::default())
    }

    /// Packet identifier.
    pub fn id(&self) -> PacketId {
        self.id
    }

    /// Component the packet left.
    pub fn source(&self) -> &ComponentId {
        &self.source
    }

    /// Component the packet travels to.
    pub fn target(&self) -> &ComponentId {
        &self.target
    }

    /// Traffic kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Fraction of the hop completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// True once progress has reached 1.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Move the packet one step along its connection.
    ///
    /// Returns true once the packet has arrived. Progress is recomputed from
    /// the step count rather than accumulated, so a step of 0.02 completes
    /// after exactly 50 calls. The caller removes the packet on the call
    /// that returns true.
    pub fn advance(&mut self, step: f64) -> bool {
        if !self.is_complete() {
            self.steps = self.steps.saturating_add(1);
            let progress = f64::from(self.steps) * step;
            self.progress =
                if progress >= 1.0 - step * COMPLETION_TOLERANCE { 1.0 } else { progress };
        }
        self.is_complete()
    }

    /// Interpolated canvas position.
    ///
    /// `None` if either endpoint no longer exists; the caller skips the
    /// packet instead of failing.
    pub fn position(&self, topology: &Topology) -> Option<Point> {
        let source = topology.component(&self.source)?;
        let target = topology.component(&self.target)?;
        Some(source.position().lerp(target.position(), self.progress))
    }

    /// True if the packet travels exactly from `source` to `target`.
    pub fn travels(&self, source: &ComponentId, target: &ComponentId) -> bool {
        &self.source == source && &self.target == target
    }

    /// True if the packet names `id` as source or target.
    pub fn involves(&self, id: &ComponentId) -> bool {
        &self.source == id || &self.target == id
    }
}
