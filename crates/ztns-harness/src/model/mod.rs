//! Operation-driven simulation world.
//!
//! Random operation sequences are applied to a real simulator over a seeded
//! environment. Two worlds built from the same seed and fed the same
//! operations must end in the same observable state, and the invariants in
//! [`crate::invariants`] must hold after every operation.

pub mod operation;
mod world;

pub use operation::{Operation, OperationError, OperationResult};
pub use world::{ObservableState, SimWorld};
