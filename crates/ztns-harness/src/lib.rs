//! Deterministic simulation harness for the Zero Trust Network simulator.
//!
//! Provides environments with a virtual clock for driving the engine
//! reproducibly:
//!
//! - [`SimEnv`]: seeded ChaCha RNG, for property tests and fuzzing
//! - [`ScriptedEnv`]: exact, scripted random draws, for scenario tests
//!
//! # Model-Based Testing
//!
//! The `model` module turns arbitrary operation sequences into calls on a
//! real simulator. The `invariants` module checks the resulting state after
//! every operation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod scripted_env;
pub mod sim_env;

pub use invariants::{Invariant, InvariantRegistry, SystemSnapshot, Violation};
pub use model::{ObservableState, Operation, OperationError, OperationResult, SimWorld};
pub use scripted_env::{NEUTRAL_DRAW, ScriptedEnv};
pub use sim_env::{SimEnv, SimInstant};
