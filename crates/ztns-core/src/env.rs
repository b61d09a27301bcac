//! Environment abstraction for deterministic simulation.
//!
//! The `Environment` trait decouples the engine from system resources (wall
//! clock, randomness). Every random decision the simulator makes (which
//! connection carries the next packet, which packet kind, whether a component
//! fails, how long a delivery took) is drawn through this trait. This enables:
//!
//! - Deterministic Testing: a seeded RNG and a virtual clock reproduce a run
//!   exactly, and a scripted source asserts exact outcomes.
//!
//! - Production Runtime: the host uses the system clock and OS entropy without
//!   any change to the engine.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::{fmt::Debug, ops::Sub, time::Duration};

/// Abstract environment providing time and randomness to the engine.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Point in time produced by [`Environment::now`].
    ///
    /// Subtracting two instants yields the elapsed [`Duration`]; this is all
    /// the engine needs to drive its wall-clock spawn timer.
    type Instant: Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + 'static;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: This method MUST return values that never decrease
    ///   within a single execution context.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only used by host drivers pacing frames, never by the engine itself.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Determinism during tests: Given the same seed, this produces the same
    ///   sequence of bytes
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a uniformly distributed `f64` in `[0, 1)`.
    ///
    /// Uses the top 53 bits of [`Environment::random_u64`], so every value is
    /// exactly representable and `1.0` is never produced.
    #[allow(clippy::cast_precision_loss)]
    fn random_unit(&self) -> f64 {
        (self.random_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Picks a uniformly distributed index in `0..len`.
    ///
    /// Returns `None` for an empty range.
    fn random_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let index = (self.random_unit() * len as f64) as usize;
        Some(index.min(len - 1))
    }

    /// Returns true with the given probability.
    ///
    /// Probabilities at or below 0 never fire, at or above 1 always fire.
    fn chance(&self, probability: f64) -> bool {
        self.random_unit() < probability
    }
}
