//! Scripted environment: exact random draws for exact assertions.
//!
//! Every call to `random_unit` (and therefore `random_index` and `chance`)
//! pops the next scripted value. Once the script runs out, the fallback
//! value is returned. The clock is virtual, like [`SimEnv`](crate::SimEnv).
//!
//! Draw order within a tick, as consumed by the engine:
//!
//! 1. One failure draw per component targeted by an in-flight packet
//! 2. One response-time draw per packet completing this tick
//! 3. When the spawn interval elapsed: index among live connections, packet
//!    kind (only when a live connection exists), then the denial draw

use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use ztns_core::Environment;

use crate::sim_env::{SimInstant, lock};

/// Draw that never fires a 5% or 10% check and picks middle indices.
pub const NEUTRAL_DRAW: f64 = 0.5;

/// Environment returning a scripted sequence of unit draws.
#[derive(Clone)]
pub struct ScriptedEnv {
    clock: Arc<Mutex<Duration>>,
    draws: Arc<Mutex<VecDeque<f64>>>,
    fallback: f64,
}

impl ScriptedEnv {
    /// Environment whose every draw is [`NEUTRAL_DRAW`].
    pub fn neutral() -> Self {
        Self::with_draws(std::iter::empty())
    }

    /// Environment returning `draws` in order, then [`NEUTRAL_DRAW`].
    ///
    /// Values are clamped into `[0, 1)`.
    pub fn with_draws(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            draws: Arc::new(Mutex::new(draws.into_iter().map(clamp_unit).collect())),
            fallback: NEUTRAL_DRAW,
        }
    }

    /// Replace the value returned once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = clamp_unit(fallback);
        self
    }

    /// Append draws to the script.
    pub fn push_draws(&self, draws: impl IntoIterator<Item = f64>) {
        lock(&self.draws).extend(draws.into_iter().map(clamp_unit));
    }

    /// Draws not consumed yet.
    pub fn remaining(&self) -> usize {
        lock(&self.draws).len()
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        *lock(&self.clock) += by;
    }
}

impl Environment for ScriptedEnv {
    type Instant = SimInstant;

    fn now(&self) -> Self::Instant {
        SimInstant::at(*lock(&self.clock))
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    /// Raw bytes are not scripted; they encode the next unit draw.
    fn random_bytes(&self, buffer: &mut [u8]) {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let bits = ((self.random_unit() * (1u64 << 53) as f64) as u64) << 11;
        for (byte, source) in buffer.iter_mut().zip(bits.to_be_bytes().iter().cycle()) {
            *byte = *source;
        }
    }

    fn random_unit(&self) -> f64 {
        lock(&self.draws).pop_front().unwrap_or(self.fallback)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0 - f64::EPSILON) }
}
