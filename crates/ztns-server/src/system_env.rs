//! Real-time environment for the headless runner.
//!
//! Time is the system clock. Random draws come from a ChaCha stream seeded
//! once, from OS entropy by default or from `--seed`, so a run can be
//! replayed draw for draw.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ztns_core::Environment;

/// Environment backed by the system clock and a seeded ChaCha stream.
///
/// Clones share the stream.
#[derive(Clone)]
pub struct SystemEnv {
    seed: u64,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SystemEnv {
    /// Environment seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(entropy_seed())
    }

    /// Environment replaying the draws of `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        tracing::info!("Simulation seed: {seed}");
        Self { seed, rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }

    /// Seed of the draw stream, for replaying a run.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SystemEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

/// Seed from `getrandom`, or from the wall clock if the OS has no entropy.
fn entropy_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(e) => {
            tracing::warn!("OS entropy unavailable ({e}), seeding from the clock");
            #[allow(clippy::cast_possible_truncation)]
            SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos() as u64)
        },
    }
}
