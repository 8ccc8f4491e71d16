//! Deterministic environment.
//!
//! Wall-clock time is a fixed epoch plus the time elapsed on tokio's clock,
//! so with a paused runtime every observation timestamp is reproducible.
//! Randomness comes from a seeded ChaCha8 stream shared by all clones.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use ocsasim_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::Instant;

/// 2026-01-01T00:00:00Z.
const DEFAULT_EPOCH_SECS: i64 = 1_767_225_600;

/// Environment with a tokio-driven clock and seeded RNG.
///
/// Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct TestEnv {
    epoch: DateTime<Utc>,
    start: Instant,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl TestEnv {
    /// Environment starting at 2026-01-01T00:00:00Z with RNG `seed`.
    pub fn new(seed: u64) -> Self {
        let epoch = DateTime::from_timestamp(DEFAULT_EPOCH_SECS, 0).unwrap_or_default();
        Self::with_epoch(seed, epoch)
    }

    /// Environment whose clock reads `epoch` right now.
    pub fn with_epoch(seed: u64, epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            start: Instant::now(),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Wall-clock time at creation.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Time elapsed on the tokio clock since creation.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Environment for TestEnv {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.epoch + elapsed
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
