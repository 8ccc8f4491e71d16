//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples simulation logic from system resources
//! (wall clock, timers, randomness). Production code uses real system time;
//! the harness substitutes a clock and RNG it controls so that every
//! observation a test sees is reproducible.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards within one sim
//! - Isolation: Implementations must not share global state between sims

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstract environment providing time, timers and randomness.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current wall-clock time.
    ///
    /// Used to stamp observations, so it must be UTC and monotonic.
    fn now(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    ///
    /// The generator loop waits on this between ticks.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for sim instance ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
