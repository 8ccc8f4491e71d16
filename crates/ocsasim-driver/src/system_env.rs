//! Production Environment implementation using system time and RNG.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ocsasim_core::Environment;

/// Production environment.
///
/// - `chrono::Utc::now()` for observation timestamps
/// - `tokio::time::sleep()` between ticks
/// - `getrandom` for instance ids
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // Instance ids only need to differ within one process.
            tracing::error!("getrandom failed: {}", e);
            buffer.fill(0);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[test]
    fn system_env_instance_ids_differ() {
        let env = SystemEnv::new();
        assert_ne!(env.random_u64(), env.random_u64());
    }

    #[tokio::test]
    async fn system_env_sleep_works() {
        let env = SystemEnv::new();

        let start = std::time::Instant::now();
        env.sleep(Duration::from_millis(50)).await;

        assert!(start.elapsed() >= Duration::from_millis(50), "Sleep should wait at least 50ms");
    }
}
