//! Deterministic test harness for OCSASim.
//!
//! [`MemoryHub`] stands in for the sensor hub and [`TestEnv`] for the system
//! clock and RNG. Run sims on a paused tokio runtime
//! (`#[tokio::test(start_paused = true)]`) and every tick, timestamp and
//! instance id is reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod memory_hub;
pub mod test_env;

pub use memory_hub::{MemoryHub, StreamRecord, SystemRecord};
pub use test_env::TestEnv;
