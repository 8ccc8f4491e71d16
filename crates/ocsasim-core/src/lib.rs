//! OCSASim core.
//!
//! A simulated sensor produces synthetic telemetry on a fixed interval,
//! publishes it as observations, and accepts control commands that change
//! its state while it runs.
//!
//! ## Architecture
//!
//! ```text
//! ocsasim-core
//!   ├─ Environment        (time, timers, randomness)
//!   ├─ Hub                (registration + publish/subscribe collaborators)
//!   ├─ generator          (pure telemetry functions)
//!   ├─ Simulation         (per-sensor schemas, tick, command handling)
//!   ├─ CommandProcessor   (command bytes -> state change -> Status)
//!   └─ Sim                (lifecycle, generator + listener loops)
//! ```
//!
//! A [`Sim`] is generic over its [`Simulation`], its [`Hub`] and its
//! [`Environment`]. Production wires in a real hub client and system time;
//! tests substitute an in-memory hub and a deterministic environment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod env;
mod error;
pub mod generator;
pub mod hub;
mod lifecycle;
mod processor;
mod simulation;
pub mod sims;
mod tasks;

pub use config::{CounterConfig, PathConfig, SimConfig};
pub use env::Environment;
pub use error::{ConfigError, SimError};
pub use hub::{
    ControlChannels, ControlStreamId, DatastreamId, Hub, HubError, Publisher, Subscriber, SystemId,
};
pub use lifecycle::{Resources, Sim, SimControl, SimId, SimPhase};
pub use processor::CommandProcessor;
pub use simulation::{CommandOutcome, Simulation};
pub use sims::{ControllableCounter, GpsSim};
