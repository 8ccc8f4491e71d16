//! OCSASim driver.
//!
//! Everything needed to run sims as a process:
//!
//! ```text
//! ocsasim-driver
//!   ├─ SystemEnv      (production Environment impl)
//!   ├─ DriverConfig   (TOML sim list)
//!   ├─ SimRegistry    (build, insert, start, stop)
//!   └─ ConsoleHub     (log-backed hub, commands from stdin)
//! ```
//!
//! The `ocsasim` binary wires these together. A real sensor-hub client is a
//! drop-in replacement for [`ConsoleHub`]: anything implementing
//! [`ocsasim_core::Hub`] works.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod console_hub;
mod error;
mod registry;
mod system_env;

pub use config::{DriverConfig, SimKind, SimSpec};
pub use console_hub::ConsoleHub;
pub use error::DriverError;
pub use registry::{SimFailure, SimRegistry};
pub use system_env::SystemEnv;
