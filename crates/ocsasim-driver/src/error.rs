//! Driver error types.

use std::path::PathBuf;

use ocsasim_core::{ConfigError, SimError};
use thiserror::Error;

/// Errors that can occur while configuring or running sims.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Config file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for a driver config.
    #[error("invalid config {}: {source}", path.display())]
    Config {
        /// File that failed.
        path: PathBuf,
        /// Parse error with location.
        #[source]
        source: toml::de::Error,
    },

    /// A sim entry describes an unusable sim.
    #[error("sim {name}: {source}")]
    InvalidSim {
        /// Configured sim name.
        name: String,
        /// What is wrong with it.
        #[source]
        source: ConfigError,
    },

    /// A duration field is negative or not a number.
    #[error("sim {name}: {field} must be a non-negative number of seconds, got {value}")]
    InvalidDuration {
        /// Configured sim name.
        name: String,
        /// Offending key.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// No sim survived registration.
    #[error("no sims running")]
    NoSims,

    /// A lifecycle operation failed.
    #[error(transparent)]
    Sim(#[from] SimError),
}

impl DriverError {
    /// Returns true if the driver cannot continue.
    ///
    /// Config problems stop the launcher before anything is registered. A
    /// single sim failing does not; the registry drops it and runs the rest.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Io { .. }
            | Self::Config { .. }
            | Self::InvalidSim { .. }
            | Self::InvalidDuration { .. }
            | Self::NoSims => true,

            Self::Sim(_) => false,
        }
    }
}
