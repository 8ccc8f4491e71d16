//! Launcher configuration file.
//!
//! ```toml
//! [[sim]]
//! name = "Controllable Counter"
//! kind = "counter"
//! interval-secs = 5
//! acknowledge-noop = true
//!
//! [sim.counter]
//! lower-bound = 0
//! upper-bound = 100
//! step = 10
//!
//! [[sim]]
//! name = "Sim GPS"
//! kind = "gps"
//! interval-secs = 2
//!
//! [sim.path]
//! base-lat = 34.7304
//! base-lon = -86.5861
//! ```
//!
//! Every key except `name` and `kind` is optional.

use std::{path::Path, time::Duration};

use ocsasim_core::{CounterConfig, PathConfig, SimConfig};
use serde::Deserialize;

use crate::error::DriverError;

/// Which reference simulation a sim entry runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimKind {
    /// Controllable counter.
    Counter,
    /// Circular GPS path.
    Gps,
}

impl SimKind {
    /// Default tick interval for this kind.
    pub fn default_interval(self) -> Duration {
        match self {
            Self::Counter => Duration::from_secs(5),
            Self::Gps => Duration::from_secs(2),
        }
    }
}

/// One `[[sim]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SimSpec {
    /// Sim label.
    pub name: String,
    /// Simulation to run.
    pub kind: SimKind,
    /// Seconds between ticks; defaults per kind.
    #[serde(default)]
    pub interval_secs: Option<f64>,
    /// Answer no-effect commands with `NOOP`.
    #[serde(default)]
    pub acknowledge_noop: bool,
    /// Seconds `stop()` waits for the loops.
    #[serde(default)]
    pub stop_timeout_secs: Option<f64>,
    /// Listener-to-generator queue capacity.
    #[serde(default)]
    pub command_buffer: Option<usize>,
    /// Counter settings, used when `kind = "counter"`.
    #[serde(default)]
    pub counter: CounterConfig,
    /// Path settings, used when `kind = "gps"`.
    #[serde(default)]
    pub path: PathConfig,
}

impl SimSpec {
    /// Entry with defaults for everything but name and kind.
    pub fn new(name: impl Into<String>, kind: SimKind) -> Self {
        Self {
            name: name.into(),
            kind,
            interval_secs: None,
            acknowledge_noop: false,
            stop_timeout_secs: None,
            command_buffer: None,
            counter: CounterConfig::default(),
            path: PathConfig::default(),
        }
    }

    /// Lifecycle config for this entry.
    pub fn sim_config(&self) -> Result<SimConfig, DriverError> {
        let mut config = SimConfig::named(self.name.clone());
        config.interval = match self.interval_secs {
            Some(secs) => self.seconds("interval-secs", secs)?,
            None => self.kind.default_interval(),
        };
        if let Some(secs) = self.stop_timeout_secs {
            config.stop_timeout = self.seconds("stop-timeout-secs", secs)?;
        }
        if let Some(capacity) = self.command_buffer {
            config.command_buffer = capacity;
        }
        config.acknowledge_noop = self.acknowledge_noop;

        config
            .validate()
            .map_err(|source| DriverError::InvalidSim { name: self.name.clone(), source })?;
        Ok(config)
    }

    fn seconds(&self, field: &'static str, value: f64) -> Result<Duration, DriverError> {
        Duration::try_from_secs_f64(value).map_err(|_| DriverError::InvalidDuration {
            name: self.name.clone(),
            field,
            value,
        })
    }
}

/// Top-level config: the sims to run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Sim entries, in start order.
    #[serde(rename = "sim", default)]
    pub sims: Vec<SimSpec>,
}

impl DriverConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| DriverError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
            .map_err(|source| DriverError::Config { path: path.to_path_buf(), source })
    }
}

impl Default for DriverConfig {
    /// One counter and one GPS sim with default settings.
    fn default() -> Self {
        Self {
            sims: vec![
                SimSpec::new("Controllable Counter", SimKind::Counter),
                SimSpec::new("Sim GPS", SimKind::Gps),
            ],
        }
    }
}
