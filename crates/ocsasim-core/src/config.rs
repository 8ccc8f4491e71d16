//! Construction-time configuration.
//!
//! Everything here is fixed for the lifetime of a sim. Commands may change a
//! sim's state afterwards, but never its config.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Lifecycle settings shared by every sim.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Human-readable sim label; the system name and URN derive from it.
    pub name: String,
    /// Time between generator ticks.
    pub interval: Duration,
    /// Publish a `NOOP` status for commands that change nothing.
    ///
    /// Off by default: no-effect commands are silently dropped.
    pub acknowledge_noop: bool,
    /// How long `stop()` waits for both loops to exit.
    pub stop_timeout: Duration,
    /// Capacity of the listener-to-generator command queue.
    pub command_buffer: usize,
}

impl SimConfig {
    /// Config with defaults for everything but the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Set the tick interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Check that the config can drive a sim.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::ZeroCommandBuffer);
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "Sim".to_string(),
            interval: Duration::from_secs(5),
            acknowledge_noop: false,
            stop_timeout: Duration::from_secs(5),
            command_buffer: 32,
        }
    }
}

/// Initial state of a controllable counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CounterConfig {
    /// Smallest value the counter takes.
    pub lower_bound: i64,
    /// Largest value the counter takes.
    pub upper_bound: i64,
    /// Increment per tick, always positive.
    pub step: i64,
    /// Start counting down instead of up.
    pub count_down: bool,
}

impl CounterConfig {
    /// Check bounds and step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lower_bound > self.upper_bound {
            return Err(ConfigError::InvalidBounds {
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }
        if self.step <= 0 {
            return Err(ConfigError::InvalidStep(self.step));
        }
        Ok(())
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self { lower_bound: 0, upper_bound: 100, step: 10, count_down: false }
    }
}

/// Circular path traced by the GPS sim.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PathConfig {
    /// Latitude of the circle centre, degrees.
    pub base_lat: f64,
    /// Longitude of the circle centre, degrees.
    pub base_lon: f64,
    /// Altitude at the centre, metres.
    pub base_alt: f64,
    /// Circle radius, degrees (about 111 m per 0.001).
    pub radius_deg: f64,
    /// Peak altitude swing around `base_alt`, metres.
    pub alt_variation: f64,
    /// Angle advanced per tick, degrees.
    pub angle_step_deg: f64,
    /// Reported heading, degrees.
    pub orientation: f64,
}

impl PathConfig {
    /// Reject non-finite or negative geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            self.base_lat,
            self.base_lon,
            self.base_alt,
            self.radius_deg,
            self.alt_variation,
            self.angle_step_deg,
            self.orientation,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidPath("values must be finite".to_string()));
        }
        if self.radius_deg < 0.0 {
            return Err(ConfigError::InvalidPath(format!(
                "radius must not be negative, got {}",
                self.radius_deg
            )));
        }
        Ok(())
    }
}

impl Default for PathConfig {
    // Huntsville, AL. Expect it to misbehave near the poles.
    fn default() -> Self {
        Self {
            base_lat: 34.7304,
            base_lon: -86.5861,
            base_alt: 200.0,
            radius_deg: 0.003,
            alt_variation: 10.0,
            angle_step_deg: 5.0,
            orientation: 180.0,
        }
    }
}
