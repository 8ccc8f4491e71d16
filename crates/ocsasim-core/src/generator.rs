//! Telemetry generators.
//!
//! Pure functions from current state to next value. Nothing here touches
//! time, I/O or shared state, so every generator is deterministic given its
//! input and can be tested without a runtime.

use crate::config::{CounterConfig, PathConfig};

/// State of a controllable counter.
///
/// # Invariants
///
/// - `lower_bound <= upper_bound`
/// - `step > 0`
/// - `lower_bound <= count <= upper_bound` after every [`next_count`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    /// Current value.
    pub count: i64,
    /// Smallest value.
    pub lower_bound: i64,
    /// Largest value.
    pub upper_bound: i64,
    /// Magnitude of each increment.
    pub step: i64,
    /// Counting direction; `true` means sign -1.
    pub count_down: bool,
}

impl CounterState {
    /// Initial state: the counter starts at its lower bound.
    pub fn from_config(config: &CounterConfig) -> Self {
        Self {
            count: config.lower_bound,
            lower_bound: config.lower_bound,
            upper_bound: config.upper_bound,
            step: config.step,
            count_down: config.count_down,
        }
    }

    /// Direction sign, +1 or -1.
    pub fn sign(&self) -> i64 {
        if self.count_down { -1 } else { 1 }
    }

    /// Returns true if the bounds contain `count`.
    pub fn in_bounds(&self) -> bool {
        self.lower_bound <= self.count && self.count <= self.upper_bound
    }
}

/// Next counter value.
///
/// Adds `step * sign`, then wraps: counting up, reaching `upper_bound`
/// restarts at `lower_bound`; counting down, reaching `lower_bound` restarts
/// at `upper_bound`. The result is a sawtooth, never a bounce.
pub fn next_count(state: &CounterState) -> i64 {
    let next = state.count.saturating_add(state.step.saturating_mul(state.sign()));

    if state.count_down {
        if next <= state.lower_bound { state.upper_bound } else { next }
    } else if next >= state.upper_bound {
        state.lower_bound
    } else {
        next
    }
}

/// A geodetic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude, degrees.
    pub lat: f64,
    /// Longitude, degrees.
    pub lon: f64,
    /// Altitude, metres.
    pub alt: f64,
}

/// Point on the configured circle at `angle` radians.
///
/// Periodic in `angle`, so an ever-growing accumulator needs no reset.
pub fn circle_point(path: &PathConfig, angle: f64) -> GeoPoint {
    let (sin, cos) = angle.sin_cos();
    GeoPoint {
        lat: path.base_lat + path.radius_deg * cos,
        lon: path.base_lon + path.radius_deg * sin,
        alt: path.base_alt + path.alt_variation * sin,
    }
}
