//! Sim error types.

use std::time::Duration;

use thiserror::Error;

use crate::{hub::HubError, lifecycle::SimPhase};

/// Invalid construction-time configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sim name is empty or whitespace.
    #[error("sim name must not be empty")]
    EmptyName,

    /// Tick interval is zero.
    #[error("tick interval must be greater than zero")]
    ZeroInterval,

    /// Command queue has no capacity.
    #[error("command buffer must hold at least one command")]
    ZeroCommandBuffer,

    /// Lower bound above upper bound.
    #[error("lower bound {lower} exceeds upper bound {upper}")]
    InvalidBounds {
        /// Configured lower bound.
        lower: i64,
        /// Configured upper bound.
        upper: i64,
    },

    /// Step is zero or negative.
    #[error("step must be positive, got {0}")]
    InvalidStep(i64),

    /// Path geometry is unusable.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Errors from sim lifecycle operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// The hub refused or could not take the registration.
    #[error("registration of {sim} failed: {source}")]
    Registration {
        /// Sim that failed to register.
        sim: String,
        /// Underlying hub error.
        #[source]
        source: HubError,
    },

    /// Opening the datastream or control stream failed.
    #[error("opening channels for {sim} failed: {source}")]
    Channel {
        /// Sim whose channels failed to open.
        sim: String,
        /// Underlying hub error.
        #[source]
        source: HubError,
    },

    /// Operation not allowed in the current phase.
    #[error("cannot {operation} a sim in phase {phase}")]
    InvalidTransition {
        /// Lifecycle operation that was attempted.
        operation: &'static str,
        /// Phase the sim was in.
        phase: SimPhase,
    },

    /// Loops did not exit within the stop timeout and were aborted.
    #[error("sim loops did not exit within {0:?}")]
    StopTimeout(Duration),

    /// A loop panicked or was cancelled by the runtime.
    #[error("sim task failed: {0}")]
    TaskFailed(String),
}

impl SimError {
    /// Returns true if the sim instance is unusable after this error.
    ///
    /// A rejected transition leaves the sim where it was. Everything else
    /// either ended in `Stopped` or never produced a usable sim.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidTransition { .. } => false,

            Self::Registration { .. }
            | Self::Channel { .. }
            | Self::StopTimeout(_)
            | Self::TaskFailed(_) => true,
        }
    }
}
