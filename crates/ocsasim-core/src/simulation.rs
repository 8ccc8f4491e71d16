//! The per-sensor behaviour plugged into a [`Sim`](crate::Sim).

use ocsasim_proto::{Command, DataRecordSchema};
use serde_json::{Map, Value};

/// Result of applying a command to simulation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// At least one setting changed.
    Updated,
    /// Every recognized setting already had the requested value, or none was
    /// present.
    Unchanged,
    /// The command was refused and state is untouched.
    Rejected {
        /// Why the command was refused.
        reason: String,
    },
}

/// A simulated sensor: its schemas, its generator and its command handling.
///
/// Implementations hold the mutable state. The lifecycle guarantees that
/// `tick` and `apply_command` are only ever called from one task, so they
/// take `&mut self` and need no locking.
pub trait Simulation: Send + 'static {
    /// Sensor kind, used in the system URN.
    fn kind(&self) -> &'static str;

    /// Structure of the observations this sim publishes.
    fn datastream_schema(&self) -> DataRecordSchema;

    /// Structure of the commands this sim accepts.
    ///
    /// `None` means the sim is not controllable and runs no listener loop.
    fn control_schema(&self) -> Option<DataRecordSchema> {
        None
    }

    /// Advance one tick and return the observation result.
    ///
    /// `tick` counts from 1 for the first observation of a run.
    fn tick(&mut self, tick: u64) -> Map<String, Value>;

    /// Apply a decoded command.
    ///
    /// Implementations must change nothing unless they return
    /// [`CommandOutcome::Updated`].
    fn apply_command(&mut self, command: &Command) -> CommandOutcome {
        let _ = command;
        CommandOutcome::Unchanged
    }
}
