//! Command processing.
//!
//! Turns raw control-stream bytes into a state change and, when warranted, a
//! [`Status`] for the sender.
//!
//! | outcome                        | status published            |
//! |--------------------------------|-----------------------------|
//! | malformed payload              | none (no id to acknowledge) |
//! | at least one setting changed   | `COMPLETED`                 |
//! | nothing changed                | none, or `NOOP` if enabled  |
//! | refused (invalid values)       | `FAILED`                    |

use ocsasim_proto::{Command, Status};
use tracing::{debug, warn};

use crate::simulation::{CommandOutcome, Simulation};

/// Applies inbound commands to a simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProcessor {
    acknowledge_noop: bool,
}

impl CommandProcessor {
    /// Create a processor. With `acknowledge_noop`, commands that change
    /// nothing are answered with `NOOP` instead of silence.
    pub fn new(acknowledge_noop: bool) -> Self {
        Self { acknowledge_noop }
    }

    /// Decode `raw`, apply it to `simulation`, and return the status to
    /// publish, if any.
    ///
    /// Malformed payloads are logged and dropped.
    pub fn process<S>(&self, simulation: &mut S, raw: &[u8]) -> Option<Status>
    where
        S: Simulation + ?Sized,
    {
        let command = match Command::decode(raw) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "dropping malformed command");
                return None;
            },
        };

        match simulation.apply_command(&command) {
            CommandOutcome::Updated => {
                debug!(command_id = %command.id, "command applied");
                Some(Status::completed(command.id))
            },
            CommandOutcome::Unchanged => {
                debug!(command_id = %command.id, "command had no effect");
                self.acknowledge_noop.then(|| Status::noop(command.id))
            },
            CommandOutcome::Rejected { reason } => {
                warn!(command_id = %command.id, %reason, "command rejected");
                Some(Status::failed(command.id, reason))
            },
        }
    }
}
