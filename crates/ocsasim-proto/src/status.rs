//! Command status reports.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Message attached to a successfully applied command.
pub const COMPLETED_MESSAGE: &str = "Command processed successfully";

/// Message attached to a command that changed nothing.
pub const NOOP_MESSAGE: &str = "Command had no effect";

/// Outcome of a processed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    /// At least one setting changed.
    Completed,
    /// The command was understood but refused.
    Failed,
    /// The command was valid but every setting already had the requested value.
    Noop,
}

/// Acknowledgment published on a control stream's status channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Id of the command being acknowledged.
    #[serde(rename = "command@id")]
    pub command_id: String,
    /// Outcome.
    #[serde(rename = "statusCode")]
    pub status_code: StatusCode,
    /// Human-readable detail.
    pub message: String,
}

impl Status {
    /// Status for a command that changed state.
    pub fn completed(command_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            status_code: StatusCode::Completed,
            message: COMPLETED_MESSAGE.to_string(),
        }
    }

    /// Status for a command that was refused.
    pub fn failed(command_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { command_id: command_id.into(), status_code: StatusCode::Failed, message: reason.into() }
    }

    /// Status for a command with no effect.
    pub fn noop(command_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            status_code: StatusCode::Noop,
            message: NOOP_MESSAGE.to_string(),
        }
    }

    /// Encode the status as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a status from JSON bytes.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtoError> {
        Ok(serde_json::from_slice(raw)?)
    }
}
