//! Inbound control-stream commands.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;

/// A control command received from the hub.
///
/// Only the envelope is validated here. Which `parameters` keys mean anything
/// is up to the simulation that consumes the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Opaque identifier, echoed back in the [`Status`](crate::Status).
    pub id: String,
    /// Setting name to requested value.
    pub parameters: Map<String, Value>,
}

impl Command {
    /// Create a command from an id and a parameter map.
    pub fn new(id: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self { id: id.into(), parameters }
    }

    /// Decode a command from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Malformed`] if the bytes are not a JSON object
    /// with a string `id` and an object `parameters`.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtoError> {
        serde_json::from_slice(raw).map_err(|e| ProtoError::Malformed { reason: e.to_string() })
    }

    /// Encode the command as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Look up a parameter by setting name.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}
