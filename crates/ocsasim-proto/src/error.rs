//! Protocol error types.

use thiserror::Error;

/// Errors from encoding or decoding wire payloads.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Payload is structurally invalid (not an object, missing `id` or
    /// `parameters`, wrong field types).
    #[error("malformed command: {reason}")]
    Malformed {
        /// Description of what is wrong with the payload.
        reason: String,
    },

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
