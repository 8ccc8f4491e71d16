//! Datastream observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;

/// One telemetry record.
///
/// Synthetic data has no acquisition delay, so `phenomenon_time` always
/// equals `result_time` when built through [`Observation::at`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// When the result was produced.
    pub result_time: DateTime<Utc>,
    /// When the observed phenomenon happened.
    pub phenomenon_time: DateTime<Utc>,
    /// Field name to value, as described by the datastream schema.
    pub result: Map<String, Value>,
}

impl Observation {
    /// Build an observation stamped at `time`.
    pub fn at(time: DateTime<Utc>, result: Map<String, Value>) -> Self {
        Self { result_time: time, phenomenon_time: time, result }
    }

    /// Encode the observation as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an observation from JSON bytes.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtoError> {
        Ok(serde_json::from_slice(raw)?)
    }
}
