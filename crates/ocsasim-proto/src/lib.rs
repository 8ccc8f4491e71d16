//! OCSASim wire types.
//!
//! JSON payloads exchanged between a simulated sensor and the sensor hub:
//!
//! - [`Observation`]: one timestamped telemetry record on a datastream
//! - [`Command`]: inbound instruction on a control stream
//! - [`Status`]: acknowledgment of a processed command
//!
//! The [`schema`] module carries the static description of systems and their
//! streams that the hub needs at registration time.
//!
//! This crate has no I/O and no runtime dependency. Encoding and decoding are
//! pure functions over byte slices.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod observation;
pub mod schema;
mod status;

pub use command::Command;
pub use error::ProtoError;
pub use observation::Observation;
pub use schema::{Component, DataRecordSchema, SystemDescription};
pub use status::{Status, StatusCode};
