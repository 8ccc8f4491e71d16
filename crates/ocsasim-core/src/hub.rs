//! Sensor-hub collaborator interfaces.
//!
//! The hub client (transport, authentication, resource paths) lives outside
//! this crate. A [`Sim`](crate::Sim) only needs to register its resources,
//! then publish payloads and receive raw command bytes. Handles are passed in
//! explicitly; there is no process-wide connection.
//!
//! Registration happens in `insert()`, channel setup in `start()`:
//!
//! ```text
//! register_system ──► register_datastream ──► open_datastream ──► Publisher
//!                 └─► register_control_stream ──► open_control_stream
//!                                                   ├─► Publisher  (status)
//!                                                   └─► Subscriber (commands)
//! ```

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use ocsasim_proto::{DataRecordSchema, SystemDescription};
use thiserror::Error;

macro_rules! resource_id {
    ($name:ident, $what:literal) => {
        #[doc = concat!("Hub-assigned id of a registered ", $what, ".")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

resource_id!(SystemId, "system");
resource_id!(DatastreamId, "datastream");
resource_id!(ControlStreamId, "control stream");

/// Errors reported by a hub client.
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub could not be reached.
    #[error("hub unreachable: {0}")]
    Unreachable(String),

    /// The hub refused the request (bad schema, duplicate system, auth).
    #[error("hub rejected request: {0}")]
    Rejected(String),

    /// The channel was closed by the hub side.
    #[error("channel closed")]
    Closed,

    /// The referenced resource was never registered.
    #[error("unknown stream: {0}")]
    UnknownStream(String),
}

/// Outbound conduit for observations or statuses.
///
/// Delivery is fire-and-forget from the sim's point of view: an `Err` is
/// logged and the payload is dropped, never retried.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one JSON payload.
    async fn publish(&self, payload: Bytes) -> Result<(), HubError>;
}

/// Inbound conduit for raw command bytes.
#[async_trait]
pub trait Subscriber: Send {
    /// Wait for the next command payload.
    ///
    /// Returns `None` once the stream is closed. Must be cancel-safe: if the
    /// future is dropped before completing, no payload may be lost.
    async fn recv(&mut self) -> Option<Bytes>;
}

/// Both directions of an opened control stream.
pub struct ControlChannels {
    /// Status reports go out here.
    pub status: Box<dyn Publisher>,
    /// Commands come in here.
    pub commands: Box<dyn Subscriber>,
}

/// Client-side view of a sensor hub.
#[async_trait]
pub trait Hub: Send + Sync + 'static {
    /// Register a system and return its id.
    async fn register_system(&self, system: &SystemDescription) -> Result<SystemId, HubError>;

    /// Register a datastream under `system`.
    async fn register_datastream(
        &self,
        system: &SystemId,
        schema: &DataRecordSchema,
    ) -> Result<DatastreamId, HubError>;

    /// Register a control stream under `system`.
    async fn register_control_stream(
        &self,
        system: &SystemId,
        schema: &DataRecordSchema,
    ) -> Result<ControlStreamId, HubError>;

    /// Open the publish side of a registered datastream.
    async fn open_datastream(&self, id: &DatastreamId) -> Result<Box<dyn Publisher>, HubError>;

    /// Open both sides of a registered control stream.
    async fn open_control_stream(&self, id: &ControlStreamId)
    -> Result<ControlChannels, HubError>;
}
