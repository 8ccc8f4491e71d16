//! Stand-in hub for running sims without a sensor hub.
//!
//! Registrations are assigned local ids and logged. Observations and
//! statuses are written to the log at `info`. Commands are read from stdin,
//! one per line:
//!
//! ```text
//! controllableCounter {"id":"c1","parameters":{"setStep":20}}
//! ```
//!
//! The first word is the system name (the lowerCamel form of the sim label).

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use ocsasim_core::{
    ControlChannels, ControlStreamId, DatastreamId, Hub, HubError, Publisher, Subscriber, SystemId,
};
use ocsasim_proto::{DataRecordSchema, SystemDescription};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

struct ControlRoute {
    system_name: String,
    inject: mpsc::UnboundedSender<Bytes>,
    commands: Option<mpsc::UnboundedReceiver<Bytes>>,
}

#[derive(Default)]
struct ConsoleState {
    systems: HashMap<SystemId, String>,
    datastreams: HashMap<DatastreamId, String>,
    control_streams: HashMap<ControlStreamId, ControlRoute>,
}

/// Hub that logs what it is sent and takes commands from stdin.
#[derive(Default)]
pub struct ConsoleHub {
    state: Mutex<ConsoleState>,
    next_id: AtomicU64,
}

impl ConsoleHub {
    /// Create a hub with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one `<system-name> <command-json>` line to its control stream.
    pub fn route_line(&self, line: &str) -> Result<(), HubError> {
        let line = line.trim();
        let Some((name, command)) = line.split_once(char::is_whitespace) else {
            return Err(HubError::Rejected(format!(
                "expected `<sim-name> <command-json>`, got {line:?}"
            )));
        };

        let state = self.lock();
        let route = state
            .control_streams
            .values()
            .find(|route| route.system_name == name)
            .ok_or_else(|| HubError::UnknownStream(name.to_string()))?;

        route
            .inject
            .send(Bytes::copy_from_slice(command.trim_start().as_bytes()))
            .map_err(|_| HubError::Closed)
    }

    /// Read stdin until EOF, routing each non-empty line.
    pub fn spawn_stdin_reader(self: &Arc<Self>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {},
                    Ok(Some(line)) => {
                        if let Err(e) = hub.route_line(&line) {
                            warn!(error = %e, "command not routed");
                        }
                    },
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    },
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    },
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mint(&self, prefix: &str) -> String {
        format!("{prefix}-{:04}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl Hub for ConsoleHub {
    async fn register_system(&self, system: &SystemDescription) -> Result<SystemId, HubError> {
        let mut state = self.lock();
        if state.systems.values().any(|name| name == &system.name) {
            return Err(HubError::Rejected(format!("system {} already registered", system.name)));
        }

        let id = SystemId(self.mint("system"));
        info!(system = %id, name = %system.name, urn = %system.urn, "system registered");
        state.systems.insert(id.clone(), system.name.clone());
        Ok(id)
    }

    async fn register_datastream(
        &self,
        system: &SystemId,
        schema: &DataRecordSchema,
    ) -> Result<DatastreamId, HubError> {
        let mut state = self.lock();
        let name = state
            .systems
            .get(system)
            .cloned()
            .ok_or_else(|| HubError::UnknownStream(system.0.clone()))?;

        let id = DatastreamId(self.mint("datastream"));
        info!(datastream = %id, system = %name, label = %schema.label, "datastream registered");
        state.datastreams.insert(id.clone(), name);
        Ok(id)
    }

    async fn register_control_stream(
        &self,
        system: &SystemId,
        schema: &DataRecordSchema,
    ) -> Result<ControlStreamId, HubError> {
        let mut state = self.lock();
        let system_name = state
            .systems
            .get(system)
            .cloned()
            .ok_or_else(|| HubError::UnknownStream(system.0.clone()))?;

        let id = ControlStreamId(self.mint("controlstream"));
        info!(control_stream = %id, system = %system_name, label = %schema.label, "control stream registered");

        let (inject, commands) = mpsc::unbounded_channel();
        state
            .control_streams
            .insert(id.clone(), ControlRoute { system_name, inject, commands: Some(commands) });
        Ok(id)
    }

    async fn open_datastream(&self, id: &DatastreamId) -> Result<Box<dyn Publisher>, HubError> {
        let state = self.lock();
        let system = state
            .datastreams
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::UnknownStream(id.0.clone()))?;
        Ok(Box::new(LogPublisher { system, channel: "observation" }))
    }

    async fn open_control_stream(&self, id: &ControlStreamId) -> Result<ControlChannels, HubError> {
        let mut state = self.lock();
        let route = state
            .control_streams
            .get_mut(id)
            .ok_or_else(|| HubError::UnknownStream(id.0.clone()))?;
        let commands = route
            .commands
            .take()
            .ok_or_else(|| HubError::Rejected(format!("control stream {id} already open")))?;

        Ok(ControlChannels {
            status: Box::new(LogPublisher { system: route.system_name.clone(), channel: "status" }),
            commands: Box::new(ChannelSubscriber { commands }),
        })
    }
}

struct LogPublisher {
    system: String,
    channel: &'static str,
}

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, payload: Bytes) -> Result<(), HubError> {
        let text = std::str::from_utf8(&payload)
            .map_err(|e| HubError::Rejected(format!("payload is not UTF-8: {e}")))?;
        info!(system = %self.system, channel = self.channel, payload = %text, "published");
        Ok(())
    }
}

struct ChannelSubscriber {
    commands: mpsc::UnboundedReceiver<Bytes>,
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn recv(&mut self) -> Option<Bytes> {
        self.commands.recv().await
    }
}
