//! In-memory sensor hub.
//!
//! Records every registration and every published payload, and lets tests
//! inject commands into control streams. Failure switches simulate an
//! unreachable hub, rejected payloads, slow publishes and a publisher that
//! never returns.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use ocsasim_core::{
    ControlChannels, ControlStreamId, DatastreamId, Hub, HubError, Publisher, Subscriber, SystemId,
};
use ocsasim_proto::{DataRecordSchema, Observation, Status, SystemDescription};
use tokio::sync::mpsc;
use tracing::debug;

type Log = Arc<Mutex<Vec<Bytes>>>;

/// A registered system.
#[derive(Debug, Clone)]
pub struct SystemRecord {
    /// Hub-assigned id.
    pub id: SystemId,
    /// Description sent at registration.
    pub description: SystemDescription,
}

/// A registered datastream or control stream.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    /// Owning system.
    pub system: SystemId,
    /// Schema sent at registration.
    pub schema: DataRecordSchema,
}

struct ControlStream {
    record: StreamRecord,
    inject: Option<mpsc::UnboundedSender<Bytes>>,
    commands: Option<mpsc::UnboundedReceiver<Bytes>>,
    statuses: Log,
}

#[derive(Default)]
struct HubState {
    systems: Vec<SystemRecord>,
    datastreams: HashMap<String, (StreamRecord, Log)>,
    control_streams: HashMap<String, ControlStream>,
}

#[derive(Default)]
struct Faults {
    unreachable: AtomicBool,
    reject_publish: Arc<AtomicBool>,
    stall_publish: Arc<AtomicBool>,
    publish_delay_ms: Arc<AtomicU64>,
}

/// Hub that keeps everything in memory.
#[derive(Default)]
pub struct MemoryHub {
    state: Mutex<HubState>,
    next_id: AtomicU64,
    faults: Faults,
    publishers: Arc<()>,
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every registration and open call fail with
    /// [`HubError::Unreachable`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.faults.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make every publish fail with [`HubError::Rejected`].
    pub fn set_reject_publish(&self, reject: bool) {
        self.faults.reject_publish.store(reject, Ordering::SeqCst);
    }

    /// Make every publish hang forever.
    pub fn set_stall_publish(&self, stall: bool) {
        self.faults.stall_publish.store(stall, Ordering::SeqCst);
    }

    /// Make every publish take `delay` before it is recorded.
    pub fn set_publish_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.faults.publish_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Publishers handed out and not yet dropped.
    pub fn live_publishers(&self) -> usize {
        Arc::strong_count(&self.publishers) - 1
    }

    /// Registered systems, in order.
    pub fn systems(&self) -> Vec<SystemRecord> {
        self.lock().systems.clone()
    }

    /// Registered system with `name`.
    pub fn system_named(&self, name: &str) -> Option<SystemRecord> {
        self.lock().systems.iter().find(|s| s.description.name == name).cloned()
    }

    /// Datastreams registered under `system`.
    pub fn datastreams_of(&self, system: &SystemId) -> Vec<DatastreamId> {
        let state = self.lock();
        let mut ids: Vec<_> = state
            .datastreams
            .iter()
            .filter(|(_, (record, _))| &record.system == system)
            .map(|(id, _)| DatastreamId(id.clone()))
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }

    /// Control streams registered under `system`.
    pub fn control_streams_of(&self, system: &SystemId) -> Vec<ControlStreamId> {
        let state = self.lock();
        let mut ids: Vec<_> = state
            .control_streams
            .iter()
            .filter(|(_, stream)| &stream.record.system == system)
            .map(|(id, _)| ControlStreamId(id.clone()))
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }

    /// Schema a datastream was registered with.
    pub fn datastream_schema(&self, id: &DatastreamId) -> Option<DataRecordSchema> {
        self.lock().datastreams.get(&id.0).map(|(record, _)| record.schema.clone())
    }

    /// Schema a control stream was registered with.
    pub fn control_schema(&self, id: &ControlStreamId) -> Option<DataRecordSchema> {
        self.lock().control_streams.get(&id.0).map(|stream| stream.record.schema.clone())
    }

    /// Raw payloads published on a datastream.
    pub fn published(&self, id: &DatastreamId) -> Vec<Bytes> {
        self.lock().datastreams.get(&id.0).map(|(_, log)| snapshot(log)).unwrap_or_default()
    }

    /// Decoded observations published on a datastream. Undecodable payloads
    /// are skipped.
    pub fn observations(&self, id: &DatastreamId) -> Vec<Observation> {
        self.published(id).iter().filter_map(|raw| Observation::decode(raw).ok()).collect()
    }

    /// Decoded statuses published on a control stream.
    pub fn statuses(&self, id: &ControlStreamId) -> Vec<Status> {
        let state = self.lock();
        let Some(stream) = state.control_streams.get(&id.0) else { return Vec::new() };
        snapshot(&stream.statuses).iter().filter_map(|raw| Status::decode(raw).ok()).collect()
    }

    /// Deliver a raw command on a control stream.
    pub fn send_command(&self, id: &ControlStreamId, raw: impl Into<Bytes>) -> Result<(), HubError> {
        let state = self.lock();
        let stream = state
            .control_streams
            .get(&id.0)
            .ok_or_else(|| HubError::UnknownStream(id.0.clone()))?;
        let inject = stream.inject.as_ref().ok_or(HubError::Closed)?;
        inject.send(raw.into()).map_err(|_| HubError::Closed)
    }

    /// Close the command side of a control stream; the subscriber sees the
    /// end of the stream.
    pub fn close_commands(&self, id: &ControlStreamId) {
        if let Some(stream) = self.lock().control_streams.get_mut(&id.0) {
            stream.inject = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reachable(&self) -> Result<(), HubError> {
        if self.faults.unreachable.load(Ordering::SeqCst) {
            return Err(HubError::Unreachable("memory hub offline".to_string()));
        }
        Ok(())
    }

    fn mint(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn publisher(&self, log: Log) -> MemoryPublisher {
        MemoryPublisher {
            log,
            reject: Arc::clone(&self.faults.reject_publish),
            stall: Arc::clone(&self.faults.stall_publish),
            delay_ms: Arc::clone(&self.faults.publish_delay_ms),
            _live: Arc::clone(&self.publishers),
        }
    }
}

fn snapshot(log: &Log) -> Vec<Bytes> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

#[async_trait]
impl Hub for MemoryHub {
    async fn register_system(&self, system: &SystemDescription) -> Result<SystemId, HubError> {
        self.check_reachable()?;
        let mut state = self.lock();
        if state.systems.iter().any(|s| s.description.urn == system.urn) {
            return Err(HubError::Rejected(format!("duplicate urn {}", system.urn)));
        }

        let id = SystemId(self.mint("sys"));
        debug!(system = %id, urn = %system.urn, "registered system");
        state.systems.push(SystemRecord { id: id.clone(), description: system.clone() });
        Ok(id)
    }

    async fn register_datastream(
        &self,
        system: &SystemId,
        schema: &DataRecordSchema,
    ) -> Result<DatastreamId, HubError> {
        self.check_reachable()?;
        let mut state = self.lock();
        if !state.systems.iter().any(|s| &s.id == system) {
            return Err(HubError::UnknownStream(system.0.clone()));
        }

        let id = self.mint("ds");
        let record = StreamRecord { system: system.clone(), schema: schema.clone() };
        state.datastreams.insert(id.clone(), (record, Log::default()));
        Ok(DatastreamId(id))
    }

    async fn register_control_stream(
        &self,
        system: &SystemId,
        schema: &DataRecordSchema,
    ) -> Result<ControlStreamId, HubError> {
        self.check_reachable()?;
        let mut state = self.lock();
        if !state.systems.iter().any(|s| &s.id == system) {
            return Err(HubError::UnknownStream(system.0.clone()));
        }

        let id = self.mint("cs");
        let (inject, commands) = mpsc::unbounded_channel();
        state.control_streams.insert(
            id.clone(),
            ControlStream {
                record: StreamRecord { system: system.clone(), schema: schema.clone() },
                inject: Some(inject),
                commands: Some(commands),
                statuses: Log::default(),
            },
        );
        Ok(ControlStreamId(id))
    }

    async fn open_datastream(&self, id: &DatastreamId) -> Result<Box<dyn Publisher>, HubError> {
        self.check_reachable()?;
        let log = self
            .lock()
            .datastreams
            .get(&id.0)
            .map(|(_, log)| Arc::clone(log))
            .ok_or_else(|| HubError::UnknownStream(id.0.clone()))?;
        Ok(Box::new(self.publisher(log)))
    }

    async fn open_control_stream(&self, id: &ControlStreamId) -> Result<ControlChannels, HubError> {
        self.check_reachable()?;
        let (commands, statuses) = {
            let mut state = self.lock();
            let stream = state
                .control_streams
                .get_mut(&id.0)
                .ok_or_else(|| HubError::UnknownStream(id.0.clone()))?;
            let commands = stream
                .commands
                .take()
                .ok_or_else(|| HubError::Rejected(format!("control stream {id} already open")))?;
            (commands, Arc::clone(&stream.statuses))
        };

        Ok(ControlChannels {
            status: Box::new(self.publisher(statuses)),
            commands: Box::new(MemorySubscriber { commands }),
        })
    }
}

struct MemoryPublisher {
    log: Log,
    reject: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
    _live: Arc<()>,
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, payload: Bytes) -> Result<(), HubError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(HubError::Rejected("publish refused".to_string()));
        }
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(payload);
        Ok(())
    }
}

struct MemorySubscriber {
    commands: mpsc::UnboundedReceiver<Bytes>,
}

#[async_trait]
impl Subscriber for MemorySubscriber {
    async fn recv(&mut self) -> Option<Bytes> {
        self.commands.recv().await
    }
}
