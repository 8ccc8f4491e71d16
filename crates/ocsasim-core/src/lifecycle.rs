//! Sim lifecycle.
//!
//! ```text
//! CREATED ──insert()──► REGISTERED ──start()──► RUNNING ──stop()──► STOPPED
//!    │                       │
//!    └── registration err ───┴── channel err ─────────────────────► STOPPED
//! ```
//!
//! `STOPPED` is terminal. Calling an operation from the wrong phase returns
//! [`SimError::InvalidTransition`] and leaves the phase unchanged.

use std::{fmt, mem, sync::Arc};

use async_trait::async_trait;
use ocsasim_proto::{DataRecordSchema, SystemDescription};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::SimConfig,
    env::Environment,
    error::{ConfigError, SimError},
    hub::{ControlChannels, ControlStreamId, DatastreamId, Hub, HubError, Publisher, SystemId},
    processor::CommandProcessor,
    simulation::Simulation,
    tasks::{GeneratorLoop, run_listener},
};

/// Lifecycle phase of a [`Sim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimPhase {
    /// Constructed, nothing registered.
    Created,
    /// System and streams registered with the hub.
    Registered,
    /// Loops running.
    Running,
    /// Terminal.
    Stopped,
}

impl fmt::Display for SimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "CREATED",
            Self::Registered => "REGISTERED",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
        })
    }
}

/// Identity of a sim: its name plus a process-unique instance id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimId {
    /// Configured name.
    pub name: String,
    /// Random per-instance id.
    pub instance: u64,
}

impl fmt::Display for SimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:016x}", self.name, self.instance)
    }
}

/// Hub resources created by `insert()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    /// Registered system.
    pub system: SystemId,
    /// Observation stream.
    pub datastream: DatastreamId,
    /// Command stream, for controllable sims.
    pub control_stream: Option<ControlStreamId>,
}

/// Owned snapshot of what to register, so no borrow of the simulation is
/// held across hub calls.
struct Registration {
    system: SystemDescription,
    datastream: DataRecordSchema,
    control: Option<DataRecordSchema>,
}

impl Registration {
    fn of<S: Simulation>(simulation: &S, label: &str) -> Self {
        Self {
            system: SystemDescription::new(simulation.kind(), label),
            datastream: simulation.datastream_schema(),
            control: simulation.control_schema(),
        }
    }

    async fn register<H: Hub>(self, hub: &H) -> Result<Resources, HubError> {
        let system = hub.register_system(&self.system).await?;
        let datastream = hub.register_datastream(&system, &self.datastream).await?;
        let control_stream = match &self.control {
            Some(schema) => Some(hub.register_control_stream(&system, schema).await?),
            None => None,
        };
        Ok(Resources { system, datastream, control_stream })
    }
}

enum Lifecycle<S> {
    Created {
        simulation: S,
    },
    Registered {
        simulation: S,
        resources: Resources,
    },
    Running {
        cancel: CancellationToken,
        generator: JoinHandle<S>,
        listener: Option<JoinHandle<()>>,
    },
    /// `simulation` is `None` if a loop had to be aborted.
    Stopped {
        simulation: Option<S>,
    },
}

impl<S> Lifecycle<S> {
    fn phase(&self) -> SimPhase {
        match self {
            Self::Created { .. } => SimPhase::Created,
            Self::Registered { .. } => SimPhase::Registered,
            Self::Running { .. } => SimPhase::Running,
            Self::Stopped { .. } => SimPhase::Stopped,
        }
    }
}

/// A simulated sensor bound to a hub.
///
/// Generic over the [`Simulation`] it runs, the [`Hub`] it talks to and the
/// [`Environment`] supplying time. Dropping a running `Sim` cancels its loops
/// without waiting for them.
pub struct Sim<S, H, E> {
    id: SimId,
    config: SimConfig,
    hub: Arc<H>,
    env: E,
    state: Lifecycle<S>,
}

impl<S, H, E> Sim<S, H, E>
where
    S: Simulation,
    H: Hub,
    E: Environment,
{
    /// Create a sim in phase `CREATED`.
    pub fn new(simulation: S, config: SimConfig, hub: Arc<H>, env: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = SimId { name: config.name.clone(), instance: env.random_u64() };
        Ok(Self { id, config, hub, env, state: Lifecycle::Created { simulation } })
    }

    /// Sim identity.
    pub fn id(&self) -> &SimId {
        &self.id
    }

    /// Current phase.
    pub fn phase(&self) -> SimPhase {
        self.state.phase()
    }

    /// Construction config.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Registered hub resources, once inserted and until started.
    pub fn resources(&self) -> Option<&Resources> {
        match &self.state {
            Lifecycle::Registered { resources, .. } => Some(resources),
            _ => None,
        }
    }

    /// The simulation, when not owned by a running loop.
    pub fn simulation(&self) -> Option<&S> {
        match &self.state {
            Lifecycle::Created { simulation } | Lifecycle::Registered { simulation, .. } => {
                Some(simulation)
            },
            Lifecycle::Stopped { simulation } => simulation.as_ref(),
            Lifecycle::Running { .. } => None,
        }
    }

    /// Register the system, its datastream and, if controllable, its control
    /// stream. `CREATED -> REGISTERED`.
    ///
    /// A hub failure is fatal: the sim moves to `STOPPED`.
    pub async fn insert(&mut self) -> Result<(), SimError> {
        let simulation = match self.take_state() {
            Lifecycle::Created { simulation } => simulation,
            other => return Err(self.restore(other, "insert")),
        };

        let registration = Registration::of(&simulation, &self.config.name);
        let hub = Arc::clone(&self.hub);

        match registration.register(hub.as_ref()).await {
            Ok(resources) => {
                info!(
                    sim = %self.id,
                    system = %resources.system,
                    datastream = %resources.datastream,
                    controllable = resources.control_stream.is_some(),
                    "sim registered"
                );
                self.state = Lifecycle::Registered { simulation, resources };
                Ok(())
            },
            Err(source) => {
                warn!(sim = %self.id, error = %source, "registration failed");
                self.state = Lifecycle::Stopped { simulation: Some(simulation) };
                Err(SimError::Registration { sim: self.id.to_string(), source })
            },
        }
    }

    /// Open the channels and spawn the loops. `REGISTERED -> RUNNING`.
    ///
    /// Returns once the loops are spawned; the first observation is
    /// published on their first poll.
    pub async fn start(&mut self) -> Result<(), SimError> {
        let (simulation, resources) = match self.take_state() {
            Lifecycle::Registered { simulation, resources } => (simulation, resources),
            other => return Err(self.restore(other, "start")),
        };

        let hub = Arc::clone(&self.hub);
        let (datastream, control) = match open_channels(hub.as_ref(), &resources).await {
            Ok(channels) => channels,
            Err(source) => {
                warn!(sim = %self.id, error = %source, "opening channels failed");
                self.state = Lifecycle::Stopped { simulation: Some(simulation) };
                return Err(SimError::Channel { sim: self.id.to_string(), source });
            },
        };

        let cancel = CancellationToken::new();
        let sim = self.id.to_string();

        let (commands, status, listener) = match control {
            Some(ControlChannels { status, commands }) => {
                let (forward, queue) = mpsc::channel(self.config.command_buffer);
                let listener = tokio::spawn(run_listener(sim.clone(), commands, forward, cancel.clone()));
                (Some(queue), Some(status), Some(listener))
            },
            None => (None, None, None),
        };

        let generator = tokio::spawn(
            GeneratorLoop {
                sim,
                simulation,
                env: self.env.clone(),
                interval: self.config.interval,
                datastream,
                commands,
                status,
                processor: CommandProcessor::new(self.config.acknowledge_noop),
                cancel: cancel.clone(),
            }
            .run(),
        );

        info!(sim = %self.id, interval = ?self.config.interval, "sim started");
        self.state = Lifecycle::Running { cancel, generator, listener };
        Ok(())
    }

    /// Cancel both loops and wait for them. `RUNNING -> STOPPED`.
    ///
    /// Loops finish their current iteration. If they have not exited within
    /// `stop_timeout` they are aborted, awaited until gone, and `StopTimeout`
    /// is returned. The sim is `STOPPED` either way, and nothing is published
    /// after this returns.
    pub async fn stop(&mut self) -> Result<(), SimError> {
        let (cancel, mut generator, mut listener) = match self.take_state() {
            Lifecycle::Running { cancel, generator, listener } => (cancel, generator, listener),
            other => return Err(self.restore(other, "stop")),
        };

        cancel.cancel();
        let timeout = self.config.stop_timeout;

        let join = async {
            if let Some(listener) = listener.as_mut() {
                listener.await.map_err(|e| SimError::TaskFailed(e.to_string()))?;
            }
            (&mut generator).await.map_err(|e| SimError::TaskFailed(e.to_string()))
        };
        let joined = tokio::time::timeout(timeout, join).await;

        match joined {
            Ok(Ok(simulation)) => {
                info!(sim = %self.id, "sim stopped");
                self.state = Lifecycle::Stopped { simulation: Some(simulation) };
                Ok(())
            },
            Ok(Err(e)) => {
                warn!(sim = %self.id, error = %e, "sim loop failed");
                abort(generator, listener).await;
                self.state = Lifecycle::Stopped { simulation: None };
                Err(e)
            },
            Err(_) => {
                warn!(sim = %self.id, ?timeout, "sim loops did not exit, aborting");
                abort(generator, listener).await;
                self.state = Lifecycle::Stopped { simulation: None };
                Err(SimError::StopTimeout(timeout))
            },
        }
    }

    fn take_state(&mut self) -> Lifecycle<S> {
        mem::replace(&mut self.state, Lifecycle::Stopped { simulation: None })
    }

    fn restore(&mut self, state: Lifecycle<S>, operation: &'static str) -> SimError {
        let phase = state.phase();
        self.state = state;
        debug!(sim = %self.id, operation, %phase, "rejected lifecycle transition");
        SimError::InvalidTransition { operation, phase }
    }
}

impl<S, H, E> Drop for Sim<S, H, E> {
    fn drop(&mut self) {
        if let Lifecycle::Running { cancel, .. } = &self.state {
            cancel.cancel();
        }
    }
}

impl<S, H, E> fmt::Debug for Sim<S, H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sim")
            .field("id", &self.id)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

async fn open_channels<H: Hub>(
    hub: &H,
    resources: &Resources,
) -> Result<(Box<dyn Publisher>, Option<ControlChannels>), HubError> {
    let datastream = hub.open_datastream(&resources.datastream).await?;
    let control = match &resources.control_stream {
        Some(id) => Some(hub.open_control_stream(id).await?),
        None => None,
    };
    Ok((datastream, control))
}

/// Abort both loops and wait until they are gone. Aborted tasks resolve with
/// a cancellation error, which is expected here.
async fn abort<S>(generator: JoinHandle<S>, listener: Option<JoinHandle<()>>) {
    generator.abort();
    if let Some(listener) = &listener {
        listener.abort();
    }
    match generator.await {
        Err(e) if !e.is_cancelled() => debug!(error = %e, "generator loop failed while aborting"),
        _ => {},
    }
    if let Some(listener) = listener {
        match listener.await {
            Err(e) if !e.is_cancelled() => debug!(error = %e, "listener loop failed while aborting"),
            _ => {},
        }
    }
}

/// Object-safe lifecycle handle, for driving sims of different types
/// together.
#[async_trait]
pub trait SimControl: Send {
    /// Sim identity.
    fn id(&self) -> &SimId;

    /// Current phase.
    fn phase(&self) -> SimPhase;

    /// See [`Sim::insert`].
    async fn insert(&mut self) -> Result<(), SimError>;

    /// See [`Sim::start`].
    async fn start(&mut self) -> Result<(), SimError>;

    /// See [`Sim::stop`].
    async fn stop(&mut self) -> Result<(), SimError>;
}

#[async_trait]
impl<S, H, E> SimControl for Sim<S, H, E>
where
    S: Simulation,
    H: Hub,
    E: Environment,
{
    fn id(&self) -> &SimId {
        Self::id(self)
    }

    fn phase(&self) -> SimPhase {
        Self::phase(self)
    }

    async fn insert(&mut self) -> Result<(), SimError> {
        Self::insert(self).await
    }

    async fn start(&mut self) -> Result<(), SimError> {
        Self::start(self).await
    }

    async fn stop(&mut self) -> Result<(), SimError> {
        Self::stop(self).await
    }
}
