//! Sim registry.
//!
//! Builds sims from a [`DriverConfig`] and drives them through their
//! lifecycle together. A sim whose `insert()` or `start()` fails is dropped
//! from the registry and reported; the others keep going.

use std::sync::Arc;

use ocsasim_core::{
    ControllableCounter, Environment, GpsSim, Hub, Sim, SimControl, SimError, SimId, SimPhase,
};
use tracing::{error, info};

use crate::{
    config::{DriverConfig, SimKind, SimSpec},
    error::DriverError,
};

/// A lifecycle operation that failed for one sim.
#[derive(Debug)]
pub struct SimFailure {
    /// Sim that failed.
    pub sim: SimId,
    /// Why.
    pub error: SimError,
}

/// Type-erased sims driven together.
#[derive(Default)]
pub struct SimRegistry {
    sims: Vec<Box<dyn SimControl>>,
}

impl SimRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every sim in `config` against `hub`.
    pub fn from_config<H, E>(config: &DriverConfig, hub: &Arc<H>, env: &E) -> Result<Self, DriverError>
    where
        H: Hub,
        E: Environment,
    {
        let mut registry = Self::new();
        for spec in &config.sims {
            registry.add(build(spec, Arc::clone(hub), env.clone())?);
        }
        Ok(registry)
    }

    /// Add a sim.
    pub fn add(&mut self, sim: Box<dyn SimControl>) {
        self.sims.push(sim);
    }

    /// Number of sims held.
    pub fn len(&self) -> usize {
        self.sims.len()
    }

    /// Returns true if no sims are held.
    pub fn is_empty(&self) -> bool {
        self.sims.is_empty()
    }

    /// Identity and phase of every sim, in insertion order.
    pub fn phases(&self) -> Vec<(SimId, SimPhase)> {
        self.sims.iter().map(|sim| (sim.id().clone(), sim.phase())).collect()
    }

    /// Register every sim with the hub. Sims that fail are dropped.
    pub async fn insert_all(&mut self) -> Vec<SimFailure> {
        let mut failures = Vec::new();
        let mut kept = Vec::with_capacity(self.sims.len());

        for mut sim in self.sims.drain(..) {
            match sim.insert().await {
                Ok(()) => kept.push(sim),
                Err(e) => {
                    error!(sim = %sim.id(), error = %e, "dropping sim that failed to register");
                    failures.push(SimFailure { sim: sim.id().clone(), error: e });
                },
            }
        }

        self.sims = kept;
        failures
    }

    /// Start every registered sim. Sims that fail are dropped.
    pub async fn start_all(&mut self) -> Vec<SimFailure> {
        let mut failures = Vec::new();
        let mut kept = Vec::with_capacity(self.sims.len());

        for mut sim in self.sims.drain(..) {
            match sim.start().await {
                Ok(()) => kept.push(sim),
                Err(e) => {
                    error!(sim = %sim.id(), error = %e, "dropping sim that failed to start");
                    failures.push(SimFailure { sim: sim.id().clone(), error: e });
                },
            }
        }

        info!(running = kept.len(), "sims started");
        self.sims = kept;
        failures
    }

    /// Stop every running sim. Sims are kept so their final phase can be
    /// inspected.
    pub async fn stop_all(&mut self) -> Vec<SimFailure> {
        let mut failures = Vec::new();

        for sim in self.sims.iter_mut().filter(|sim| sim.phase() == SimPhase::Running) {
            if let Err(e) = sim.stop().await {
                error!(sim = %sim.id(), error = %e, "sim did not stop cleanly");
                failures.push(SimFailure { sim: sim.id().clone(), error: e });
            }
        }

        failures
    }
}

fn build<H, E>(spec: &SimSpec, hub: Arc<H>, env: E) -> Result<Box<dyn SimControl>, DriverError>
where
    H: Hub,
    E: Environment,
{
    let config = spec.sim_config()?;
    let invalid = |source| DriverError::InvalidSim { name: spec.name.clone(), source };

    let sim: Box<dyn SimControl> = match spec.kind {
        SimKind::Counter => {
            let counter = ControllableCounter::new(spec.counter).map_err(invalid)?;
            Box::new(Sim::new(counter, config, hub, env).map_err(invalid)?)
        },
        SimKind::Gps => {
            let gps = GpsSim::new(spec.path).map_err(invalid)?;
            Box::new(Sim::new(gps, config, hub, env).map_err(invalid)?)
        },
    };
    Ok(sim)
}
